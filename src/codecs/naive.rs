//! The baseline codec: the symbol grid flattened row-major, one byte per symbol.
//!
//! Its decoder doubles as the generic "direct" reconstructor (registry alias
//! `direct`): any payload is read as raw symbols and fitted to the declared
//! grid by edge-padding or truncation.

use crate::codecs::{decode_dims, decode_stats, CodecStats, Decoded, Encoded, ImageCodec};
use crate::error::Result;
use crate::image::{fit_to_grid, NormalizedImage};
use crate::metadata::{CodecParams, Metadata};
use crate::metrics;
use crate::registry::Method;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NaiveCodec;

impl ImageCodec for NaiveCodec {
    fn method(&self) -> Method {
        Method::Naive
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        let payload = image.symbols();
        let stats = CodecStats::new(
            Method::Naive,
            image.pixel_count(),
            payload.len(),
            metrics::entropy(image.grid().iter()),
        )
        .with_detail("bits_per_pixel", 8);

        Ok(Encoded {
            payload,
            metadata: image.metadata(CodecParams::Naive),
            stats,
        })
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        let (rows, cols) = decode_dims(metadata)?;
        let grid = fit_to_grid(payload.to_vec(), rows, cols)?;
        let stats = decode_stats(Method::Naive, &grid, payload.len());
        Ok(Decoded { grid, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_payload_is_row_major_bytes() {
        let image = NormalizedImage::from_grid(array![[1u8, 2, 3], [4, 5, 6]]);
        let encoded = NaiveCodec.encode(&image).unwrap();
        assert_eq!(encoded.payload, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(encoded.stats.compression_ratio, 1.0);
        assert_eq!(encoded.metadata.original_shape, Some(vec![2, 3]));
    }

    #[test]
    fn test_short_payload_is_edge_padded() {
        let image = NormalizedImage::from_grid(array![[1u8, 2], [3, 4]]);
        let metadata = NaiveCodec.encode(&image).unwrap().metadata;
        let decoded = NaiveCodec.decode(&[7, 8, 9], &metadata).unwrap();
        assert_eq!(decoded.grid, array![[7u8, 8], [9, 9]]);
    }

    #[test]
    fn test_long_payload_is_truncated() {
        let image = NormalizedImage::from_grid(array![[1u8, 2]]);
        let metadata = NaiveCodec.encode(&image).unwrap().metadata;
        let decoded = NaiveCodec.decode(&[5, 6, 7, 8], &metadata).unwrap();
        assert_eq!(decoded.grid, array![[5u8, 6]]);
    }
}
