//! Run-length coding of the flattened symbol stream.
//!
//! The payload is a sequence of `(value, run_length)` byte pairs. Runs are
//! capped at 255 and longer runs are split. Alternating symbols therefore
//! expand to twice their size; that is reported, not hidden.

use crate::codecs::{decode_dims, decode_stats, CodecStats, Decoded, Encoded, ImageCodec};
use crate::error::Result;
use crate::image::{fit_to_grid, NormalizedImage};
use crate::metadata::{CodecParams, Metadata};
use crate::metrics;
use crate::registry::Method;

/// Longest run a single pair can describe.
pub const MAX_RUN: u8 = u8::MAX;

//==================================================================================
// 1. Kernels
//==================================================================================

/// Appends the `(value, run)` pairs for `input` to `output_buf`.
pub fn encode_runs(input: &[u8], output_buf: &mut Vec<u8>) {
    output_buf.clear();
    let Some((&first, rest)) = input.split_first() else {
        return;
    };

    let mut current = first;
    let mut run: u8 = 1;
    for &val in rest {
        if val == current && run < MAX_RUN {
            run += 1;
        } else {
            output_buf.extend_from_slice(&[current, run]);
            current = val;
            run = 1;
        }
    }
    output_buf.extend_from_slice(&[current, run]);
}

/// Expands `(value, run)` pairs. A trailing unpaired byte is ignored.
pub fn decode_runs(input: &[u8], output_buf: &mut Vec<u8>) {
    output_buf.clear();
    let pairs = input.chunks_exact(2);
    if !pairs.remainder().is_empty() {
        log::warn!("rle payload has an odd length ({}); ignoring the last byte", input.len());
    }
    for pair in pairs {
        let (value, run) = (pair[0], pair[1] as usize);
        output_buf.resize(output_buf.len() + run, value);
    }
}

//==================================================================================
// 2. Codec
//==================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RleCodec;

impl ImageCodec for RleCodec {
    fn method(&self) -> Method {
        Method::Rle
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        let mut payload = Vec::new();
        encode_runs(&image.symbols(), &mut payload);
        let rle_pairs = payload.len() / 2;

        log::debug!("rle: {} symbols -> {} pairs", image.pixel_count(), rle_pairs);

        let stats = CodecStats::new(
            Method::Rle,
            image.pixel_count(),
            payload.len(),
            metrics::entropy(image.grid().iter()),
        )
        .with_detail("rle_pairs", rle_pairs);

        Ok(Encoded {
            payload,
            metadata: image.metadata(CodecParams::Rle { rle_pairs }),
            stats,
        })
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        let (rows, cols) = decode_dims(metadata)?;
        let mut flat = Vec::new();
        decode_runs(payload, &mut flat);
        let decoded_pixels = flat.len();
        let grid = fit_to_grid(flat, rows, cols)?;
        let stats = decode_stats(Method::Rle, &grid, payload.len())
            .with_detail("rle_pairs", payload.len() / 2)
            .with_detail("decoded_pixels", decoded_pixels);
        Ok(Decoded { grid, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{test_image, Pattern};
    use ndarray::Array2;

    #[test]
    fn test_runs_are_capped_at_255() {
        let input = vec![9u8; 600];
        let mut encoded = Vec::new();
        encode_runs(&input, &mut encoded);
        assert_eq!(encoded, vec![9, 255, 9, 255, 9, 90]);

        let mut decoded = Vec::new();
        decode_runs(&encoded, &mut decoded);
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_alternating_symbols_double_in_size() {
        // Alternates across row boundaries too, so every symbol is its own run.
        let image = NormalizedImage::from_grid(Array2::from_shape_fn((8, 8), |(i, j)| ((i * 8 + j) % 2) as u8));
        let encoded = RleCodec.encode(&image).unwrap();
        assert_eq!(encoded.payload.len(), 128);
        assert_eq!(encoded.stats.compression_ratio, 0.5);
    }

    #[test]
    fn test_block_image_compresses() {
        let image = NormalizedImage::from_grid(test_image(64, 64, Pattern::Blocks, 42));
        let encoded = RleCodec.encode(&image).unwrap();
        assert!(encoded.stats.compression_ratio > 2.0, "ratio {}", encoded.stats.compression_ratio);
    }

    #[test]
    fn test_noise_expands() {
        let image = NormalizedImage::from_grid(test_image(64, 64, Pattern::Noise, 42));
        let encoded = RleCodec.encode(&image).unwrap();
        assert!(encoded.stats.compression_ratio < 1.0, "ratio {}", encoded.stats.compression_ratio);
    }

    #[test]
    fn test_odd_trailing_byte_is_ignored() {
        let mut decoded = Vec::new();
        decode_runs(&[4, 3, 7], &mut decoded);
        assert_eq!(decoded, vec![4, 4, 4]);
    }
}
