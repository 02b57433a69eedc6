//! Differential (delta) coding of the flattened symbol stream.
//!
//! Residuals live in the `i16` domain so every delta in `-255..=255` is
//! representable. The first residual is the first symbol itself; the payload
//! is the residual array in little-endian byte order.

use crate::codecs::{decode_dims, decode_stats, CodecStats, Decoded, Encoded, ImageCodec};
use crate::error::Result;
use crate::image::{fit_to_grid, NormalizedImage};
use crate::metadata::{CodecParams, Metadata};
use crate::metrics;
use crate::registry::Method;
use crate::utils::{bytes_to_typed_vec, typed_slice_to_bytes};

//==================================================================================
// 1. Kernels
//==================================================================================

/// First value verbatim, then `value[i] - value[i-1]`.
pub fn encode_residuals(symbols: &[u8]) -> Vec<i16> {
    let mut residuals = Vec::with_capacity(symbols.len());
    let mut prev: i16 = 0;
    for &s in symbols {
        let cur = s as i16;
        residuals.push(cur - prev);
        prev = cur;
    }
    residuals
}

/// Running sum of the residuals, clamped back into `0..=255`.
pub fn decode_residuals(residuals: &[i16]) -> Vec<u8> {
    let mut acc: i64 = 0;
    residuals
        .iter()
        .map(|&r| {
            acc += r as i64;
            acc.clamp(0, u8::MAX as i64) as u8
        })
        .collect()
}

/// Signed bits needed for the largest residual magnitude (one bit for the sign).
pub fn bits_per_symbol(max_diff: u32) -> u32 {
    if max_diff == 0 {
        return 1;
    }
    // ceil(log2(max_diff + 1)) is the bit width of max_diff.
    (u32::BITS - max_diff.leading_zeros()) + 1
}

//==================================================================================
// 2. Codec
//==================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DifferentialCodec;

impl ImageCodec for DifferentialCodec {
    fn method(&self) -> Method {
        Method::Differential
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        let residuals = encode_residuals(&image.symbols());
        let payload = typed_slice_to_bytes(&residuals);

        let max_diff = residuals.iter().map(|r| r.unsigned_abs() as u32).max().unwrap_or(0);
        let bits = bits_per_symbol(max_diff);
        let original_entropy = metrics::entropy(image.grid().iter());
        let differential_entropy = metrics::symbol_entropy(residuals.iter().copied());
        let entropy_reduction = if original_entropy > 0.0 {
            (original_entropy - differential_entropy) / original_entropy * 100.0
        } else {
            0.0
        };

        log::debug!(
            "differential: entropy {:.3} -> {:.3} bits/symbol, max |delta| {}",
            original_entropy,
            differential_entropy,
            max_diff
        );

        let stats = CodecStats::new(Method::Differential, image.pixel_count(), payload.len(), original_entropy)
            .with_detail("differential_entropy", differential_entropy)
            .with_detail("entropy_reduction", entropy_reduction)
            .with_detail("max_difference", max_diff)
            .with_detail("bits_per_symbol", bits);

        Ok(Encoded {
            payload,
            metadata: image.metadata(CodecParams::Differential { max_diff, bits_per_symbol: bits }),
            stats,
        })
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        let (rows, cols) = decode_dims(metadata)?;
        let (residuals, remainder) = bytes_to_typed_vec::<i16>(payload);
        if remainder != 0 {
            log::warn!("differential payload has {} trailing byte(s); ignoring them", remainder);
        }
        let grid = fit_to_grid(decode_residuals(&residuals), rows, cols)?;
        let stats = decode_stats(Method::Differential, &grid, payload.len());
        Ok(Decoded { grid, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{test_image, Pattern};
    use ndarray::array;

    #[test]
    fn test_residual_layout() {
        assert_eq!(encode_residuals(&[10, 12, 9, 255, 0]), vec![10, 2, -3, 246, -255]);
        assert_eq!(decode_residuals(&[10, 2, -3, 246, -255]), vec![10, 12, 9, 255, 0]);
        assert!(encode_residuals(&[]).is_empty());
    }

    #[test]
    fn test_payload_is_little_endian_i16() {
        let image = NormalizedImage::from_grid(array![[1u8, 0]]);
        let encoded = DifferentialCodec.encode(&image).unwrap();
        assert_eq!(encoded.payload, vec![1, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_bits_per_symbol() {
        assert_eq!(bits_per_symbol(0), 1);
        assert_eq!(bits_per_symbol(1), 2);
        assert_eq!(bits_per_symbol(3), 3);
        assert_eq!(bits_per_symbol(4), 4);
        assert_eq!(bits_per_symbol(255), 9);
    }

    #[test]
    fn test_max_diff_counts_first_value() {
        let image = NormalizedImage::from_grid(array![[200u8, 201, 202]]);
        let encoded = DifferentialCodec.encode(&image).unwrap();
        assert_eq!(
            encoded.metadata.params,
            CodecParams::Differential { max_diff: 200, bits_per_symbol: 9 }
        );
    }

    #[test]
    fn test_gradient_entropy_drops_by_half() {
        let image = NormalizedImage::from_grid(test_image(64, 64, Pattern::Gradient, 0));
        let original = metrics::entropy(image.grid().iter());
        let residuals = encode_residuals(&image.symbols());
        let differential = metrics::symbol_entropy(residuals);
        assert!(
            differential < original * 0.5,
            "entropy {} -> {}",
            original,
            differential
        );
    }

    #[test]
    fn test_corrupt_residuals_are_clamped() {
        let image = NormalizedImage::from_grid(array![[0u8, 0, 0]]);
        let metadata = DifferentialCodec.encode(&image).unwrap().metadata;
        let payload = typed_slice_to_bytes(&[250i16, 100, -400]);
        let decoded = DifferentialCodec.decode(&payload, &metadata).unwrap();
        assert_eq!(decoded.grid, array![[250u8, 255, 0]]);
    }
}
