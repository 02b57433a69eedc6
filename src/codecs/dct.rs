//! Block DCT coding with position-dependent quantization.
//!
//! The grid is edge-padded to whole `block_size` tiles, each tile goes through
//! an orthonormal 2-D DCT-II, and coefficients are divided by
//! `1 + (i + j) / quality`. Coefficients below `max|q| * (1 - quality) * 0.1`
//! are zeroed. Every coefficient (zeros included) is stored as an `f32`, block
//! by block, row-major within each block.
//!
//! The quantization matrix is never stored: both sides rebuild it with
//! `quantization_matrix` from `block_size` and `quality`.

use ndarray::{s, Array2, ArrayView2};

use crate::codecs::{decode_dims, decode_stats, CodecStats, Decoded, Encoded, ImageCodec};
use crate::config::clamp_quality;
use crate::error::{CodecError, Result};
use crate::image::NormalizedImage;
use crate::metadata::{CodecParams, Metadata};
use crate::metrics;
use crate::registry::Method;
use crate::utils::{bytes_to_typed_vec, typed_slice_to_bytes};

/// Fraction of the largest quantized coefficient used for thresholding at quality 0.
const THRESHOLD_FRACTION: f32 = 0.1;

/// Largest accepted tile edge. Larger values in metadata are rejected.
pub const MAX_BLOCK_SIZE: usize = 256;

//==================================================================================
// 1. Transform Kernels
//==================================================================================

/// The `n x n` orthonormal DCT-II basis: row `k` holds `alpha(k) cos(pi (2i + 1) k / 2n)`.
pub fn dct_basis(n: usize) -> Array2<f32> {
    let nf = n as f32;
    Array2::from_shape_fn((n, n), |(k, i)| {
        let alpha = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
        alpha * (std::f32::consts::PI * k as f32 * (i as f32 + 0.5) / nf).cos()
    })
}

/// `C * block * C^T`
pub fn forward_2d(block: &ArrayView2<'_, f32>, basis: &Array2<f32>) -> Array2<f32> {
    basis.dot(block).dot(&basis.t())
}

/// `C^T * coeffs * C`
pub fn inverse_2d(coeffs: &ArrayView2<'_, f32>, basis: &Array2<f32>) -> Array2<f32> {
    basis.t().dot(coeffs).dot(basis)
}

/// The step-size matrix `1 + (i + j) / quality`, recomputed identically on both sides.
pub fn quantization_matrix(block_size: usize, quality: f64) -> Array2<f32> {
    let scale = (1.0 / clamp_quality(quality)) as f32;
    Array2::from_shape_fn((block_size, block_size), |(i, j)| 1.0 + (i + j) as f32 * scale)
}

/// Divides by the step matrix, then zeroes coefficients under the amplitude threshold.
fn quantize(coeffs: &Array2<f32>, steps: &Array2<f32>, quality: f64) -> Array2<f32> {
    let mut q = coeffs / steps;
    let peak = q.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    let threshold = peak * (1.0 - clamp_quality(quality) as f32) * THRESHOLD_FRACTION;
    q.mapv_inplace(|v| if v.abs() < threshold { 0.0 } else { v });
    q
}

/// `None` when the rounded value does not fit a `usize`.
fn round_up(n: usize, multiple: usize) -> Option<usize> {
    n.div_ceil(multiple).checked_mul(multiple)
}

/// The padded grid a `rows x cols` image occupies in `bs`-sized tiles.
fn padded_dims(rows: usize, cols: usize, bs: usize) -> Result<(usize, usize)> {
    let overflow = || CodecError::UnsupportedShape(format!("{}x{} grid cannot be padded to {}-pixel tiles", rows, cols, bs));
    let ph = round_up(rows, bs).ok_or_else(overflow)?;
    let pw = round_up(cols, bs).ok_or_else(overflow)?;
    ph.checked_mul(pw).ok_or_else(overflow)?;
    Ok((ph, pw))
}

/// Replicates the last row and column until both dimensions are tile multiples.
fn pad_edges(grid: &Array2<u8>, block_size: usize) -> Result<Array2<f32>> {
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    let (ph, pw) = padded_dims(rows, cols, block_size)?;
    Ok(Array2::from_shape_fn((ph, pw), |(i, j)| grid[[i.min(rows - 1), j.min(cols - 1)]] as f32))
}

//==================================================================================
// 2. Codec
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DctCodec {
    block_size: usize,
    quality: f64,
}

impl Default for DctCodec {
    fn default() -> Self {
        Self::new(8, 0.8)
    }
}

impl DctCodec {
    /// Block size is clamped to `[1, MAX_BLOCK_SIZE]`; quality to `[0.1, 1.0]`.
    pub fn new(block_size: usize, quality: f64) -> Self {
        Self {
            block_size: block_size.clamp(1, MAX_BLOCK_SIZE),
            quality: clamp_quality(quality),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }
}

impl ImageCodec for DctCodec {
    fn method(&self) -> Method {
        Method::Dct
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        let bs = self.block_size;
        let padded = pad_edges(image.grid(), bs)?;
        let (ph, pw) = padded.dim();
        let basis = dct_basis(bs);
        let steps = quantization_matrix(bs, self.quality);

        let num_blocks = (ph / bs) * (pw / bs);
        let mut coeffs: Vec<f32> = Vec::with_capacity(ph * pw);
        for bi in (0..ph).step_by(bs) {
            for bj in (0..pw).step_by(bs) {
                let block = padded.slice(s![bi..bi + bs, bj..bj + bs]);
                let quantized = quantize(&forward_2d(&block, &basis), &steps, self.quality);
                coeffs.extend(quantized.iter());
            }
        }

        let zero_coefficients = coeffs.iter().filter(|c| **c == 0.0).count();
        let payload = typed_slice_to_bytes(&coeffs);

        log::debug!(
            "dct: {} blocks of {}x{} at quality {:.2}, {} of {} coefficients zeroed",
            num_blocks,
            bs,
            bs,
            self.quality,
            zero_coefficients,
            coeffs.len()
        );

        let stats = CodecStats::new(
            Method::Dct,
            image.pixel_count(),
            payload.len(),
            metrics::entropy(image.grid().iter()),
        )
        .with_detail("block_size", bs)
        .with_detail("quality", self.quality)
        .with_detail("num_blocks", num_blocks)
        .with_detail("zero_coefficients", zero_coefficients)
        .with_detail("padded_shape", vec![ph, pw]);

        let metadata = image.metadata(CodecParams::Dct {
            block_size: bs,
            quality: self.quality,
            padded_shape: Some(vec![ph, pw]),
            num_blocks,
        });

        Ok(Encoded { payload, metadata, stats })
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        let (rows, cols) = decode_dims(metadata)?;
        let (bs, quality, recorded) = match &metadata.params {
            CodecParams::Dct { block_size, quality, padded_shape, .. } => {
                ((*block_size).max(1), clamp_quality(*quality), padded_shape.clone())
            }
            _ => (self.block_size, self.quality, None),
        };

        if bs > MAX_BLOCK_SIZE {
            return Err(CodecError::InvalidParameter(format!(
                "dct block_size {} exceeds the maximum of {}",
                bs, MAX_BLOCK_SIZE
            )));
        }

        // The tile layout is fixed by the grid; a recorded shape can only confirm it.
        let (ph, pw) = padded_dims(rows, cols, bs)?;
        if let Some(recorded) = recorded.filter(|r| r.as_slice() != [ph, pw]) {
            log::warn!("dct padded_shape {:?} does not match the {}x{} tile layout; ignoring it", recorded, ph, pw);
        }

        let (coeffs, remainder) = bytes_to_typed_vec::<f32>(payload);
        if remainder != 0 {
            log::warn!("dct payload has {} trailing byte(s); ignoring them", remainder);
        }

        let basis = dct_basis(bs);
        let steps = quantization_matrix(bs, quality);
        let per_block = bs * bs;
        let num_blocks = (ph / bs) * (pw / bs);
        let mut reconstructed = Array2::<f32>::zeros((ph, pw));
        let mut blocks_processed = 0;

        for (idx, chunk) in coeffs.chunks_exact(per_block).take(num_blocks).enumerate() {
            let quantized = ArrayView2::from_shape((bs, bs), chunk)?;
            let pixels = inverse_2d(&(&quantized * &steps).view(), &basis);
            let (bi, bj) = ((idx / (pw / bs)) * bs, (idx % (pw / bs)) * bs);
            reconstructed
                .slice_mut(s![bi..bi + bs, bj..bj + bs])
                .assign(&pixels.mapv(|v| v.clamp(0.0, 255.0)));
            blocks_processed += 1;
        }
        if blocks_processed < num_blocks {
            log::warn!(
                "dct payload holds {} of {} blocks; missing blocks decode to zero",
                blocks_processed,
                num_blocks
            );
        }

        let grid = Array2::from_shape_fn((rows, cols), |(i, j)| {
            reconstructed[[i, j]].round().clamp(0.0, 255.0) as u8
        });
        let stats = decode_stats(Method::Dct, &grid, payload.len())
            .with_detail("blocks_processed", blocks_processed)
            .with_detail("quality", quality);
        Ok(Decoded { grid, stats })
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{test_image, Pattern};
    use ndarray::{array, Array2};

    fn roundtrip_psnr(grid: &Array2<u8>, quality: f64) -> f64 {
        let codec = DctCodec::new(8, quality);
        let encoded = codec.encode(&NormalizedImage::from_grid(grid.clone())).unwrap();
        let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
        metrics::psnr(grid.view(), decoded.grid.view(), 255.0)
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let c = dct_basis(8);
        let identity = c.dot(&c.t());
        for ((i, j), v) in identity.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-5, "({}, {}) = {}", i, j, v);
        }
    }

    #[test]
    fn test_constant_block_has_only_dc() {
        let block = Array2::from_elem((8, 8), 100.0f32);
        let coeffs = forward_2d(&block.view(), &dct_basis(8));
        assert!((coeffs[[0, 0]] - 800.0).abs() < 1e-3);
        assert!(coeffs.iter().skip(1).all(|c| c.abs() < 1e-3));
    }

    #[test]
    fn test_quantization_matrix_formula() {
        let m = quantization_matrix(4, 0.5);
        assert_eq!(m[[0, 0]], 1.0);
        assert_eq!(m[[1, 2]], 7.0);
        assert_eq!(m[[3, 3]], 13.0);
        // Quality below the floor is clamped to 0.1.
        assert_eq!(quantization_matrix(2, 0.0)[[0, 1]], 11.0);
    }

    #[test]
    fn test_gradient_psnr_above_20() {
        let grid = test_image(64, 64, Pattern::Gradient, 0);
        let psnr = roundtrip_psnr(&grid, 0.8);
        assert!(psnr > 20.0, "psnr {}", psnr);
    }

    #[test]
    fn test_higher_quality_is_not_worse() {
        let grid = test_image(64, 64, Pattern::Gradient, 0);
        let low = roundtrip_psnr(&grid, 0.3);
        let high = roundtrip_psnr(&grid, 1.0);
        assert!(high >= low, "q=1.0 {} < q=0.3 {}", high, low);
    }

    #[test]
    fn test_padding_and_cropping() {
        let grid = test_image(13, 21, Pattern::Gradient, 0);
        let codec = DctCodec::default();
        let encoded = codec.encode(&NormalizedImage::from_grid(grid.clone())).unwrap();
        assert_eq!(encoded.payload.len(), 16 * 24 * 4);
        match &encoded.metadata.params {
            CodecParams::Dct { padded_shape, num_blocks, .. } => {
                assert_eq!(padded_shape.as_deref(), Some(&[16, 24][..]));
                assert_eq!(*num_blocks, 6);
            }
            other => panic!("unexpected params {:?}", other),
        }
        let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid.dim(), (13, 21));
    }

    #[test]
    fn test_missing_blocks_decode_to_zero() {
        let grid = Array2::from_elem((8, 16), 200u8);
        let codec = DctCodec::new(8, 1.0);
        let encoded = codec.encode(&NormalizedImage::from_grid(grid)).unwrap();
        let half = &encoded.payload[..encoded.payload.len() / 2];
        let decoded = codec.decode(half, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid[[0, 0]], 200);
        assert_eq!(decoded.grid[[0, 15]], 0);
    }

    #[test]
    fn test_inconsistent_padded_shape_is_ignored() {
        let grid = test_image(13, 21, Pattern::Gradient, 0);
        let codec = DctCodec::new(8, 1.0);
        let mut encoded = codec.encode(&NormalizedImage::from_grid(grid)).unwrap();
        let reference = codec.decode(&encoded.payload, &encoded.metadata).unwrap().grid;
        if let CodecParams::Dct { padded_shape, .. } = &mut encoded.metadata.params {
            *padded_shape = Some(vec![usize::MAX, 8]);
        }
        let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, reference);
    }

    #[test]
    fn test_oversized_metadata_is_rejected() {
        let mut metadata = NormalizedImage::from_grid(Array2::zeros((4, 4))).metadata(CodecParams::Dct {
            block_size: MAX_BLOCK_SIZE + 1,
            quality: 0.8,
            padded_shape: None,
            num_blocks: 1,
        });
        assert!(matches!(DctCodec::default().decode(&[], &metadata), Err(CodecError::InvalidParameter(_))));

        metadata.params = CodecParams::Dct { block_size: 8, quality: 0.8, padded_shape: None, num_blocks: 1 };
        metadata.original_shape = Some(vec![usize::MAX - 2, 3]);
        assert!(matches!(DctCodec::default().decode(&[], &metadata), Err(CodecError::UnsupportedShape(_))));
    }

    #[test]
    fn test_decoder_reads_parameters_from_metadata() {
        let grid = array![[10u8, 20, 30, 40], [50, 60, 70, 80]];
        let encoder = DctCodec::new(2, 1.0);
        let encoded = encoder.encode(&NormalizedImage::from_grid(grid.clone())).unwrap();
        // A decoder built with other defaults still honours the metadata.
        let decoded = DctCodec::default().decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, grid);
    }
}
