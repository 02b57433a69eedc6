//! The image normalizer and its inverse.
//!
//! Every codec operates on the same thing: a 2-D grid of 8-bit symbols. This
//! module turns arbitrary pixel containers into that grid, remembers enough
//! about the original (shape, element type, channel layout) to restore the
//! layout after decoding, and owns the shared "direct" reshaping rule used by
//! every decoder when the recovered symbol count does not match the grid.

use ndarray::{Array1, Array2, Array3, ArrayD, ArrayViewD, Ix2, Ix3};
use num_traits::ToPrimitive;

use crate::error::{CodecError, Result};
use crate::metadata::{CodecParams, Metadata};
use crate::types::{Pixel, PixelType};

/// ITU-R BT.601 luma weights used to collapse colour to a single channel.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

//==================================================================================
// 1. The Normalized Image
//==================================================================================

/// A normalized, immutable symbol grid plus the facts needed to restore it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    grid: Array2<u8>,
    shape: Vec<usize>,
    dtype: PixelType,
}

impl NormalizedImage {
    /// Wraps an existing 8-bit grayscale grid.
    pub fn from_grid(grid: Array2<u8>) -> Self {
        let shape = grid.shape().to_vec();
        Self {
            grid,
            shape,
            dtype: PixelType::UInt8,
        }
    }

    pub fn grid(&self) -> &Array2<u8> {
        &self.grid
    }

    /// Shape of the container handed to `normalize`, channels included.
    pub fn original_shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> PixelType {
        self.dtype
    }

    pub fn rows(&self) -> usize {
        self.grid.nrows()
    }

    pub fn cols(&self) -> usize {
        self.grid.ncols()
    }

    pub fn pixel_count(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// The symbols in row-major order.
    pub fn symbols(&self) -> Vec<u8> {
        self.grid.iter().copied().collect()
    }

    /// Starts a metadata record for this image with the given codec parameters.
    pub fn metadata(&self, params: CodecParams) -> Metadata {
        Metadata::new(
            self.shape.clone(),
            self.dtype.name(),
            (self.rows(), self.cols()),
            params,
        )
    }
}

//==================================================================================
// 2. Normalization
//==================================================================================

/// Converts one raw sample to a symbol: clamp into `0..=255`, then truncate.
/// NaN maps to 0.
fn to_symbol(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0) as u8
}

/// Normalizes a raw pixel container into an 8-bit grayscale grid.
///
/// Accepted layouts are `(H, W)`, `(H, W, 1)` and `(H, W, C)` with `C >= 3`,
/// in which case the first three channels are treated as RGB and collapsed to luma.
pub fn normalize<T: Pixel>(raw: ArrayViewD<'_, T>) -> Result<NormalizedImage> {
    let shape = raw.shape().to_vec();
    let sample = |v: &T| v.to_f64().unwrap_or(0.0);

    let grid = match shape.as_slice() {
        [_, _] => raw.into_dimensionality::<Ix2>()?.map(|v| to_symbol(sample(v))),
        [_, _, 1] => {
            let view = raw.into_dimensionality::<Ix3>()?;
            view.index_axis_move(ndarray::Axis(2), 0).map(|v| to_symbol(sample(v)))
        }
        [rows, cols, channels] if *channels >= 3 => {
            let view = raw.into_dimensionality::<Ix3>()?;
            Array2::from_shape_fn((*rows, *cols), |(i, j)| {
                let luma: f64 = LUMA_WEIGHTS
                    .iter()
                    .enumerate()
                    .map(|(c, w)| w * sample(&view[[i, j, c]]))
                    .sum();
                to_symbol(luma)
            })
        }
        other => {
            return Err(CodecError::UnsupportedShape(format!(
                "expected (H, W), (H, W, 1) or (H, W, C>=3), got {:?}",
                other
            )))
        }
    };

    log::debug!(
        "normalized {:?} {} image into a {}x{} symbol grid",
        shape,
        T::PIXEL_TYPE,
        grid.nrows(),
        grid.ncols()
    );

    Ok(NormalizedImage {
        grid,
        shape,
        dtype: T::PIXEL_TYPE,
    })
}

//==================================================================================
// 3. Restoration
//==================================================================================

/// Reshapes a flat symbol stream into a `rows x cols` grid.
///
/// A short stream is extended by repeating its last symbol (zeros when it is
/// empty); a long stream is truncated. Neither case is an error, but a grid
/// whose pixel count overflows `usize` is.
pub fn fit_to_grid(mut flat: Vec<u8>, rows: usize, cols: usize) -> Result<Array2<u8>> {
    let expected = rows
        .checked_mul(cols)
        .ok_or_else(|| CodecError::UnsupportedShape(format!("{}x{} grid overflows the pixel count", rows, cols)))?;
    if flat.len() != expected {
        log::warn!(
            "decoded {} symbols for a {}x{} grid; {} to fit",
            flat.len(),
            rows,
            cols,
            if flat.len() < expected { "edge-padding" } else { "truncating" }
        );
        let edge = flat.last().copied().unwrap_or(0);
        flat.resize(expected, edge);
    }
    Ok(Array2::from_shape_vec((rows, cols), flat)?)
}

/// Restores the channel layout recorded in `metadata.shape`.
///
/// A 3-D original shape causes the grayscale grid to be replicated across its
/// channels, and a 1-D shape `[n]` flattens a `1 x n` grid back to `[n]`;
/// anything else returns the grid unchanged.
pub fn restore_layout(grid: Array2<u8>, metadata: &Metadata) -> ArrayD<u8> {
    match metadata.shape.as_slice() {
        [_, _, channels] => {
            let (rows, cols) = grid.dim();
            Array3::from_shape_fn((rows, cols, *channels), |(i, j, _)| grid[[i, j]]).into_dyn()
        }
        [len] if grid.len() == *len => grid.iter().copied().collect::<Array1<u8>>().into_dyn(),
        _ => grid.into_dyn(),
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, IxDyn};

    #[test]
    fn test_normalize_grayscale_u8_is_identity() {
        let raw = array![[0u8, 10, 20], [30, 40, 255]].into_dyn();
        let image = normalize(raw.view()).unwrap();
        assert_eq!(image.grid(), &array![[0u8, 10, 20], [30, 40, 255]]);
        assert_eq!(image.original_shape(), &[2, 3]);
        assert_eq!(image.dtype(), PixelType::UInt8);
    }

    #[test]
    fn test_normalize_clamps_wide_types() {
        let raw = array![[-5.0f64, 12.7], [300.0, f64::NAN]].into_dyn();
        let image = normalize(raw.view()).unwrap();
        assert_eq!(image.grid(), &array![[0u8, 12], [255, 0]]);
        assert_eq!(image.dtype(), PixelType::Float64);
    }

    #[test]
    fn test_normalize_rgb_to_luma() {
        let mut raw = Array3::<u8>::zeros((1, 2, 3));
        raw[[0, 0, 0]] = 255; // pure red
        raw[[0, 1, 0]] = 255;
        raw[[0, 1, 1]] = 255;
        raw[[0, 1, 2]] = 255; // white
        let image = normalize(raw.into_dyn().view()).unwrap();
        assert_eq!(image.grid()[[0, 0]], 76); // 0.299 * 255 = 76.2
        assert_eq!(image.grid()[[0, 1]], 255);
        assert_eq!(image.original_shape(), &[1, 2, 3]);
    }

    #[test]
    fn test_normalize_single_channel_is_squeezed() {
        let raw = Array3::<u16>::from_elem((2, 2, 1), 7);
        let image = normalize(raw.into_dyn().view()).unwrap();
        assert_eq!(image.grid(), &Array2::from_elem((2, 2), 7u8));
    }

    #[test]
    fn test_normalize_rejects_bad_rank() {
        let raw = ArrayD::<u8>::zeros(IxDyn(&[4]));
        assert!(matches!(normalize(raw.view()), Err(CodecError::UnsupportedShape(_))));
        let raw = ArrayD::<u8>::zeros(IxDyn(&[2, 2, 2]));
        assert!(matches!(normalize(raw.view()), Err(CodecError::UnsupportedShape(_))));
    }

    #[test]
    fn test_normalize_empty_image() {
        let raw = ArrayD::<u8>::zeros(IxDyn(&[0, 5]));
        let image = normalize(raw.view()).unwrap();
        assert!(image.is_empty());
        assert_eq!(image.cols(), 5);
    }

    #[test]
    fn test_fit_to_grid_pads_and_truncates() {
        assert_eq!(fit_to_grid(vec![1, 2, 3], 2, 2).unwrap(), array![[1u8, 2], [3, 3]]);
        assert_eq!(fit_to_grid(vec![1, 2, 3, 4, 5], 2, 2).unwrap(), array![[1u8, 2], [3, 4]]);
        assert_eq!(fit_to_grid(vec![], 1, 2).unwrap(), array![[0u8, 0]]);
    }

    #[test]
    fn test_fit_to_grid_rejects_overflowing_dims() {
        let err = fit_to_grid(vec![1], 1 << 33, 1 << 33).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedShape(_)));
    }

    #[test]
    fn test_restore_layout_replicates_channels() {
        let image = NormalizedImage::from_grid(array![[9u8, 8]]);
        let mut metadata = image.metadata(CodecParams::Naive);
        metadata.shape = vec![1, 2, 3];
        let restored = restore_layout(image.grid().clone(), &metadata);
        assert_eq!(restored.shape(), &[1, 2, 3]);
        assert_eq!(restored[[0, 1, 2]], 8);
    }

    #[test]
    fn test_restore_layout_flattens_one_dimensional_shapes() {
        let metadata = Metadata::from_json_str(r#"{"shape":[4],"dtype":"uint8","method":"naive"}"#).unwrap();
        let restored = restore_layout(array![[1u8, 2, 3, 4]], &metadata);
        assert_eq!(restored.shape(), &[4]);
        assert_eq!(restored, array![1u8, 2, 3, 4].into_dyn());
    }
}
