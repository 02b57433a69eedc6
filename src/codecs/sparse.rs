//! Subsample-and-interpolate coding.
//!
//! The encoder keeps every `sampling_rate`-th pixel in both dimensions.
//! Payload layout (all fields big-endian):
//!
//! ```text
//! [num_samples: u32][row: u16][col: u16][value: u8] ... repeated num_samples times
//! ```
//!
//! The decoder fills the gaps. Samples forming a complete rectangular lattice
//! (what the encoder always produces) are interpolated bilinearly, with pixels
//! beyond the last lattice row or column clamped to it. Any other sample
//! layout falls back to the nearest known sample by Manhattan distance.
//! With no samples at all the image is mid-gray.

use ndarray::Array2;
use std::collections::{BTreeMap, VecDeque};

use crate::codecs::{decode_dims, decode_stats, degraded_grid, CodecStats, Decoded, Encoded, ImageCodec};
use crate::error::{CodecError, Result};
use crate::image::NormalizedImage;
use crate::metadata::{CodecParams, Metadata};
use crate::metrics;
use crate::registry::Method;
use crate::utils::{read_u16_be, read_u32_be};

/// Fill value when nothing is known.
pub const MID_GRAY: u8 = 128;

const COUNT_BYTES: usize = 4;
const SAMPLE_BYTES: usize = 5;
/// Largest grid dimension whose coordinates fit the `u16` fields.
const MAX_DIMENSION: usize = u16::MAX as usize + 1;

//==================================================================================
// 1. Sample Serialization
//==================================================================================

/// Known pixels keyed by `(row, col)`.
type Samples = BTreeMap<(usize, usize), u8>;

fn write_samples(grid: &Array2<u8>, rate: usize) -> (Vec<u8>, Vec<[usize; 2]>) {
    let (rows, cols) = grid.dim();
    let positions: Vec<[usize; 2]> = (0..rows)
        .step_by(rate)
        .flat_map(|i| (0..cols).step_by(rate).map(move |j| [i, j]))
        .collect();

    let mut payload = Vec::with_capacity(COUNT_BYTES + positions.len() * SAMPLE_BYTES);
    payload.extend_from_slice(&(positions.len() as u32).to_be_bytes());
    for &[i, j] in &positions {
        payload.extend_from_slice(&(i as u16).to_be_bytes());
        payload.extend_from_slice(&(j as u16).to_be_bytes());
        payload.push(grid[[i, j]]);
    }
    (payload, positions)
}

/// Reads as many whole samples as the payload holds, dropping out-of-grid ones.
fn read_samples(payload: &[u8], rows: usize, cols: usize) -> std::result::Result<Samples, String> {
    let declared = read_u32_be(payload, 0)
        .ok_or_else(|| format!("{} bytes is shorter than the sample count", payload.len()))? as usize;
    let available = (payload.len() - COUNT_BYTES) / SAMPLE_BYTES;
    if available < declared {
        log::warn!("sparse payload declares {} samples but holds {}", declared, available);
    }

    let mut samples = Samples::new();
    for n in 0..declared.min(available) {
        let offset = COUNT_BYTES + n * SAMPLE_BYTES;
        let (Some(row), Some(col)) = (read_u16_be(payload, offset), read_u16_be(payload, offset + 2)) else {
            break;
        };
        let (row, col) = (row as usize, col as usize);
        if row < rows && col < cols {
            samples.insert((row, col), payload[offset + 4]);
        }
    }
    Ok(samples)
}

//==================================================================================
// 2. Reconstruction
//==================================================================================

/// For each output coordinate: indices of the bracketing lattice lines and the
/// interpolation weight of the upper one. Out-of-range coordinates clamp.
fn brackets(len: usize, lines: &[usize]) -> Vec<(usize, usize, f64)> {
    (0..len)
        .map(|x| {
            let upper = lines.partition_point(|&l| l < x);
            if upper == 0 {
                (0, 0, 0.0)
            } else if upper == lines.len() {
                (lines.len() - 1, lines.len() - 1, 0.0)
            } else if lines[upper] == x {
                (upper, upper, 0.0)
            } else {
                let (a, b) = (lines[upper - 1], lines[upper]);
                (upper - 1, upper, (x - a) as f64 / (b - a) as f64)
            }
        })
        .collect()
}

/// Bilinear fill when `samples` covers every (row line, column line) pair.
fn lattice_fill(rows: usize, cols: usize, samples: &Samples) -> Option<Array2<u8>> {
    let mut row_lines: Vec<usize> = samples.keys().map(|&(r, _)| r).collect();
    let mut col_lines: Vec<usize> = samples.keys().map(|&(_, c)| c).collect();
    row_lines.dedup();
    col_lines.sort_unstable();
    col_lines.dedup();
    if row_lines.len() * col_lines.len() != samples.len() {
        return None;
    }

    let lattice = Array2::from_shape_fn((row_lines.len(), col_lines.len()), |(a, b)| {
        samples.get(&(row_lines[a], col_lines[b])).copied().unwrap_or(MID_GRAY) as f64
    });
    let row_brackets = brackets(rows, &row_lines);
    let col_brackets = brackets(cols, &col_lines);

    Some(Array2::from_shape_fn((rows, cols), |(i, j)| {
        let (r0, r1, ty) = row_brackets[i];
        let (c0, c1, tx) = col_brackets[j];
        let top = lattice[[r0, c0]] * (1.0 - tx) + lattice[[r0, c1]] * tx;
        let bottom = lattice[[r1, c0]] * (1.0 - tx) + lattice[[r1, c1]] * tx;
        (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8
    }))
}

/// Nearest known sample by Manhattan distance, via multi-source BFS.
fn nearest_fill(rows: usize, cols: usize, samples: &Samples) -> Array2<u8> {
    let mut grid = Array2::from_elem((rows, cols), MID_GRAY);
    let mut seen = Array2::from_elem((rows, cols), false);
    let mut queue = VecDeque::with_capacity(samples.len());
    for (&(r, c), &v) in samples {
        grid[[r, c]] = v;
        seen[[r, c]] = true;
        queue.push_back((r, c));
    }

    while let Some((r, c)) = queue.pop_front() {
        let v = grid[[r, c]];
        let neighbours = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < rows && nc < cols && !seen[[nr, nc]] {
                seen[[nr, nc]] = true;
                grid[[nr, nc]] = v;
                queue.push_back((nr, nc));
            }
        }
    }
    grid
}

/// Rebuilds a full grid from scattered samples.
pub fn interpolate(rows: usize, cols: usize, samples: &BTreeMap<(usize, usize), u8>) -> Array2<u8> {
    if samples.is_empty() {
        return Array2::from_elem((rows, cols), MID_GRAY);
    }
    lattice_fill(rows, cols, samples).unwrap_or_else(|| {
        log::debug!("sparse samples do not form a lattice; using nearest-sample fill");
        nearest_fill(rows, cols, samples)
    })
}

//==================================================================================
// 3. Codec
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SparseCodec {
    sampling_rate: usize,
}

impl Default for SparseCodec {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SparseCodec {
    /// A stride of 0 is treated as 1.
    pub fn new(sampling_rate: usize) -> Self {
        Self { sampling_rate: sampling_rate.max(1) }
    }

    pub fn sampling_rate(&self) -> usize {
        self.sampling_rate
    }
}

impl ImageCodec for SparseCodec {
    fn method(&self) -> Method {
        Method::Sparse
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        let (rows, cols) = (image.rows(), image.cols());
        if rows > MAX_DIMENSION || cols > MAX_DIMENSION {
            return Err(CodecError::UnsupportedShape(format!(
                "sparse coordinates are 16-bit; a {}x{} grid is too large",
                rows, cols
            )));
        }

        let (payload, positions) = if image.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            write_samples(image.grid(), self.sampling_rate)
        };
        let num_samples = positions.len();
        let pixels = image.pixel_count();

        log::debug!(
            "sparse: kept {} of {} pixels at stride {}",
            num_samples,
            pixels,
            self.sampling_rate
        );

        let mut stats = CodecStats::new(Method::Sparse, pixels, payload.len(), metrics::entropy(image.grid().iter()))
            .with_detail("sampled_pixels", num_samples)
            .with_detail("sampling_rate", self.sampling_rate)
            .with_detail("sparsity", if pixels > 0 { num_samples as f64 / pixels as f64 } else { 0.0 });
        // Reported ratio is pixels per kept sample; the byte ratio is kept alongside.
        let byte_ratio = stats.compression_ratio;
        stats.compression_ratio = metrics::compression_ratio(pixels, num_samples);
        let stats = stats.with_detail("byte_ratio", byte_ratio);

        let metadata = image.metadata(CodecParams::Sparse {
            sampling_rate: self.sampling_rate,
            num_samples,
            sampled_positions: positions,
        });

        Ok(Encoded { payload, metadata, stats })
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        let (rows, cols) = decode_dims(metadata)?;
        if rows * cols == 0 {
            let grid = Array2::zeros((rows, cols));
            let stats = decode_stats(Method::Sparse, &grid, payload.len());
            return Ok(Decoded { grid, stats });
        }

        let samples = match read_samples(payload, rows, cols) {
            Ok(samples) => samples,
            Err(reason) => {
                let grid = degraded_grid(Method::Sparse, rows, cols, &reason);
                let stats = decode_stats(Method::Sparse, &grid, payload.len());
                return Ok(Decoded { grid, stats });
            }
        };

        let known = samples.len();
        let grid = interpolate(rows, cols, &samples);
        let stats = decode_stats(Method::Sparse, &grid, payload.len())
            .with_detail("known_pixels", known)
            .with_detail("sparsity", known as f64 / (rows * cols) as f64);
        Ok(Decoded { grid, stats })
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{test_image, Pattern};
    use ndarray::array;

    #[test]
    fn test_payload_layout() {
        let image = NormalizedImage::from_grid(array![[1u8, 2, 3], [4, 5, 6], [7, 8, 9]]);
        let encoded = SparseCodec::new(2).encode(&image).unwrap();
        assert_eq!(
            encoded.payload,
            vec![0, 0, 0, 4, 0, 0, 0, 0, 1, 0, 0, 0, 2, 3, 0, 2, 0, 0, 7, 0, 2, 0, 2, 9]
        );
        assert_eq!(
            encoded.metadata.params,
            CodecParams::Sparse {
                sampling_rate: 2,
                num_samples: 4,
                sampled_positions: vec![[0, 0], [0, 2], [2, 0], [2, 2]],
            }
        );
    }

    #[test]
    fn test_gradient_ratio_and_quality() {
        let grid = test_image(64, 64, Pattern::Gradient, 0);
        let codec = SparseCodec::new(4);
        let encoded = codec.encode(&NormalizedImage::from_grid(grid.clone())).unwrap();
        assert!(encoded.stats.compression_ratio > 10.0, "ratio {}", encoded.stats.compression_ratio);
        let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
        let psnr = metrics::psnr(grid.view(), decoded.grid.view(), 255.0);
        assert!(psnr > 20.0, "psnr {}", psnr);
    }

    #[test]
    fn test_bilinear_between_samples() {
        let grid = array![[0u8, 0, 100], [0, 0, 0], [100, 0, 200]];
        let codec = SparseCodec::new(2);
        let encoded = codec.encode(&NormalizedImage::from_grid(grid)).unwrap();
        let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, array![[0u8, 50, 100], [50, 100, 150], [100, 150, 200]]);
    }

    #[test]
    fn test_edges_clamp_to_last_lattice_line() {
        let grid = array![[10u8, 0, 0], [0, 0, 0]];
        let codec = SparseCodec::new(4);
        let encoded = codec.encode(&NormalizedImage::from_grid(grid)).unwrap();
        let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, Array2::from_elem((2, 3), 10u8));
    }

    #[test]
    fn test_scattered_samples_use_nearest() {
        let mut samples = BTreeMap::new();
        samples.insert((0, 0), 10u8);
        samples.insert((3, 3), 200u8);
        let grid = interpolate(4, 4, &samples);
        assert_eq!(grid[[0, 1]], 10);
        assert_eq!(grid[[3, 2]], 200);
        assert_eq!(grid[[1, 0]], 10);
    }

    #[test]
    fn test_no_samples_is_mid_gray() {
        let image = NormalizedImage::from_grid(Array2::zeros((3, 3)));
        let metadata = SparseCodec::default().encode(&image).unwrap().metadata;
        let decoded = SparseCodec::default().decode(&[0, 0, 0, 0], &metadata).unwrap();
        assert_eq!(decoded.grid, Array2::from_elem((3, 3), MID_GRAY));
    }

    #[test]
    fn test_truncated_payload() {
        let image = NormalizedImage::from_grid(test_image(8, 8, Pattern::Gradient, 0));
        let encoded = SparseCodec::new(4).encode(&image).unwrap();
        let decoded = SparseCodec::default().decode(&encoded.payload[..2], &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, Array2::<u8>::zeros((8, 8)));

        // Header plus one whole sample: everything takes that sample's value.
        let decoded = SparseCodec::default().decode(&encoded.payload[..11], &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, Array2::from_elem((8, 8), image.grid()[[0, 0]]));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let image = NormalizedImage::from_grid(Array2::zeros((1, MAX_DIMENSION + 1)));
        assert!(matches!(
            SparseCodec::default().encode(&image),
            Err(CodecError::UnsupportedShape(_))
        ));
    }
}
