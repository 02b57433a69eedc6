//! Information-theoretic and fidelity metrics.
//!
//! Every function here is pure arithmetic over in-memory symbols: no hidden
//! state, no allocation beyond scratch buffers, and no failure modes. Degenerate
//! inputs (empty images, zero compressed size, zero entropy) produce the safe
//! defaults documented on each function instead of dividing by zero.

use ndarray::{Array2, ArrayView, ArrayViewD, Axis, Dimension, Ix2};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// SSIM stability constant `K1`.
const SSIM_K1: f64 = 0.01;
/// SSIM stability constant `K2`.
const SSIM_K2: f64 = 0.03;
/// Dynamic range of an 8-bit symbol.
const SYMBOL_RANGE: f64 = 255.0;

//==================================================================================
// 1. Entropy
//==================================================================================

/// Builds the 256-bin histogram of a symbol stream.
pub fn histogram<'a>(symbols: impl IntoIterator<Item = &'a u8>) -> [u64; 256] {
    let mut counts = [0u64; 256];
    for &s in symbols {
        counts[s as usize] += 1;
    }
    counts
}

fn entropy_from_counts(counts: impl Iterator<Item = u64> + Clone) -> f64 {
    let total: u64 = counts.clone().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = counts
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    // A single repeated symbol sums to -0.0.
    h.max(0.0)
}

/// Shannon entropy `-Σ p·log2(p)` of an 8-bit symbol stream, in bits per symbol.
///
/// The result lies in `[0, 8]`. An empty stream has entropy 0.
pub fn entropy<'a>(symbols: impl IntoIterator<Item = &'a u8>) -> f64 {
    let counts = histogram(symbols);
    entropy_from_counts(counts.iter().copied())
}

/// Shannon entropy of an arbitrary stream of hashable symbols, such as the
/// signed residuals produced by differential coding.
pub fn symbol_entropy<T: Eq + Hash>(values: impl IntoIterator<Item = T>) -> f64 {
    let mut counts: HashMap<T, u64> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    entropy_from_counts(counts.values().copied())
}

//==================================================================================
// 2. Fidelity: MSE, PSNR, SSIM
//==================================================================================

/// Mean squared error between two images.
///
/// Empty images have an MSE of 0. Images of different shapes are infinitely far apart.
pub fn mse<D: Dimension>(a: ArrayView<'_, u8, D>, b: ArrayView<'_, u8, D>) -> f64 {
    if a.shape() != b.shape() {
        return f64::INFINITY;
    }
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    sum / a.len() as f64
}

/// Peak signal-to-noise ratio in decibels: `10·log10(max² / mse)`.
///
/// Returns `+∞` for a perfect reconstruction and 0 when the shapes differ.
pub fn psnr<D: Dimension>(a: ArrayView<'_, u8, D>, b: ArrayView<'_, u8, D>, max_value: f64) -> f64 {
    let err = mse(a, b);
    if err == 0.0 {
        return f64::INFINITY;
    }
    if !err.is_finite() {
        return 0.0;
    }
    10.0 * (max_value * max_value / err).log10()
}

/// Maps an out-of-range index into `0..len` the way scipy's `reflect` mode
/// does (`d c b a | a b c d | d c b a`).
fn reflect_index(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Mean of a `size`-wide window centred on `center` along a line of length `len`.
fn window_mean(len: usize, size: usize, center: usize, sample: impl Fn(usize) -> f64) -> f64 {
    let left = (size / 2) as isize;
    let right = (size - 1) as isize - left;
    let sum: f64 = (-left..=right)
        .map(|offset| sample(reflect_index(center as isize + offset, len)))
        .sum();
    sum / size as f64
}

/// Separable box filter with reflected borders.
fn uniform_filter(img: &Array2<f64>, size: usize) -> Array2<f64> {
    let (rows, cols) = img.dim();
    let horizontal = Array2::from_shape_fn((rows, cols), |(i, j)| {
        window_mean(cols, size, j, |k| img[[i, k]])
    });
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        window_mean(rows, size, i, |k| horizontal[[k, j]])
    })
}

fn ssim_2d(a: ArrayView<'_, u8, Ix2>, b: ArrayView<'_, u8, Ix2>, window: usize) -> f64 {
    if a.is_empty() {
        return 1.0;
    }
    let c1 = (SSIM_K1 * SYMBOL_RANGE).powi(2);
    let c2 = (SSIM_K2 * SYMBOL_RANGE).powi(2);

    let img1 = a.mapv(f64::from);
    let img2 = b.mapv(f64::from);

    let mu1 = uniform_filter(&img1, window);
    let mu2 = uniform_filter(&img2, window);
    let e11 = uniform_filter(&(&img1 * &img1), window);
    let e22 = uniform_filter(&(&img2 * &img2), window);
    let e12 = uniform_filter(&(&img1 * &img2), window);

    let mut total = 0.0;
    for (idx, &m1) in mu1.indexed_iter() {
        let m2 = mu2[idx];
        let sigma1_sq = e11[idx] - m1 * m1;
        let sigma2_sq = e22[idx] - m2 * m2;
        let sigma12 = e12[idx] - m1 * m2;
        let numerator = (2.0 * m1 * m2 + c1) * (2.0 * sigma12 + c2);
        let denominator = (m1 * m1 + m2 * m2 + c1) * (sigma1_sq + sigma2_sq + c2);
        total += numerator / denominator;
    }
    total / a.len() as f64
}

/// Structural similarity over a sliding `window x window` box, in `[0, 1]`.
///
/// Mismatched shapes yield 0. Colour images are scored per channel and averaged.
/// One-dimensional input is treated as a single row.
pub fn ssim<D: Dimension>(a: ArrayView<'_, u8, D>, b: ArrayView<'_, u8, D>, window: usize) -> f64 {
    if a.shape() != b.shape() {
        return 0.0;
    }
    let window = window.max(1);
    let a: ArrayViewD<'_, u8> = a.into_dyn();
    let b: ArrayViewD<'_, u8> = b.into_dyn();

    let score = match a.ndim() {
        1 => {
            let a = a.insert_axis(Axis(0)).into_dimensionality::<Ix2>();
            let b = b.insert_axis(Axis(0)).into_dimensionality::<Ix2>();
            match (a, b) {
                (Ok(a), Ok(b)) => ssim_2d(a, b, window),
                _ => 0.0,
            }
        }
        2 => match (a.into_dimensionality::<Ix2>(), b.into_dimensionality::<Ix2>()) {
            (Ok(a), Ok(b)) => ssim_2d(a, b, window),
            _ => 0.0,
        },
        3 => {
            let channels = a.len_of(Axis(2));
            if channels == 0 {
                return 1.0;
            }
            let mut sum = 0.0;
            for c in 0..channels {
                let pa = a.index_axis(Axis(2), c).into_dimensionality::<Ix2>();
                let pb = b.index_axis(Axis(2), c).into_dimensionality::<Ix2>();
                if let (Ok(pa), Ok(pb)) = (pa, pb) {
                    sum += ssim_2d(pa, pb, window);
                }
            }
            sum / channels as f64
        }
        _ => 0.0,
    };
    score.clamp(0.0, 1.0)
}

//==================================================================================
// 3. Size Arithmetic
//==================================================================================

/// `original / compressed`; `+∞` when nothing was written.
pub fn compression_ratio(original_bytes: usize, compressed_bytes: usize) -> f64 {
    if compressed_bytes == 0 {
        return f64::INFINITY;
    }
    original_bytes as f64 / compressed_bytes as f64
}

/// Percentage of the original size saved; negative for expansion, 0 for empty input.
pub fn space_saved(original_bytes: usize, compressed_bytes: usize) -> f64 {
    if original_bytes == 0 {
        return 0.0;
    }
    (original_bytes as f64 - compressed_bytes as f64) / original_bytes as f64 * 100.0
}

/// Bits per pixel; 0 for an empty image.
pub fn bits_per_pixel(total_bits: usize, num_pixels: usize) -> f64 {
    if num_pixels == 0 {
        return 0.0;
    }
    total_bits as f64 / num_pixels as f64
}

//==================================================================================
// 4. Distribution Analysis
//==================================================================================

/// Summary statistics of a symbol distribution.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct DistributionStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    pub unique_values: usize,
    pub entropy: f64,
}

/// The `k`-th smallest symbol (0-based) described by a histogram.
fn nth_from_histogram(counts: &[u64; 256], k: u64) -> f64 {
    let mut seen = 0u64;
    for (symbol, &c) in counts.iter().enumerate() {
        seen += c;
        if seen > k {
            return symbol as f64;
        }
    }
    0.0
}

/// Computes min/max/mean/median/std/unique count/entropy. All zeros for empty input.
pub fn distribution_stats<'a>(symbols: impl IntoIterator<Item = &'a u8>) -> DistributionStats {
    let counts = histogram(symbols);
    let n: u64 = counts.iter().sum();
    if n == 0 {
        return DistributionStats::default();
    }

    let present = || counts.iter().enumerate().filter(|(_, &c)| c > 0);
    let min = present().next().map(|(s, _)| s as f64).unwrap_or(0.0);
    let max = present().last().map(|(s, _)| s as f64).unwrap_or(0.0);
    let mean = present().map(|(s, &c)| s as f64 * c as f64).sum::<f64>() / n as f64;
    let variance = present()
        .map(|(s, &c)| {
            let d = s as f64 - mean;
            d * d * c as f64
        })
        .sum::<f64>()
        / n as f64;
    let median = if n % 2 == 1 {
        nth_from_histogram(&counts, n / 2)
    } else {
        (nth_from_histogram(&counts, n / 2 - 1) + nth_from_histogram(&counts, n / 2)) / 2.0
    };

    DistributionStats {
        min,
        max,
        mean,
        median,
        std: variance.sqrt(),
        unique_values: present().count(),
        entropy: entropy_from_counts(counts.iter().copied()),
    }
}

//==================================================================================
// 5. Comprehensive Quality Analysis
//==================================================================================

/// Every metric for one original/reconstruction pair, ready to hand to a
/// report generator as structured context.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub original_entropy: f64,
    pub reconstructed_entropy: f64,
    /// Percentage drop in entropy from original to reconstruction.
    pub entropy_reduction: f64,
    pub psnr_db: f64,
    pub ssim: f64,
    pub mse: f64,
    pub original_size_bytes: usize,
    pub compressed_size_bytes: usize,
    pub compression_ratio: f64,
    pub space_saved_percent: f64,
    pub bits_per_pixel: f64,
    pub theoretical_min_bits: f64,
    pub efficiency_percent: f64,
    pub num_pixels: usize,
    pub original_bpp: f64,
}

/// Runs every metric over an original/reconstruction pair.
pub fn analyze_quality<D: Dimension>(
    original: ArrayView<'_, u8, D>,
    reconstructed: ArrayView<'_, u8, D>,
    original_size: usize,
    compressed_size: usize,
) -> QualityReport {
    let original_entropy = entropy(original.iter());
    let reconstructed_entropy = entropy(reconstructed.iter());
    let num_pixels = original.len();
    let theoretical_min_bits = num_pixels as f64 * original_entropy;
    let efficiency_percent = if compressed_size > 0 {
        theoretical_min_bits / (compressed_size as f64 * 8.0) * 100.0
    } else {
        0.0
    };

    QualityReport {
        original_entropy,
        reconstructed_entropy,
        entropy_reduction: if original_entropy > 0.0 {
            (original_entropy - reconstructed_entropy) / original_entropy * 100.0
        } else {
            0.0
        },
        psnr_db: psnr(original.view(), reconstructed.view(), SYMBOL_RANGE),
        ssim: ssim(original.view(), reconstructed.view(), 11),
        mse: mse(original.view(), reconstructed.view()),
        original_size_bytes: original_size,
        compressed_size_bytes: compressed_size,
        compression_ratio: compression_ratio(original_size, compressed_size),
        space_saved_percent: space_saved(original_size, compressed_size),
        bits_per_pixel: bits_per_pixel(compressed_size * 8, num_pixels),
        theoretical_min_bits,
        efficiency_percent,
        num_pixels,
        original_bpp: 8.0,
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let thin = "-".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "COMPRESSION & QUALITY ANALYSIS")?;
        writeln!(f, "{}", rule)?;

        writeln!(f, "\nINFORMATION THEORY METRICS\n{}", thin)?;
        writeln!(f, "Original Entropy:       {:.3} bits/symbol", self.original_entropy)?;
        writeln!(f, "Reconstructed Entropy:  {:.3} bits/symbol", self.reconstructed_entropy)?;
        writeln!(f, "Entropy Reduction:      {:.1}%", self.entropy_reduction)?;

        writeln!(f, "\nQUALITY METRICS\n{}", thin)?;
        writeln!(f, "PSNR:                   {:.2} dB", self.psnr_db)?;
        writeln!(f, "SSIM:                   {:.4}", self.ssim)?;
        writeln!(f, "MSE:                    {:.2}", self.mse)?;

        writeln!(f, "\nCOMPRESSION METRICS\n{}", thin)?;
        writeln!(f, "Original Size:          {} bytes", self.original_size_bytes)?;
        writeln!(f, "Compressed Size:        {} bytes", self.compressed_size_bytes)?;
        writeln!(f, "Compression Ratio:      {:.2}x", self.compression_ratio)?;
        writeln!(f, "Space Saved:            {:.1}%", self.space_saved_percent)?;
        writeln!(f, "Bits per Pixel:         {:.2}", self.bits_per_pixel)?;

        writeln!(f, "\nEFFICIENCY\n{}", thin)?;
        writeln!(f, "Theoretical Minimum:    {:.0} bits", self.theoretical_min_bits)?;
        writeln!(f, "Efficiency:             {:.1}%", self.efficiency_percent)?;
        write!(f, "\n{}", rule)
    }
}

//==================================================================================
// 6. Unit Tests
//==================================================================================
