//! Deterministic synthetic test images.
//!
//! Used by the test suites, the benches and the Python demo pages. Random
//! patterns draw from a `StdRng` seeded by the caller, so a `(pattern, seed)`
//! pair always yields the same image.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Edge length of the uniform tiles in `Pattern::Blocks`.
pub const BLOCK_EDGE: usize = 8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// `(x + y) / 2` over two `0..=255` ramps.
    Gradient,
    /// 8x8 tiles, each a single random value.
    Blocks,
    /// Uniform random symbols.
    Noise,
    /// Alternating 255 / 0 pixels.
    Checkerboard,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [Pattern::Gradient, Pattern::Blocks, Pattern::Noise, Pattern::Checkerboard];

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "gradient" => Ok(Self::Gradient),
            "blocks" => Ok(Self::Blocks),
            "noise" => Ok(Self::Noise),
            "checkerboard" => Ok(Self::Checkerboard),
            other => Err(CodecError::InvalidParameter(format!("unknown test pattern '{}'", other))),
        }
    }
}

/// `n` evenly spaced values from 0 to 255 inclusive.
fn ramp(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f64 * 255.0 / (n - 1) as f64).collect(),
    }
}

/// Builds a `rows x cols` test image.
pub fn test_image(rows: usize, cols: usize, pattern: Pattern, seed: u64) -> Array2<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    match pattern {
        Pattern::Gradient => {
            let (ys, xs) = (ramp(rows), ramp(cols));
            Array2::from_shape_fn((rows, cols), |(i, j)| ((xs[j] + ys[i]) / 2.0) as u8)
        }
        Pattern::Blocks => {
            let tiles_x = cols.div_ceil(BLOCK_EDGE);
            let tiles_y = rows.div_ceil(BLOCK_EDGE);
            let tiles: Vec<u8> = (0..tiles_x * tiles_y).map(|_| rng.random()).collect();
            Array2::from_shape_fn((rows, cols), |(i, j)| tiles[(i / BLOCK_EDGE) * tiles_x + j / BLOCK_EDGE])
        }
        Pattern::Noise => Array2::from_shape_simple_fn((rows, cols), || rng.random_range(0..=u8::MAX)),
        Pattern::Checkerboard => {
            Array2::from_shape_fn((rows, cols), |(i, j)| if (i + j) % 2 == 0 { 255 } else { 0 })
        }
    }
}
