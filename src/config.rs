// In: src/config.rs

//! The single source of truth for all codec configuration.
//!
//! `CodecConfig` is created once at the application boundary (a CLI flag set,
//! a JSON document from the UI, or a Python dictionary serialised to JSON) and
//! then passed by reference to the registry, which hands each codec only the
//! parameters it understands. Every field has a serde default so a partial
//! document such as `{"quality": 0.5}` is valid.

use serde::{Deserialize, Serialize};

use crate::error::Result;

//==================================================================================
// I. Parameter Bounds
//==================================================================================

/// Lower bound for the DCT quality factor. Values below are clamped up.
pub const MIN_QUALITY: f64 = 0.1;
/// Upper bound for the DCT quality factor. Values above are clamped down.
pub const MAX_QUALITY: f64 = 1.0;

/// Clamps a user-supplied quality into `[MIN_QUALITY, MAX_QUALITY]`.
/// A NaN quality is treated as the maximum.
pub fn clamp_quality(quality: f64) -> f64 {
    if quality.is_nan() {
        return MAX_QUALITY;
    }
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}

//==================================================================================
// II. Auto-Selection Thresholds
//==================================================================================

/// Thresholds for the heuristic method selector in `selector::auto_select`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SelectionThresholds {
    /// Images with fewer distinct symbols than this are routed to RLE.
    #[serde(default = "default_rle_max_unique")]
    pub rle_max_unique: usize,

    /// Entropy (bits/symbol) below which differential coding is chosen.
    #[serde(default = "default_low_entropy")]
    pub low_entropy: f64,

    /// Standard deviation below which differential coding is chosen.
    #[serde(default = "default_low_std")]
    pub low_std: f64,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            rle_max_unique: default_rle_max_unique(),
            low_entropy: default_low_entropy(),
            low_std: default_low_std(),
        }
    }
}

//==================================================================================
// III. The Unified CodecConfig
//==================================================================================

/// The unified configuration for one encode call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    /// DCT quality factor in `(0, 1]`; clamped to `[0.1, 1.0]` when used.
    #[serde(default = "default_quality")]
    pub quality: f64,

    /// Edge length of the square DCT tiles.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Stride, in both dimensions, of the sparse sampler.
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: usize,

    /// Heuristics for `auto` method selection.
    #[serde(default)]
    pub selection: SelectionThresholds,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            block_size: default_block_size(),
            sampling_rate: default_sampling_rate(),
            selection: SelectionThresholds::default(),
        }
    }
}

impl CodecConfig {
    /// Parses a (possibly partial) JSON configuration document.
    /// An empty or whitespace-only string yields the defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style override of the DCT quality.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// Builder-style override of the DCT block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Builder-style override of the sparse sampling stride.
    pub fn with_sampling_rate(mut self, sampling_rate: usize) -> Self {
        self.sampling_rate = sampling_rate;
        self
    }
}

fn default_quality() -> f64 {
    0.8
}

fn default_block_size() -> usize {
    8
}

fn default_sampling_rate() -> usize {
    4
}

fn default_rle_max_unique() -> usize {
    32
}

fn default_low_entropy() -> f64 {
    3.0
}

fn default_low_std() -> f64 {
    30.0
}
