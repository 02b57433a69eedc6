//! The metadata record that travels next to every payload.
//!
//! On the wire it is a flat JSON object. The common keys (`shape`, `dtype`,
//! `original_shape`) live on `Metadata` itself, while the `method` key and the
//! method-specific extensions are carried by the internally tagged
//! `CodecParams` enum, flattened into the same object:
//!
//! ```json
//! {"shape": [64, 64], "dtype": "uint8", "original_shape": [64, 64],
//!  "method": "dct", "block_size": 8, "quality": 0.8, "padded_shape": [64, 64], "num_blocks": 64}
//! ```
//!
//! Huffman symbol keys are decimal strings (`"0"`..=`"255"`), because JSON object
//! keys are always strings. They are parsed back to integers by the Huffman
//! decoder before the table is inverted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{CodecError, Result};
use crate::registry::Method;
use crate::types::PixelType;

/// The complete record needed (together with the payload) to rebuild an image.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Shape of the image handed to the normalizer, channels included.
    pub shape: Vec<usize>,

    /// Numpy-style name of the original element type.
    #[serde(default = "default_dtype")]
    pub dtype: String,

    /// Shape of the normalized 2-D symbol grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_shape: Option<Vec<usize>>,

    /// The producing method and its parameters.
    #[serde(flatten)]
    pub params: CodecParams,
}

/// Method-specific metadata, tagged by the registry key of the producing codec.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum CodecParams {
    Naive,
    Rle {
        #[serde(default)]
        rle_pairs: usize,
    },
    Differential {
        #[serde(default)]
        max_diff: u32,
        #[serde(default)]
        bits_per_symbol: u32,
    },
    Huffman {
        /// Symbol (decimal string) -> codeword (string of '0'/'1').
        #[serde(default)]
        huffman_codes: BTreeMap<String, String>,
        #[serde(default)]
        num_symbols: usize,
    },
    Sparse {
        #[serde(default = "default_sampling_rate")]
        sampling_rate: usize,
        #[serde(default)]
        num_samples: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sampled_positions: Vec<[usize; 2]>,
    },
    Dct {
        #[serde(default = "default_block_size")]
        block_size: usize,
        #[serde(default = "default_quality")]
        quality: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        padded_shape: Option<Vec<usize>>,
        #[serde(default)]
        num_blocks: usize,
    },
}

impl CodecParams {
    /// The registry method this parameter set belongs to.
    pub fn method(&self) -> Method {
        match self {
            Self::Naive => Method::Naive,
            Self::Rle { .. } => Method::Rle,
            Self::Differential { .. } => Method::Differential,
            Self::Huffman { .. } => Method::Huffman,
            Self::Sparse { .. } => Method::Sparse,
            Self::Dct { .. } => Method::Dct,
        }
    }
}

impl Metadata {
    /// Creates the common part of a record; codecs fill in `params`.
    pub fn new(shape: Vec<usize>, dtype: impl Into<String>, grid: (usize, usize), params: CodecParams) -> Self {
        Self {
            shape,
            dtype: dtype.into(),
            original_shape: Some(vec![grid.0, grid.1]),
            params,
        }
    }

    /// Shortcut for `self.params.method()`.
    pub fn method(&self) -> Method {
        self.params.method()
    }

    /// The 2-D grid the decoder must produce: `original_shape` when present,
    /// otherwise the first two dimensions of `shape`.
    pub fn grid_dims(&self) -> Option<(usize, usize)> {
        let dims = self
            .original_shape
            .as_deref()
            .filter(|s| s.len() >= 2)
            .unwrap_or(self.shape.as_slice());
        match dims {
            [rows, cols, ..] => Some((*rows, *cols)),
            _ => None,
        }
    }

    /// Parses a metadata object, rejecting unknown methods with
    /// `CodecError::UnsupportedMethod` before any typed deserialization.
    pub fn from_json_value(mut value: Value) -> Result<Self> {
        let key = value
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::ContainerFormat("metadata has no 'method' key".to_string()))?;
        let method = Method::from_key(key)?;

        // Aliases such as "direct" are rewritten to the canonical key so the
        // tagged enum only ever sees its own variant names.
        if let Some(obj) = value.as_object_mut() {
            obj.insert("method".to_string(), Value::String(method.key().to_string()));
        }
        let metadata: Self = serde_json::from_value(value)?;
        if metadata.pixel_type().is_none() {
            log::warn!("metadata dtype '{}' is not a known pixel type", metadata.dtype);
        }
        Ok(metadata)
    }

    /// The original element type, when `dtype` names one.
    pub fn pixel_type(&self) -> Option<PixelType> {
        PixelType::from_name(&self.dtype)
    }

    /// Byte size of the original pixel container, or `None` when the dtype is
    /// unknown or the size overflows.
    pub fn original_bytes(&self) -> Option<usize> {
        let element = self.pixel_type()?.size_in_bytes();
        self.shape.iter().try_fold(element, |acc, &dim| acc.checked_mul(dim))
    }

    /// Parses a metadata JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Serializes to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn default_dtype() -> String {
    "uint8".to_string()
}

fn default_sampling_rate() -> usize {
    4
}

fn default_block_size() -> usize {
    8
}

fn default_quality() -> f64 {
    0.8
}
