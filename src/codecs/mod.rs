//! This module serves as the public API and dispatcher for the six image codecs.
//!
//! Each codec is a pure, stateless value implementing `ImageCodec`. The closed
//! `Codec` enum wraps all of them so callers holding a method key (from the
//! registry or from `metadata.method`) can dispatch without trait objects.
//! Any tree, table or scratch buffer a codec builds lives only for one call.

use ndarray::Array2;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CodecError, Result};
use crate::image::NormalizedImage;
use crate::metadata::Metadata;
use crate::metrics;
use crate::registry::Method;

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Baseline: one byte per symbol.
pub mod naive;

/// Lossless, exploits runs.
pub mod rle;
pub mod differential;

/// Lossless, entropy coding.
pub mod huffman;

/// Lossy.
pub mod sparse;
pub mod dct;

pub use dct::DctCodec;
pub use differential::DifferentialCodec;
pub use huffman::HuffmanCodec;
pub use naive::NaiveCodec;
pub use rle::RleCodec;
pub use sparse::SparseCodec;

//==================================================================================
// 2. The Codec Interface
//==================================================================================

/// The output of one encode call.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub payload: Vec<u8>,
    pub metadata: Metadata,
    pub stats: CodecStats,
}

/// The output of one decode call: the 2-D symbol grid (channel layout is
/// restored separately by `image::restore_layout`).
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub grid: Array2<u8>,
    pub stats: CodecStats,
}

/// A matched encode/decode pair.
pub trait ImageCodec {
    /// The registry method this codec implements.
    fn method(&self) -> Method;

    /// Maps a normalized image to a payload and the metadata needed to invert it.
    fn encode(&self, image: &NormalizedImage) -> Result<Encoded>;

    /// Rebuilds the symbol grid from a payload and its metadata.
    ///
    /// A damaged payload is not an error: the decoder logs a warning and
    /// returns an image of the declared shape, zero-filled where nothing
    /// could be recovered.
    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded>;
}

//==================================================================================
// 3. Statistics Record
//==================================================================================

/// Per-call diagnostics. Never needed for reconstruction.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CodecStats {
    pub method: Method,
    pub original_pixels: usize,
    pub compressed_bytes: usize,
    pub compression_ratio: f64,
    /// Entropy of the symbols the call operated on, in bits per symbol.
    pub entropy: f64,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl CodecStats {
    /// Creates a record whose ratio is `original_pixels / compressed_bytes`.
    pub fn new(method: Method, original_pixels: usize, compressed_bytes: usize, entropy: f64) -> Self {
        Self {
            method,
            original_pixels,
            compressed_bytes,
            compression_ratio: metrics::compression_ratio(original_pixels, compressed_bytes),
            entropy,
            details: Map::new(),
        }
    }

    /// Attaches a method-specific diagnostic.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Space saved relative to one byte per pixel, in percent.
    pub fn space_saved(&self) -> f64 {
        metrics::space_saved(self.original_pixels, self.compressed_bytes)
    }
}

/// Builds the statistics every decoder reports.
pub(crate) fn decode_stats(method: Method, grid: &Array2<u8>, payload_len: usize) -> CodecStats {
    CodecStats::new(method, grid.len(), payload_len, metrics::entropy(grid.iter()))
}

//==================================================================================
// 4. Shared Decoder Helpers
//==================================================================================

/// The grid the decoder must produce. Metadata without a usable shape yields
/// an empty grid; a shape whose pixel count cannot be addressed is an error.
pub(crate) fn decode_dims(metadata: &Metadata) -> Result<(usize, usize)> {
    let (rows, cols) = metadata.grid_dims().unwrap_or_else(|| match metadata.shape.as_slice() {
        [len] => (1, *len),
        other => {
            log::warn!("metadata shape {:?} has no 2-D grid; decoding to an empty image", other);
            (0, 0)
        }
    });
    match rows.checked_mul(cols) {
        Some(pixels) if pixels <= isize::MAX as usize => Ok((rows, cols)),
        _ => Err(CodecError::UnsupportedShape(format!(
            "declared {}x{} grid exceeds the addressable pixel count",
            rows, cols
        ))),
    }
}

/// The zero-filled image returned when a payload is too damaged to decode.
pub(crate) fn degraded_grid(method: Method, rows: usize, cols: usize, reason: &str) -> Array2<u8> {
    log::warn!("{} payload unusable ({}); returning a zero-filled {}x{} image", method, reason, rows, cols);
    Array2::zeros((rows, cols))
}

//==================================================================================
// 5. The Closed Dispatcher
//==================================================================================

/// Every codec, as one sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum Codec {
    Naive(NaiveCodec),
    Rle(RleCodec),
    Differential(DifferentialCodec),
    Huffman(HuffmanCodec),
    Sparse(SparseCodec),
    Dct(DctCodec),
}

impl ImageCodec for Codec {
    fn method(&self) -> Method {
        match self {
            Self::Naive(c) => c.method(),
            Self::Rle(c) => c.method(),
            Self::Differential(c) => c.method(),
            Self::Huffman(c) => c.method(),
            Self::Sparse(c) => c.method(),
            Self::Dct(c) => c.method(),
        }
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        match self {
            Self::Naive(c) => c.encode(image),
            Self::Rle(c) => c.encode(image),
            Self::Differential(c) => c.encode(image),
            Self::Huffman(c) => c.encode(image),
            Self::Sparse(c) => c.encode(image),
            Self::Dct(c) => c.encode(image),
        }
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        match self {
            Self::Naive(c) => c.decode(payload, metadata),
            Self::Rle(c) => c.decode(payload, metadata),
            Self::Differential(c) => c.decode(payload, metadata),
            Self::Huffman(c) => c.decode(payload, metadata),
            Self::Sparse(c) => c.decode(payload, metadata),
            Self::Dct(c) => c.decode(payload, metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::registry::Registry;
    use crate::synthetic::{test_image, Pattern};

    fn all_codecs() -> Vec<Codec> {
        Method::ALL
            .iter()
            .map(|m| Registry::standard().codec(*m, &CodecConfig::default()))
            .collect()
    }

    #[test]
    fn test_lossless_methods_roundtrip_every_pattern() {
        for pattern in [Pattern::Gradient, Pattern::Blocks, Pattern::Noise, Pattern::Checkerboard] {
            let image = NormalizedImage::from_grid(test_image(37, 53, pattern, 11));
            for codec in all_codecs().into_iter().filter(|c| c.method().is_lossless()) {
                let encoded = codec.encode(&image).unwrap();
                assert_eq!(encoded.metadata.method(), codec.method());
                let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
                assert_eq!(&decoded.grid, image.grid(), "{} on {:?}", codec.method(), pattern);
            }
        }
    }

    #[test]
    fn test_every_codec_handles_empty_images() {
        let image = NormalizedImage::from_grid(Array2::zeros((0, 0)));
        for codec in all_codecs() {
            let encoded = codec.encode(&image).unwrap();
            assert!(encoded.payload.is_empty(), "{}", codec.method());
            let decoded = codec.decode(&encoded.payload, &encoded.metadata).unwrap();
            assert!(decoded.grid.is_empty(), "{}", codec.method());
        }
    }

    #[test]
    fn test_every_decoder_survives_garbage() {
        let image = NormalizedImage::from_grid(test_image(16, 16, Pattern::Gradient, 0));
        for codec in all_codecs() {
            let encoded = codec.encode(&image).unwrap();
            for garbage in [&[][..], &[0xFF][..], &[0, 0, 0, 9, 1, 2, 3][..]] {
                let decoded = codec.decode(garbage, &encoded.metadata).unwrap();
                assert_eq!(decoded.grid.dim(), (16, 16), "{}", codec.method());
            }
        }
    }

    #[test]
    fn test_stats_serialize_with_details() {
        let stats = CodecStats::new(Method::Rle, 100, 50, 1.5).with_detail("rle_pairs", 25);
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["method"], "rle");
        assert_eq!(value["compression_ratio"], 2.0);
        assert_eq!(value["details"]["rle_pairs"], 25);
        assert_eq!(stats.space_saved(), 50.0);
    }
}
