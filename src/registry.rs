//! The static method registry.
//!
//! One entry per codec, built at compile time. Dispatch anywhere in the crate
//! (the facade, the selector, the FFI layer) goes through `Registry::standard()`
//! and fails with `CodecError::UnsupportedMethod` for keys it does not know.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codecs::{
    Codec, DctCodec, DifferentialCodec, HuffmanCodec, NaiveCodec, RleCodec, SparseCodec,
};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};

//==================================================================================
// 1. Method Keys
//==================================================================================

/// The closed set of codec methods.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Naive,
    Rle,
    Differential,
    Huffman,
    Sparse,
    Dct,
}

impl Method {
    /// Every method, in registry order.
    pub const ALL: [Method; 6] = [
        Method::Naive,
        Method::Rle,
        Method::Differential,
        Method::Huffman,
        Method::Sparse,
        Method::Dct,
    ];

    /// The lowercase registry key written into `metadata.method`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Rle => "rle",
            Self::Differential => "differential",
            Self::Huffman => "huffman",
            Self::Sparse => "sparse",
            Self::Dct => "dct",
        }
    }

    /// Resolves a registry key or alias. Unknown keys are an error, never a default.
    pub fn from_key(key: &str) -> Result<Self> {
        Registry::standard().lookup(key).map(|entry| entry.method)
    }

    /// `true` for methods whose decode reproduces the input exactly.
    pub fn is_lossless(&self) -> bool {
        !matches!(self, Self::Sparse | Self::Dct)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

//==================================================================================
// 2. The Lookup Table
//==================================================================================

/// One row of the registry: a key, its aliases and the codec constructor.
pub struct RegistryEntry {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub method: Method,
    build: fn(&CodecConfig) -> Codec,
}

impl RegistryEntry {
    fn matches(&self, key: &str) -> bool {
        self.key == key || self.aliases.contains(&key)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("key", &self.key)
            .field("aliases", &self.aliases)
            .field("method", &self.method)
            .finish()
    }
}

fn build_naive(_: &CodecConfig) -> Codec {
    Codec::Naive(NaiveCodec)
}

fn build_rle(_: &CodecConfig) -> Codec {
    Codec::Rle(RleCodec)
}

fn build_differential(_: &CodecConfig) -> Codec {
    Codec::Differential(DifferentialCodec)
}

fn build_huffman(_: &CodecConfig) -> Codec {
    Codec::Huffman(HuffmanCodec)
}

fn build_sparse(config: &CodecConfig) -> Codec {
    Codec::Sparse(SparseCodec::new(config.sampling_rate))
}

fn build_dct(config: &CodecConfig) -> Codec {
    Codec::Dct(DctCodec::new(config.block_size, config.quality))
}

/// The method registry.
#[derive(Debug)]
pub struct Registry {
    entries: &'static [RegistryEntry],
}

static STANDARD: Registry = Registry {
    entries: &[
        RegistryEntry { key: "naive", aliases: &["direct"], method: Method::Naive, build: build_naive },
        RegistryEntry { key: "rle", aliases: &[], method: Method::Rle, build: build_rle },
        RegistryEntry {
            key: "differential",
            aliases: &[],
            method: Method::Differential,
            build: build_differential,
        },
        RegistryEntry { key: "huffman", aliases: &[], method: Method::Huffman, build: build_huffman },
        RegistryEntry { key: "sparse", aliases: &[], method: Method::Sparse, build: build_sparse },
        RegistryEntry { key: "dct", aliases: &[], method: Method::Dct, build: build_dct },
    ],
};

impl Registry {
    /// The registry holding the six built-in codecs.
    pub fn standard() -> &'static Registry {
        &STANDARD
    }

    /// Finds the entry for a key or alias.
    pub fn lookup(&self, key: &str) -> Result<&RegistryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(key))
            .ok_or_else(|| CodecError::UnsupportedMethod(key.to_string()))
    }

    /// Builds the encoder for `key`, configured from `config`.
    pub fn encoder(&self, key: &str, config: &CodecConfig) -> Result<Codec> {
        let entry = self.lookup(key)?;
        Ok((entry.build)(config))
    }

    /// Builds the decoder for `key`. Decoders take every parameter they need
    /// from the metadata, so no configuration is involved.
    pub fn decoder(&self, key: &str) -> Result<Codec> {
        let entry = self.lookup(key)?;
        Ok((entry.build)(&CodecConfig::default()))
    }

    /// Builds the codec for an already resolved method.
    pub fn codec(&self, method: Method, config: &CodecConfig) -> Codec {
        match self.entries.iter().find(|entry| entry.method == method) {
            Some(entry) => (entry.build)(config),
            None => build_naive(config),
        }
    }

    /// The canonical keys, in registry order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::ImageCodec;

    #[test]
    fn test_every_method_is_registered() {
        let registry = Registry::standard();
        assert_eq!(registry.keys(), vec!["naive", "rle", "differential", "huffman", "sparse", "dct"]);
        for method in Method::ALL {
            assert_eq!(Method::from_key(method.key()).unwrap(), method);
            let codec = registry.encoder(method.key(), &CodecConfig::default()).unwrap();
            assert_eq!(codec.method(), method);
            assert_eq!(registry.codec(method, &CodecConfig::default()).method(), method);
        }
    }

    #[test]
    fn test_unknown_key_is_unsupported() {
        let err = Registry::standard().decoder("jpeg2000").unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedMethod(ref m) if m == "jpeg2000"));
        assert_eq!(err.to_string(), "Unsupported method: 'jpeg2000'");
        assert!(Method::from_key("Huffman").is_err());
    }

    #[test]
    fn test_direct_alias_resolves_to_naive_decoder() {
        let codec = Registry::standard().decoder("direct").unwrap();
        assert_eq!(codec.method(), Method::Naive);
    }

    #[test]
    fn test_lossless_flags() {
        let lossless: Vec<Method> = Method::ALL.into_iter().filter(Method::is_lossless).collect();
        assert_eq!(lossless, vec![Method::Naive, Method::Rle, Method::Differential, Method::Huffman]);
    }
}
