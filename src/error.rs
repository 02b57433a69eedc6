// In: src/error.rs

//! This module defines the single, unified error type for the entire infocodec library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Only a small part of the taxonomy ever reaches a caller. Codec-internal damage
//! (truncated payloads, short coefficient streams, mismatched element counts) is
//! recovered inside the decoders, which log a warning and return a shaped image.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    // =========================================================================
    // === High-Level, Semantic Errors
    // =========================================================================
    /// The method key is not present in the registry. Never silently defaulted.
    #[error("Unsupported method: '{0}'")]
    UnsupportedMethod(String),

    #[error("Unsupported image shape: {0}")]
    UnsupportedShape(String),

    #[error("Invalid codec parameter: {0}")]
    InvalidParameter(String),

    #[error("Container serialization/deserialization failed: {0}")]
    ContainerFormat(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while reading metadata.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// An error for Python FFI operations.
    #[error("FFI operation failed: {0}")]
    Ffi(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for CodecError {
    fn from(err: pyo3::PyErr) -> Self {
        CodecError::Ffi(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<CodecError> for pyo3::PyErr {
    fn from(err: CodecError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
