//! This file is the root of the `infocodec` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`codecs`, `bridge`, etc.)
//!     and re-exporting the handful of names most callers need.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (feature `python`).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod bridge;
pub mod codecs;
pub mod config;
pub mod error;
pub mod image;
pub mod metadata;
pub mod metrics;
pub mod observability;
pub mod registry;
pub mod selector;
pub mod synthetic;
pub mod types;

mod ffi;
mod utils;

pub use bridge::{
    analyze, benchmark, compress, compress_auto, compress_to_container, decompress, decompress_container,
    BenchmarkResult, Compressed, Decompressed,
};
pub use codecs::{CodecStats, ImageCodec};
pub use config::CodecConfig;
pub use error::{CodecError, Result};
pub use metadata::{CodecParams, Metadata};
pub use registry::{Method, Registry};

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `infocodec` Python module, containing all exposed Rust functions.
#[cfg(feature = "python")]
#[pymodule]
fn infocodec(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use ffi::python;

    m.add_function(wrap_pyfunction!(python::encode_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::decode_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::encode_container_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::decode_container_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::analyze_container_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::test_image_py, m)?)?;

    // --- Expose the error type; every CodecError surfaces as ValueError ---
    m.add("CodecError", m.py().get_type_bound::<pyo3::exceptions::PyValueError>())?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;

    // --- Turn on logging for method selection and benchmarks ---
    m.add_function(wrap_pyfunction!(python::enable_verbose_logging_py, m)?)?;

    Ok(())
}
