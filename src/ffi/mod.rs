//! Foreign-function interfaces. Compiled only with the `python` feature.

#[cfg(feature = "python")]
pub mod python;
