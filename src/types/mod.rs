//! This module defines the core, strongly-typed data representations used
//! by the normalizer and the metadata record.
//!
//! It currently includes the canonical `PixelType` enum, which replaces
//! free-form dtype strings with a safe, serializable enum while keeping the
//! numpy-style names on the wire.

pub mod pixel_type;

// Re-export the main type(s) for easier access.
pub use pixel_type::{Pixel, PixelType};
