//! This module defines the canonical, type-safe representation of the pixel
//! container types the normalizer accepts.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The element type of a raw pixel container before normalization.
///
/// The lowercase serde names match the numpy dtype strings written into the
/// `dtype` metadata field, so containers stay readable by the Python tooling.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    UInt8,
    UInt16,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    /// Returns the numpy-style name, e.g. `"uint8"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parses a numpy-style name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uint8" => Some(Self::UInt8),
            "uint16" => Some(Self::UInt16),
            "int16" => Some(Self::Int16),
            "int32" => Some(Self::Int32),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Provides the canonical string representation for a `PixelType`.
impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive that may appear in a raw pixel container.
pub trait Pixel: Copy + ToPrimitive {
    const PIXEL_TYPE: PixelType;
}

macro_rules! impl_pixel {
    ($T:ty, $variant:ident) => {
        impl Pixel for $T {
            const PIXEL_TYPE: PixelType = PixelType::$variant;
        }
    };
}

impl_pixel!(u8, UInt8);
impl_pixel!(u16, UInt16);
impl_pixel!(i16, Int16);
impl_pixel!(i32, Int32);
impl_pixel!(f32, Float32);
impl_pixel!(f64, Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for ty in [
            PixelType::UInt8,
            PixelType::UInt16,
            PixelType::Int16,
            PixelType::Int32,
            PixelType::Float32,
            PixelType::Float64,
        ] {
            assert_eq!(PixelType::from_name(ty.name()), Some(ty));
            assert_eq!(serde_json::to_string(&ty).unwrap(), format!("\"{}\"", ty));
        }
        assert_eq!(PixelType::from_name("complex128"), None);
    }

    #[test]
    fn test_pixel_trait_mapping() {
        assert_eq!(<u8 as Pixel>::PIXEL_TYPE, PixelType::UInt8);
        assert_eq!(<f32 as Pixel>::PIXEL_TYPE.size_in_bytes(), 4);
        assert_eq!(<f64 as Pixel>::PIXEL_TYPE.size_in_bytes(), 8);
    }
}
