//! This module provides a set of shared, low-level utility functions used
//! throughout the codec suite.
//!
//! Its primary responsibilities are safe conversions between raw byte buffers
//! and typed slices for the codecs whose payload is a flat array of a wider
//! primitive (`i16` residuals, `f32` coefficients), plus the big-endian field
//! readers used by the self-describing payload headers.

use bytemuck::Pod;

//==================================================================================
// 1. Typed <-> Byte Conversions
//==================================================================================

/// Converts a slice of primitives into a `Vec<u8>` in native (little-endian on all
/// supported targets) byte order.
pub fn typed_slice_to_bytes<T: Pod>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

/// Reads a byte buffer back into owned primitives without any alignment
/// requirement on `bytes`.
///
/// Trailing bytes that do not form a whole element are ignored; the second
/// value of the returned tuple reports how many were dropped so callers can log it.
pub fn bytes_to_typed_vec<T: Pod>(bytes: &[u8]) -> (Vec<T>, usize) {
    let size = std::mem::size_of::<T>();
    let chunks = bytes.chunks_exact(size);
    let remainder = chunks.remainder().len();
    let values = chunks.map(bytemuck::pod_read_unaligned::<T>).collect();
    (values, remainder)
}

//==================================================================================
// 2. Big-Endian Header Fields
//==================================================================================

/// Reads a big-endian `u32` at `offset`, or `None` if the buffer is too short.
pub fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let field: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u32::from_be_bytes(field))
}

/// Reads a big-endian `u16` at `offset`, or `None` if the buffer is too short.
pub fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let field: [u8; 2] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u16::from_be_bytes(field))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
