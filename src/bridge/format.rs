//! Defines the on-disk container that carries one encoded image.
//!
//! ```text
//! [metadata_length: u32 BE][metadata: UTF-8 JSON, metadata_length bytes][payload: rest of the buffer]
//! ```
//!
//! The container is the only place where corruption is a hard error: without
//! a readable metadata object there is no shape to degrade to.

use serde::Serialize;
use std::io::{Cursor, Read, Write};

use crate::error::{CodecError, Result};
use crate::metadata::Metadata;
use crate::registry::Method;

//==================================================================================
// Format Constants
//==================================================================================

/// The minimum possible size of a container: the metadata length prefix.
pub const MIN_CONTAINER_SIZE: usize = 4;

//==================================================================================
// I. The Container
//==================================================================================

/// A decoded container: metadata plus the still-encoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub metadata: Metadata,
    pub payload: Vec<u8>,
}

/// Summary of a container, obtained without touching the payload.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub method: Method,
    pub shape: Vec<usize>,
    /// Size of the original pixel container, from `shape` and `dtype`.
    pub original_bytes: Option<usize>,
    pub header_size: usize,
    pub payload_size: usize,
    pub total_size: usize,
}

/// Serializes metadata and payload into one buffer.
pub fn write_container(metadata: &Metadata, payload: &[u8]) -> Result<Vec<u8>> {
    let json = metadata.to_json_string()?;
    let len = u32::try_from(json.len())
        .map_err(|_| CodecError::ContainerFormat(format!("metadata of {} bytes does not fit a u32 length", json.len())))?;

    let mut out = Vec::with_capacity(MIN_CONTAINER_SIZE + json.len() + payload.len());
    out.write_all(&len.to_be_bytes())?;
    out.write_all(json.as_bytes())?;
    out.write_all(payload)?;
    Ok(out)
}

/// Parses the header and returns the metadata plus the header length.
fn read_header(bytes: &[u8]) -> Result<(Metadata, usize)> {
    if bytes.len() < MIN_CONTAINER_SIZE {
        return Err(CodecError::ContainerFormat(format!(
            "Container is too small to be valid. Minimum size: {}, got: {}",
            MIN_CONTAINER_SIZE,
            bytes.len()
        )));
    }

    let mut cursor = Cursor::new(bytes);
    let map_err = |e: std::io::Error| CodecError::ContainerFormat(e.to_string());

    let mut len_buf = [0u8; 4];
    cursor.read_exact(&mut len_buf).map_err(map_err)?;
    let metadata_len = u32::from_be_bytes(len_buf) as usize;

    let header_size = MIN_CONTAINER_SIZE
        .checked_add(metadata_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| {
            CodecError::ContainerFormat(format!(
                "metadata length {} runs past the end of a {}-byte container",
                metadata_len,
                bytes.len()
            ))
        })?;

    let mut json_buf = vec![0u8; metadata_len];
    cursor.read_exact(&mut json_buf).map_err(map_err)?;
    let json = std::str::from_utf8(&json_buf)
        .map_err(|e| CodecError::ContainerFormat(format!("metadata is not UTF-8: {}", e)))?;

    Ok((Metadata::from_json_str(json)?, header_size))
}

/// Splits a container back into metadata and payload.
pub fn read_container(bytes: &[u8]) -> Result<Container> {
    let (metadata, header_size) = read_header(bytes)?;
    Ok(Container {
        metadata,
        payload: bytes[header_size..].to_vec(),
    })
}

/// Reads only the header.
pub fn peek_info(bytes: &[u8]) -> Result<ContainerInfo> {
    let (metadata, header_size) = read_header(bytes)?;
    Ok(ContainerInfo {
        method: metadata.method(),
        shape: metadata.shape.clone(),
        original_bytes: metadata.original_bytes(),
        header_size,
        payload_size: bytes.len() - header_size,
        total_size: bytes.len(),
    })
}
