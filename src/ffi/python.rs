// In: src/ffi/python.rs

use ndarray::{ArrayViewD, IxDyn};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::bridge;
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::metadata::Metadata;
use crate::observability;
use crate::synthetic::{self, Pattern};

//==================================================================================
// I. Helpers
//==================================================================================

/// Views a flat interleaved byte buffer as `(rows, cols)` or `(rows, cols, channels)`.
fn shaped_view(data: &[u8], rows: usize, cols: usize, channels: usize) -> Result<ArrayViewD<'_, u8>, CodecError> {
    let shape: Vec<usize> = if channels <= 1 { vec![rows, cols] } else { vec![rows, cols, channels] };
    let expected: usize = shape.iter().product();
    if data.len() != expected {
        return Err(CodecError::UnsupportedShape(format!(
            "buffer holds {} bytes but shape {:?} needs {}",
            data.len(),
            shape,
            expected
        )));
    }
    Ok(ArrayViewD::from_shape(IxDyn(&shape), data)?)
}

//==================================================================================
// II. Stateless Image API
//==================================================================================

/// Encodes a raw 8-bit image.
///
/// Returns `(payload, metadata_json, stats_json)`.
#[pyfunction]
#[pyo3(name = "encode", signature = (data, rows, cols, channels = 1, method = "auto", config_json = None))]
pub fn encode_py<'py>(
    py: Python<'py>,
    data: &[u8],
    rows: usize,
    cols: usize,
    channels: usize,
    method: &str,
    config_json: Option<&str>,
) -> PyResult<(Bound<'py, PyBytes>, String, String)> {
    let config = CodecConfig::from_json_str(config_json.unwrap_or(""))?;
    let view = shaped_view(data, rows, cols, channels)?;

    let compressed = py.allow_threads(|| bridge::compress(view, method, &config))?;
    let metadata_json = compressed.metadata.to_json_string()?;
    let stats_json = serde_json::to_string(&compressed.stats).map_err(CodecError::from)?;

    Ok((PyBytes::new_bound(py, &compressed.payload), metadata_json, stats_json))
}

/// Decodes a payload using its metadata JSON. Returns `(pixels, shape)`.
#[pyfunction]
#[pyo3(name = "decode")]
pub fn decode_py<'py>(py: Python<'py>, payload: &[u8], metadata_json: &str) -> PyResult<(Bound<'py, PyBytes>, Vec<usize>)> {
    let metadata = Metadata::from_json_str(metadata_json)?;
    let decompressed = py.allow_threads(|| bridge::decompress(payload, &metadata))?;
    let shape = decompressed.image.shape().to_vec();
    let pixels: Vec<u8> = decompressed.image.iter().copied().collect();
    Ok((PyBytes::new_bound(py, &pixels), shape))
}

/// Encodes a raw 8-bit image straight into the binary container.
#[pyfunction]
#[pyo3(name = "encode_container", signature = (data, rows, cols, channels = 1, method = "auto", config_json = None))]
pub fn encode_container_py<'py>(
    py: Python<'py>,
    data: &[u8],
    rows: usize,
    cols: usize,
    channels: usize,
    method: &str,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyBytes>> {
    let config = CodecConfig::from_json_str(config_json.unwrap_or(""))?;
    let view = shaped_view(data, rows, cols, channels)?;
    let bytes = py.allow_threads(|| bridge::compress_to_container(view, method, &config))?;
    Ok(PyBytes::new_bound(py, &bytes))
}

/// Decodes a binary container. Returns `(pixels, shape)`.
#[pyfunction]
#[pyo3(name = "decode_container")]
pub fn decode_container_py<'py>(py: Python<'py>, container: &[u8]) -> PyResult<(Bound<'py, PyBytes>, Vec<usize>)> {
    let decompressed = py.allow_threads(|| bridge::decompress_container(container))?;
    let shape = decompressed.image.shape().to_vec();
    let pixels: Vec<u8> = decompressed.image.iter().copied().collect();
    Ok((PyBytes::new_bound(py, &pixels), shape))
}

/// Summarizes a container without decoding it, as a JSON string.
#[pyfunction]
#[pyo3(name = "analyze_container")]
pub fn analyze_container_py(container: &[u8]) -> PyResult<String> {
    let info = bridge::analyze_container(container)?;
    Ok(serde_json::to_string(&info).map_err(CodecError::from)?)
}

/// Builds a deterministic synthetic test image. Returns `(pixels, shape)`.
#[pyfunction]
#[pyo3(name = "test_image", signature = (rows, cols, pattern = "gradient", seed = 42))]
pub fn test_image_py<'py>(
    py: Python<'py>,
    rows: usize,
    cols: usize,
    pattern: &str,
    seed: u64,
) -> PyResult<(Bound<'py, PyBytes>, Vec<usize>)> {
    let image = synthetic::test_image(rows, cols, Pattern::from_name(pattern)?, seed);
    let pixels: Vec<u8> = image.iter().copied().collect();
    Ok((PyBytes::new_bound(py, &pixels), vec![rows, cols]))
}

//==================================================================================
// III. Logging
//==================================================================================

#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None, verbose = false))]
pub fn enable_verbose_logging_py(log_file: Option<String>, verbose: bool) -> PyResult<()> {
    observability::init_logging(verbose, log_file.as_deref())?;
    Ok(())
}
