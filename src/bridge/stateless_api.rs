// In: src/bridge/stateless_api.rs

use ndarray::{ArrayD, ArrayViewD};
use serde::Serialize;
use std::time::Instant;

use crate::bridge::format::{self, ContainerInfo};
use crate::codecs::{CodecStats, Encoded, ImageCodec};
use crate::config::CodecConfig;
use crate::error::Result;
use crate::image::{self, NormalizedImage};
use crate::metadata::Metadata;
use crate::metrics::{self, QualityReport};
use crate::registry::{Method, Registry};
use crate::selector;
use crate::types::Pixel;

/// The method key that routes `compress` through the heuristic selector.
pub const AUTO_METHOD: &str = "auto";

/// The result of a compression call: payload, metadata and diagnostics.
pub type Compressed = Encoded;

/// A decoded image with its original channel layout restored.
#[derive(Debug, Clone, PartialEq)]
pub struct Decompressed {
    pub image: ArrayD<u8>,
    pub stats: CodecStats,
}

//==================================================================================
// 1. Compression
//==================================================================================

/// Normalizes `image` and encodes it with the codec registered under `method`.
/// The key `"auto"` defers to `compress_auto`.
pub fn compress<T: Pixel>(image: ArrayViewD<'_, T>, method: &str, config: &CodecConfig) -> Result<Compressed> {
    if method == AUTO_METHOD {
        return compress_auto(image, config);
    }
    // Reject an unknown key before doing any work.
    let codec = Registry::standard().encoder(method, config)?;
    let normalized = image::normalize(image)?;
    encode_normalized(&codec, &normalized)
}

/// Picks a method from the image statistics, then encodes with it.
pub fn compress_auto<T: Pixel>(image: ArrayViewD<'_, T>, config: &CodecConfig) -> Result<Compressed> {
    let normalized = image::normalize(image)?;
    let method = selector::auto_select(&normalized, &config.selection);
    let codec = Registry::standard().codec(method, config);
    encode_normalized(&codec, &normalized)
}

/// Compresses and serializes into the binary container in one step.
pub fn compress_to_container<T: Pixel>(image: ArrayViewD<'_, T>, method: &str, config: &CodecConfig) -> Result<Vec<u8>> {
    let compressed = compress(image, method, config)?;
    format::write_container(&compressed.metadata, &compressed.payload)
}

fn encode_normalized(codec: &impl ImageCodec, normalized: &NormalizedImage) -> Result<Compressed> {
    let encoded = codec.encode(normalized)?;
    log::debug!(
        "{}: {} pixels -> {} bytes (ratio {:.2})",
        encoded.stats.method,
        encoded.stats.original_pixels,
        encoded.stats.compressed_bytes,
        encoded.stats.compression_ratio
    );
    Ok(encoded)
}

//==================================================================================
// 2. Decompression
//==================================================================================

/// Decodes a payload with the codec named in `metadata` and restores the
/// recorded channel layout.
pub fn decompress(payload: &[u8], metadata: &Metadata) -> Result<Decompressed> {
    let codec = Registry::standard().decoder(metadata.method().key())?;
    let decoded = codec.decode(payload, metadata)?;
    Ok(Decompressed {
        image: image::restore_layout(decoded.grid, metadata),
        stats: decoded.stats,
    })
}

/// Parses a container and decodes its payload.
pub fn decompress_container(bytes: &[u8]) -> Result<Decompressed> {
    let container = format::read_container(bytes)?;
    decompress(&container.payload, &container.metadata)
}

/// Reads a container's header without decoding the payload.
pub fn analyze_container(bytes: &[u8]) -> Result<ContainerInfo> {
    format::peek_info(bytes)
}

//==================================================================================
// 3. Analysis & Benchmarking
//==================================================================================

/// Every metric for an original/reconstruction pair of the same shape.
pub fn analyze(
    original: ArrayViewD<'_, u8>,
    reconstructed: ArrayViewD<'_, u8>,
    original_size: usize,
    compressed_size: usize,
) -> QualityReport {
    metrics::analyze_quality(original, reconstructed, original_size, compressed_size)
}

/// One row of a `benchmark` run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub method: Method,
    pub original_bytes: usize,
    pub compressed_bytes: usize,
    pub compression_ratio: f64,
    pub entropy: f64,
    pub psnr: f64,
    pub ssim: f64,
    pub encode_ms: f64,
    pub decode_ms: f64,
}

/// Round-trips `image` through each method and scores the reconstruction
/// against the normalized grid. A failing method is logged and left out.
pub fn benchmark<T: Pixel>(image: ArrayViewD<'_, T>, methods: &[Method], config: &CodecConfig) -> Result<Vec<BenchmarkResult>> {
    let normalized = image::normalize(image)?;
    let registry = Registry::standard();
    let original = normalized.grid();
    let entropy = metrics::entropy(original.iter());

    log::info!(
        "--- benchmarking {} method(s) on a {}x{} image (entropy {:.3}) ---",
        methods.len(),
        normalized.rows(),
        normalized.cols(),
        entropy
    );

    let mut results = Vec::with_capacity(methods.len());
    for &method in methods {
        let codec = registry.codec(method, config);

        let start = Instant::now();
        let encoded = match codec.encode(&normalized) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::info!("  - Method: {:<14} | FAILED ({})", method.key(), e);
                continue;
            }
        };
        let encode_time = start.elapsed();

        let start = Instant::now();
        let decoded = codec.decode(&encoded.payload, &encoded.metadata)?;
        let decode_time = start.elapsed();

        let result = BenchmarkResult {
            method,
            original_bytes: normalized.pixel_count(),
            compressed_bytes: encoded.payload.len(),
            compression_ratio: encoded.stats.compression_ratio,
            entropy,
            psnr: metrics::psnr(original.view(), decoded.grid.view(), 255.0),
            ssim: metrics::ssim(original.view(), decoded.grid.view(), 11),
            encode_ms: encode_time.as_secs_f64() * 1000.0,
            decode_ms: decode_time.as_secs_f64() * 1000.0,
        };
        log::info!(
            "  - Method: {:<14} | Size: {:>8} | Ratio: {:>7.2} | PSNR: {:>6.2} | Time: {:.2?}",
            method.key(),
            result.compressed_bytes,
            result.compression_ratio,
            result.psnr,
            encode_time + decode_time
        );
        results.push(result);
    }
    Ok(results)
}
