// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the infocodec library. It hides the
// normalizer, the registry and the individual codecs behind a handful of
// stateless functions, and owns the binary container used to move an encoded
// image between processes.
//
// Data Flow (Compression):
//
//   1. [Stateless API (compress)]       -> Receives `ArrayViewD<T>` + method key + `CodecConfig`
//         |
//         `-> a. Resolves the key in the `Registry` ("auto" asks the `selector`)
//         |
//         `-> b. Calls `image::normalize` to build the 8-bit symbol grid
//
//   2. [Codec (ImageCodec::encode)]     -> Returns `Encoded { payload, metadata, stats }`
//
//   3. [Container (format::write_container)] -> `[u32 BE len][metadata JSON][payload]`
//
//
// Data Flow (Decompression):
//
//   1. [Container (format::read_container)] -> Receives `&[u8]`
//         |
//         `-> Structural damage is a hard `ContainerFormat` error
//
//   2. [Codec (ImageCodec::decode)]     -> Chosen by `metadata.method`; payload damage degrades
//
//   3. [Stateless API (decompress)]     -> `image::restore_layout` replays the channel layout
//
// ====================================================================================
pub mod format;
pub mod stateless_api;

// --- Low-Level Stateless API (for FFI and testing) ---
pub use stateless_api::{
    analyze, analyze_container, benchmark, compress, compress_auto, compress_to_container, decompress,
    decompress_container, BenchmarkResult, Compressed, Decompressed,
};

// --- Format Constants and Structs ---
pub use format::{peek_info, read_container, write_container, Container, ContainerInfo, MIN_CONTAINER_SIZE};
