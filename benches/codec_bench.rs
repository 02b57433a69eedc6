// In infocodec-core/benches/codec_bench.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use infocodec::codecs::ImageCodec;
use infocodec::config::CodecConfig;
use infocodec::image::NormalizedImage;
use infocodec::registry::{Method, Registry};
use infocodec::synthetic::{test_image, Pattern};

// --- Benchmark Suite ---

const BENCH_EDGE: usize = 256;

fn bench_codecs(c: &mut Criterion) {
    let config = CodecConfig::default();
    let registry = Registry::standard();

    for pattern in [Pattern::Gradient, Pattern::Noise] {
        let image = NormalizedImage::from_grid(test_image(BENCH_EDGE, BENCH_EDGE, pattern, 42));

        let mut group = c.benchmark_group(format!("Codecs ({:?} {}x{})", pattern, BENCH_EDGE, BENCH_EDGE));
        group.throughput(criterion::Throughput::Bytes((BENCH_EDGE * BENCH_EDGE) as u64));

        for method in Method::ALL {
            let codec = registry.codec(method, &config);
            // Encode once up front so decoding is measured on its own.
            let encoded = codec.encode(&image).unwrap();

            group.bench_function(format!("Encode {}", method), |b| {
                b.iter(|| black_box(codec.encode(black_box(&image))))
            });
            group.bench_function(format!("Decode {}", method), |b| {
                b.iter(|| black_box(codec.decode(black_box(&encoded.payload), black_box(&encoded.metadata))))
            });
        }
        group.finish();
    }
}

fn bench_lossy_parameters(c: &mut Criterion) {
    let registry = Registry::standard();
    let image = NormalizedImage::from_grid(test_image(BENCH_EDGE, BENCH_EDGE, Pattern::Gradient, 42));

    let mut group = c.benchmark_group("Lossy Parameter Sweep");
    group.throughput(criterion::Throughput::Bytes((BENCH_EDGE * BENCH_EDGE) as u64));

    for block_size in [4, 8, 16] {
        let codec = registry.codec(Method::Dct, &CodecConfig::default().with_block_size(block_size));
        group.bench_function(format!("Encode dct (block {})", block_size), |b| {
            b.iter(|| black_box(codec.encode(black_box(&image))))
        });
    }
    for rate in [2, 4, 8] {
        let codec = registry.codec(Method::Sparse, &CodecConfig::default().with_sampling_rate(rate));
        let encoded = codec.encode(&image).unwrap();
        group.bench_function(format!("Decode sparse (rate {})", rate), |b| {
            b.iter(|| black_box(codec.decode(black_box(&encoded.payload), black_box(&encoded.metadata))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codecs, bench_lossy_parameters);
criterion_main!(benches);
