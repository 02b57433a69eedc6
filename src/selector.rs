//! Method selection.
//!
//! Two strategies are offered:
//! 1. `auto_select`: a cheap heuristic over the symbol distribution
//!    (cardinality, entropy, spread), driven by `SelectionThresholds`.
//! 2. `select_by_trial`: empirically encodes every candidate and keeps the
//!    smallest payload. Slower, but never worse on the image at hand.

use std::time::Instant;

use crate::codecs::ImageCodec;
use crate::config::{CodecConfig, SelectionThresholds};
use crate::error::Result;
use crate::image::NormalizedImage;
use crate::metrics;
use crate::registry::{Method, Registry};

//==================================================================================
// 1. Heuristic Selection
//==================================================================================

/// Picks a method from the symbol statistics alone.
///
/// Few distinct symbols favour run-length coding; low entropy or a narrow
/// spread favour differential coding; everything else goes to Huffman.
pub fn auto_select(image: &NormalizedImage, thresholds: &SelectionThresholds) -> Method {
    let stats = metrics::distribution_stats(image.grid().iter());

    let method = if stats.unique_values < thresholds.rle_max_unique {
        Method::Rle
    } else if stats.entropy < thresholds.low_entropy || stats.std < thresholds.low_std {
        Method::Differential
    } else {
        Method::Huffman
    };

    log::info!(
        "auto-select: {} unique, entropy {:.3}, std {:.2} -> {}",
        stats.unique_values,
        stats.entropy,
        stats.std,
        method
    );
    method
}

//==================================================================================
// 2. Empirical Selection
//==================================================================================

/// The winner of `select_by_trial`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub method: Method,
    pub payload_bytes: usize,
}

/// Encodes `image` with every candidate and returns the smallest payload.
/// Ties go to the earlier candidate. Failed trials are logged and skipped;
/// if none succeed (or `candidates` is empty) the naive baseline is returned.
pub fn select_by_trial(
    image: &NormalizedImage,
    candidates: &[Method],
    config: &CodecConfig,
) -> Result<TrialOutcome> {
    let start_overall = Instant::now();
    let registry = Registry::standard();

    log::info!(
        "--- select_by_trial scoring {} candidate(s) on a {}x{} image ---",
        candidates.len(),
        image.rows(),
        image.cols()
    );

    let mut best: Option<TrialOutcome> = None;
    for &method in candidates {
        let start_candidate = Instant::now();
        match registry.codec(method, config).encode(image) {
            Ok(encoded) => {
                let size = encoded.payload.len();
                log::info!(
                    "  - Candidate: {:<14} | Score (Size): {} | Time: {:.2?}",
                    method.key(),
                    size,
                    start_candidate.elapsed()
                );
                if best.as_ref().map_or(true, |b| size < b.payload_bytes) {
                    best = Some(TrialOutcome { method, payload_bytes: size });
                }
            }
            Err(e) => {
                log::info!("  - Candidate: {:<14} | Score (Size): FAILED ({})", method.key(), e);
            }
        }
    }

    let outcome = match best {
        Some(outcome) => outcome,
        None => TrialOutcome {
            method: Method::Naive,
            payload_bytes: image.pixel_count(),
        },
    };
    log::info!(
        "--- trial winner: {} ({} bytes) in {:.2?} ---",
        outcome.method,
        outcome.payload_bytes,
        start_overall.elapsed()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{test_image, Pattern};
    use ndarray::Array2;

    fn image(pattern: Pattern) -> NormalizedImage {
        NormalizedImage::from_grid(test_image(64, 64, pattern, 21))
    }

    #[test]
    fn test_heuristic_routes() {
        let thresholds = SelectionThresholds::default();
        assert_eq!(auto_select(&image(Pattern::Checkerboard), &thresholds), Method::Rle);
        assert_eq!(auto_select(&image(Pattern::Noise), &thresholds), Method::Huffman);
        // 64 distinct values in a narrow ramp.
        let narrow = NormalizedImage::from_grid(Array2::from_shape_fn((64, 64), |(i, j)| (100 + (i + j) / 2) as u8));
        assert_eq!(auto_select(&narrow, &thresholds), Method::Differential);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let thresholds = SelectionThresholds {
            rle_max_unique: 0,
            low_entropy: 0.0,
            low_std: 0.0,
        };
        assert_eq!(auto_select(&image(Pattern::Checkerboard), &thresholds), Method::Huffman);
    }

    #[test]
    fn test_trial_picks_smallest_payload() {
        let config = CodecConfig::default();
        let outcome = select_by_trial(&image(Pattern::Blocks), &[Method::Naive, Method::Rle], &config).unwrap();
        assert_eq!(outcome.method, Method::Rle);

        let outcome = select_by_trial(&image(Pattern::Noise), &[Method::Naive, Method::Rle], &config).unwrap();
        assert_eq!(outcome, TrialOutcome { method: Method::Naive, payload_bytes: 4096 });
    }

    #[test]
    fn test_trial_without_candidates_is_naive() {
        let outcome = select_by_trial(&image(Pattern::Gradient), &[], &CodecConfig::default()).unwrap();
        assert_eq!(outcome.method, Method::Naive);
    }
}
