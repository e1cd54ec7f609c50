//! High-level reconstruction pipeline.
//!
//! Wires the stages together: score all frame pairs into the similarity
//! matrix, walk it greedily, and validate the result. Collaborators
//! (video writer, heatmap renderer) consume the returned matrix and
//! sequence; this module never touches containers or plotting.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::matrix::{build_similarity_matrix, MatrixConfig};
use crate::analysis::metrics::create_metric;
use crate::analysis::types::{AnalysisResult, FrameSlot, SimilarityMatrix};
use crate::config::Settings;
use crate::ordering::{greedy_walk, validate::validate_sequence};

/// Output of one reconstruction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconstruction {
    /// Recovered frame order: a permutation of `[0, n)`.
    pub sequence: Vec<usize>,
    /// The pairwise similarity matrix the order was derived from.
    pub matrix: SimilarityMatrix,
    /// Name of the metric used.
    pub metric: String,
    /// How many frame pairs were actually scored.
    pub comparisons: usize,
}

/// Run the full reconstruction pipeline over a set of frames.
///
/// Fails on an empty frame set or an out-of-range start index. Unreadable
/// frames degrade their matrix rows to the sentinel but never abort the
/// run. A validator failure is surfaced as an invariant violation; it
/// cannot happen with a correct greedy walk and exists as a diagnostic
/// guard.
pub fn reconstruct(frames: &[FrameSlot], settings: &Settings) -> AnalysisResult<Reconstruction> {
    let metric = create_metric(settings.analysis.metric, &settings.analysis.weights());
    let matrix_config = MatrixConfig {
        parallel_threshold: settings.analysis.parallel_threshold,
    };

    tracing::info!(
        frames = frames.len(),
        metric = metric.name(),
        "starting reconstruction"
    );

    let matrix_start = Instant::now();
    let build = build_similarity_matrix(frames, metric.as_ref(), &matrix_config)?;
    tracing::info!(
        pairs = build.stats.total_pairs,
        sentinel = build.stats.sentinel_pairs,
        elapsed_ms = matrix_start.elapsed().as_millis() as u64,
        "similarity matrix built"
    );

    let walk_start = Instant::now();
    let sequence = greedy_walk(&build.matrix, settings.ordering.start_index)?;
    tracing::info!(
        elapsed_ms = walk_start.elapsed().as_millis() as u64,
        "sequence reconstructed"
    );

    validate_sequence(&sequence, frames.len())?;

    Ok(Reconstruction {
        sequence,
        matrix: build.matrix,
        metric: metric.name().to_string(),
        comparisons: build.stats.scored_pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{AnalysisError, Frame};
    use crate::models::MetricKind;
    use crate::ordering::validate::is_permutation;

    fn solid_slot(rgb: [u8; 3]) -> FrameSlot {
        let mut pixels = Vec::new();
        for _ in 0..64 {
            pixels.extend_from_slice(&rgb);
        }
        FrameSlot::Ready(Frame::new(8, 8, pixels).unwrap())
    }

    fn mse_settings() -> Settings {
        let mut settings = Settings::default();
        settings.analysis.metric = MetricKind::Mse;
        settings
    }

    #[test]
    fn empty_input_is_fatal() {
        let result = reconstruct(&[], &Settings::default());
        assert!(matches!(result, Err(AnalysisError::NoFrames)));
    }

    #[test]
    fn single_frame_reconstructs_without_comparisons() {
        let frames = vec![solid_slot([50, 50, 50])];
        let result = reconstruct(&frames, &mse_settings()).unwrap();
        assert_eq!(result.sequence, vec![0]);
        assert_eq!(result.comparisons, 0);
    }

    #[test]
    fn brightness_ramp_is_recovered_in_order() {
        // Shuffled brightness ramp: temporal neighbours differ least
        // under MSE, so the walk from the darkest frame recovers the ramp.
        let frames = vec![
            solid_slot([0, 0, 0]),
            solid_slot([120, 120, 120]),
            solid_slot([60, 60, 60]),
            solid_slot([180, 180, 180]),
        ];
        let result = reconstruct(&frames, &mse_settings()).unwrap();
        assert_eq!(result.sequence, vec![0, 2, 1, 3]);
    }

    #[test]
    fn unreadable_frame_still_yields_full_permutation() {
        let frames = vec![
            solid_slot([10, 10, 10]),
            solid_slot([40, 40, 40]),
            FrameSlot::Unreadable,
            solid_slot([90, 90, 90]),
            solid_slot([130, 130, 130]),
        ];
        let result = reconstruct(&frames, &mse_settings()).unwrap();
        assert_eq!(result.sequence.len(), 5);
        assert!(is_permutation(&result.sequence, 5));
        // The unreadable frame carries sentinel scores everywhere, so the
        // walk defers it to the end.
        assert_eq!(*result.sequence.last().unwrap(), 2);
    }

    #[test]
    fn every_frame_count_yields_a_permutation() {
        for n in 1..=6u8 {
            let frames: Vec<FrameSlot> = (0..n)
                .map(|i| solid_slot([i * 37, i.wrapping_mul(91), 255 - i * 23]))
                .collect();
            let result = reconstruct(&frames, &mse_settings()).unwrap();
            assert!(
                is_permutation(&result.sequence, n as usize),
                "n = {n}: {:?}",
                result.sequence
            );
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let frames = vec![
            solid_slot([5, 80, 30]),
            solid_slot([200, 10, 90]),
            solid_slot([100, 100, 100]),
            solid_slot([30, 60, 220]),
        ];
        let settings = mse_settings();
        let first = reconstruct(&frames, &settings).unwrap();
        for _ in 0..5 {
            let again = reconstruct(&frames, &settings).unwrap();
            assert_eq!(again.sequence, first.sequence);
        }
    }

    #[test]
    fn out_of_range_start_surfaces_as_ordering_error() {
        let frames = vec![solid_slot([1, 2, 3]), solid_slot([4, 5, 6])];
        let mut settings = mse_settings();
        settings.ordering.start_index = 7;
        assert!(matches!(
            reconstruct(&frames, &settings),
            Err(AnalysisError::Ordering(_))
        ));
    }
}
