//! Similarity matrix construction.
//!
//! Scores the `n(n-1)/2` upper-triangle frame pairs and mirrors them into
//! a full symmetric matrix. Pair scoring is independent work with no
//! shared mutable state, so large batches are dispatched across the rayon
//! thread pool; each pair produces one `(i, j, score)` cell and every cell
//! is written exactly once.

use rayon::prelude::*;

use crate::analysis::metrics::SimilarityMetric;
use crate::analysis::types::{AnalysisError, AnalysisResult, FrameSlot, SimilarityMatrix};

/// Tuning for the matrix builder.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Pair count below which parallel dispatch is not worth its overhead.
    pub parallel_threshold: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 100,
        }
    }
}

/// Counters from one matrix build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixStats {
    /// Upper-triangle pairs in total.
    pub total_pairs: usize,
    /// Pairs actually scored by the metric.
    pub scored_pairs: usize,
    /// Pairs that received the sentinel because a frame was unreadable.
    pub sentinel_pairs: usize,
}

/// A finished matrix plus its build counters.
#[derive(Debug, Clone)]
pub struct MatrixBuild {
    pub matrix: SimilarityMatrix,
    pub stats: MatrixStats,
}

/// Build the full symmetric similarity matrix for a set of frames.
///
/// The diagonal holds `metric.maximum()`. Pairs touching an unreadable
/// slot receive `metric.sentinel()` without invoking the metric, so a
/// decode failure degrades the ordering near that frame instead of
/// aborting the run.
pub fn build_similarity_matrix(
    frames: &[FrameSlot],
    metric: &dyn SimilarityMetric,
    config: &MatrixConfig,
) -> AnalysisResult<MatrixBuild> {
    let n = frames.len();
    if n == 0 {
        return Err(AnalysisError::NoFrames);
    }

    let mut matrix = SimilarityMatrix::filled(n, 0.0);
    for i in 0..n {
        matrix.set(i, i, metric.maximum());
    }

    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    let total_pairs = pairs.len();

    let score_pair = |&(i, j): &(usize, usize)| -> (usize, usize, f64, bool) {
        match (frames[i].frame(), frames[j].frame()) {
            (Some(a), Some(b)) => (i, j, metric.score(a, b), true),
            _ => (i, j, metric.sentinel(), false),
        }
    };

    let cells: Vec<(usize, usize, f64, bool)> = if total_pairs > config.parallel_threshold {
        tracing::debug!(
            pairs = total_pairs,
            metric = metric.name(),
            "scoring pairs on the rayon pool"
        );
        pairs.par_iter().map(score_pair).collect()
    } else {
        tracing::debug!(
            pairs = total_pairs,
            metric = metric.name(),
            "scoring pairs sequentially"
        );
        pairs.iter().map(score_pair).collect()
    };

    let mut scored_pairs = 0;
    for (i, j, score, scored) in cells {
        matrix.set(i, j, score);
        matrix.set(j, i, score);
        if scored {
            scored_pairs += 1;
        }
    }

    let stats = MatrixStats {
        total_pairs,
        scored_pairs,
        sentinel_pairs: total_pairs - scored_pairs,
    };

    tracing::debug!(
        n,
        scored = stats.scored_pairs,
        sentinel = stats.sentinel_pairs,
        "similarity matrix complete"
    );

    Ok(MatrixBuild { matrix, stats })
}
