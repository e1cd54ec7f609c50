//! Sequence reconstruction from a similarity matrix.
//!
//! A greedy nearest-unvisited-neighbour walk: from the current frame, pick
//! the unvisited frame with the highest similarity, repeat until every
//! frame is placed. This is the classic greedy heuristic for a shortest
//! Hamiltonian path; the exact ordering problem is TSP-equivalent, so the
//! O(n^2) heuristic is a deliberate trade-off, not a shortcut.

pub mod validate;

use thiserror::Error;

use crate::analysis::types::SimilarityMatrix;

/// Errors from the greedy walk.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// The matrix has zero rows; there is nothing to reconstruct.
    #[error("cannot reconstruct an empty frame set")]
    NoFrames,

    /// The requested start frame does not exist.
    #[error("start index {start} out of range for {len} frames")]
    StartOutOfRange { start: usize, len: usize },
}

/// Reconstruct the frame order by walking the similarity matrix.
///
/// Starting from `start`, repeatedly appends the unvisited frame with the
/// maximum similarity to the current frame. Ties break toward the lowest
/// index (the ascending scan keeps the first maximum), which makes the
/// walk fully deterministic. Exactly `n - 1` selection steps run; a single
/// frame comes back as `[start]` with no comparisons at all.
pub fn greedy_walk(
    matrix: &SimilarityMatrix,
    start: usize,
) -> Result<Vec<usize>, OrderingError> {
    let n = matrix.len();
    if n == 0 {
        return Err(OrderingError::NoFrames);
    }
    if start >= n {
        return Err(OrderingError::StartOutOfRange { start, len: n });
    }

    let mut visited = vec![false; n];
    let mut sequence = Vec::with_capacity(n);

    let mut current = start;
    visited[current] = true;
    sequence.push(current);

    tracing::debug!(start, frames = n, "starting greedy reconstruction");

    while sequence.len() < n {
        let row = matrix.row(current);

        // Linear argmax over unvisited entries; strict `>` preserves the
        // lowest-index winner on ties.
        let mut best: Option<(usize, f64)> = None;
        for (candidate, &score) in row.iter().enumerate() {
            if visited[candidate] {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }

        // The unvisited set is non-empty while the loop runs. Should that
        // ever not hold, the truncated sequence is caught by the validator.
        let Some((next, _)) = best else { break };
        visited[next] = true;
        sequence.push(next);
        current = next;
    }

    tracing::debug!(frames = n, "greedy reconstruction complete");

    Ok(sequence)
}
