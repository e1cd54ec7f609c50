//! Similarity metrics for frame adjacency analysis.
//!
//! This module defines the `SimilarityMetric` trait and implementations
//! for the different scoring algorithms. Each metric can be used
//! independently or blended by the combined metric.

mod combined;
mod histogram;
mod mse;
mod optical_flow;
mod structural;

pub use combined::Combined;
pub use histogram::Histogram;
pub use mse::Mse;
pub use optical_flow::OpticalFlowMetric;
pub use structural::Structural;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::analysis::types::Frame;
use crate::models::MetricKind;

/// Trait for pairwise frame similarity metrics.
///
/// Implementations return a single score where larger means "more likely
/// temporally adjacent". Score ranges differ per metric; the diagonal and
/// sentinel contracts are exposed through [`maximum`](Self::maximum) and
/// [`sentinel`](Self::sentinel).
pub trait SimilarityMetric: Send + Sync {
    /// Name of this metric.
    fn name(&self) -> &str;

    /// Short description of the metric.
    fn description(&self) -> &str;

    /// Score two frames. Higher = more similar.
    ///
    /// Frames of differing resolution are handled by resampling `b` to
    /// `a`'s dimensions before scoring; that is a policy of every metric,
    /// not an error.
    fn score(&self, a: &Frame, b: &Frame) -> f64;

    /// The score of a frame against itself, used for the matrix diagonal.
    fn maximum(&self) -> f64;

    /// Reserved minimum substituted when a frame is unreadable.
    ///
    /// Documented as part of the matrix value-range contract: rows and
    /// columns of unreadable frames hold exactly this value.
    fn sentinel(&self) -> f64;
}

/// Weights for the blended metrics.
///
/// The histogram/structural pair and the flow magnitude/coherence pair are
/// deliberately independent knobs rather than one shared weighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricWeights {
    /// Weight of the histogram score in the combined metric.
    pub histogram: f64,
    /// Weight of the structural score in the combined metric.
    pub structural: f64,
    /// Weight of the magnitude term in the optical flow metric.
    pub flow_magnitude: f64,
    /// Weight of the direction-coherence term in the optical flow metric.
    pub flow_coherence: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            histogram: 0.7,
            structural: 0.3,
            flow_magnitude: 0.7,
            flow_coherence: 0.3,
        }
    }
}

/// Create a metric instance for the given kind.
pub fn create_metric(kind: MetricKind, weights: &MetricWeights) -> Box<dyn SimilarityMetric> {
    match kind {
        MetricKind::Histogram => Box::new(Histogram::new()),
        MetricKind::Mse => Box::new(Mse::new()),
        MetricKind::Structural => Box::new(Structural::new()),
        MetricKind::OpticalFlow => {
            Box::new(OpticalFlowMetric::new(weights.flow_magnitude, weights.flow_coherence))
        }
        MetricKind::Combined => {
            Box::new(Combined::new(weights.histogram, weights.structural))
        }
    }
}

/// Factory for creating metrics by name.
pub fn create_metric_by_name(
    name: &str,
    weights: &MetricWeights,
) -> Option<Box<dyn SimilarityMetric>> {
    let kind = match name.to_lowercase().as_str() {
        "histogram" | "hist" => MetricKind::Histogram,
        "mse" | "negative-mse" => MetricKind::Mse,
        "structural" | "edges" => MetricKind::Structural,
        "opticalflow" | "optical-flow" | "flow" => MetricKind::OpticalFlow,
        "combined" => MetricKind::Combined,
        _ => return None,
    };
    Some(create_metric(kind, weights))
}

/// Get a list of available metric names.
pub fn available_metrics() -> Vec<&'static str> {
    vec!["histogram", "mse", "structural", "opticalflow", "combined"]
}

/// Resample `b` to `a`'s dimensions when they differ.
pub(crate) fn matched_to<'b>(a: &Frame, b: &'b Frame) -> Cow<'b, Frame> {
    if a.same_size(b) {
        Cow::Borrowed(b)
    } else {
        Cow::Owned(b.resampled_to(a.width(), a.height()))
    }
}

/// Pearson correlation coefficient of two equal-length vectors.
///
/// Returns 0.0 for the degenerate case where either vector has zero
/// variance (the correlation is undefined there).
pub(crate) fn pearson(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    if n == 0 {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        cov / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_creates_all_kinds() {
        let weights = MetricWeights::default();
        for name in available_metrics() {
            let metric = create_metric_by_name(name, &weights);
            assert!(metric.is_some(), "no metric for {name}");
        }
    }

    #[test]
    fn factory_creates_aliases() {
        let weights = MetricWeights::default();
        assert!(create_metric_by_name("hist", &weights).is_some());
        assert!(create_metric_by_name("flow", &weights).is_some());
        assert!(create_metric_by_name("edges", &weights).is_some());
    }

    #[test]
    fn factory_returns_none_for_unknown() {
        assert!(create_metric_by_name("unknown", &MetricWeights::default()).is_none());
    }

    #[test]
    fn pearson_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_of_opposed_vectors_is_minus_one() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![3.0, 2.0, 1.0];
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_of_constant_vector_is_zero() {
        let a = vec![1.0, 1.0, 1.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(pearson(&a, &b), 0.0);
    }
}
