//! Weighted blend of the histogram and structural metrics.
//!
//! The default metric: the colour distribution is the more reliable
//! adjacency signal for video, with edge structure as a corrective term.

use crate::analysis::types::Frame;

use super::{Histogram, SimilarityMetric, Structural};

/// Blended histogram + structural score.
pub struct Combined {
    histogram: Histogram,
    structural: Structural,
    histogram_weight: f64,
    structural_weight: f64,
}

impl Combined {
    /// Create a combined metric with the given weights.
    pub fn new(histogram_weight: f64, structural_weight: f64) -> Self {
        Self {
            histogram: Histogram::new(),
            structural: Structural::new(),
            histogram_weight,
            structural_weight,
        }
    }
}

impl Default for Combined {
    fn default() -> Self {
        Self::new(0.7, 0.3)
    }
}

impl SimilarityMetric for Combined {
    fn name(&self) -> &str {
        "combined"
    }

    fn description(&self) -> &str {
        "Weighted blend of histogram and structural correlation"
    }

    fn score(&self, a: &Frame, b: &Frame) -> f64 {
        self.histogram_weight * self.histogram.score(a, b)
            + self.structural_weight * self.structural.score(a, b)
    }

    fn maximum(&self) -> f64 {
        self.histogram_weight * self.histogram.maximum()
            + self.structural_weight * self.structural.maximum()
    }

    fn sentinel(&self) -> f64 {
        -1.0
    }
}
