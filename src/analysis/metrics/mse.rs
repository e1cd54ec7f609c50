//! Negative mean-squared-error metric.
//!
//! Per-pixel squared difference averaged over all pixels and channels,
//! negated so that higher still means "more similar". Identical frames
//! score 0.0; the score is unbounded below.

use crate::analysis::types::Frame;

use super::{matched_to, SimilarityMetric};

/// Negative MSE over raw RGB values.
pub struct Mse;

impl Mse {
    /// Create a new negative-MSE metric.
    pub fn new() -> Self {
        Self
    }
}

impl Default for Mse {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityMetric for Mse {
    fn name(&self) -> &str {
        "mse"
    }

    fn description(&self) -> &str {
        "Negative mean squared per-pixel error"
    }

    fn score(&self, a: &Frame, b: &Frame) -> f64 {
        let b = matched_to(a, b);

        let sum: f64 = a
            .pixels()
            .iter()
            .zip(b.pixels().iter())
            .map(|(&x, &y)| {
                let d = x as f64 - y as f64;
                d * d
            })
            .sum();

        -(sum / a.pixels().len() as f64)
    }

    fn maximum(&self) -> f64 {
        0.0
    }

    fn sentinel(&self) -> f64 {
        f64::MIN
    }
}
