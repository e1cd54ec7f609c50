//! Core enums used throughout the crate.

use serde::{Deserialize, Serialize};

/// Similarity metric used for pairwise frame comparison.
///
/// The metric is fixed for the duration of one reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// HSV colour histogram correlation.
    Histogram,
    /// Negative mean squared error over raw pixels.
    Mse,
    /// Correlation of Canny edge maps.
    Structural,
    /// Dense optical flow magnitude/coherence score.
    OpticalFlow,
    /// Weighted blend of histogram and structural scores.
    #[default]
    Combined,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Histogram => write!(f, "histogram"),
            MetricKind::Mse => write!(f, "mse"),
            MetricKind::Structural => write!(f, "structural"),
            MetricKind::OpticalFlow => write!(f, "opticalflow"),
            MetricKind::Combined => write!(f, "combined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_kind_defaults_to_combined() {
        assert_eq!(MetricKind::default(), MetricKind::Combined);
    }

    #[test]
    fn metric_kind_serde_roundtrip() {
        let json = serde_json::to_string(&MetricKind::OpticalFlow).unwrap();
        assert_eq!(json, "\"opticalflow\"");
        let back: MetricKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MetricKind::OpticalFlow);
    }
}
