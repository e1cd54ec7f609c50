//! Optical-flow-based similarity metric.
//!
//! Temporally adjacent frames exhibit physically continuous motion: small
//! displacements with a coherent direction. The metric runs the dense flow
//! estimator and scores low mean magnitude and low direction scatter.

use crate::analysis::flow::{circular_std, estimate_flow, FlowParams};
use crate::analysis::types::Frame;

use super::{matched_to, SimilarityMetric};

/// Magnitudes are normalized against a typical displacement of ~10 px.
const MAGNITUDE_SCALE: f64 = 10.0;

/// Direction scatter is normalized against 1 radian of circular std.
const COHERENCE_SCALE: f64 = 1.0;

/// Motion continuity score from dense optical flow.
pub struct OpticalFlowMetric {
    params: FlowParams,
    magnitude_weight: f64,
    coherence_weight: f64,
}

impl OpticalFlowMetric {
    /// Create a flow metric with the given term weights.
    pub fn new(magnitude_weight: f64, coherence_weight: f64) -> Self {
        Self {
            params: FlowParams::default(),
            magnitude_weight,
            coherence_weight,
        }
    }

    /// Override the flow estimator parameters.
    #[allow(dead_code)]
    pub fn with_params(mut self, params: FlowParams) -> Self {
        self.params = params;
        self
    }
}

impl Default for OpticalFlowMetric {
    fn default() -> Self {
        Self::new(0.7, 0.3)
    }
}

impl SimilarityMetric for OpticalFlowMetric {
    fn name(&self) -> &str {
        "opticalflow"
    }

    fn description(&self) -> &str {
        "Dense optical flow magnitude and direction coherence"
    }

    fn score(&self, a: &Frame, b: &Frame) -> f64 {
        let b = matched_to(a, b);

        let flow = estimate_flow(&a.to_luma_f32(), &b.to_luma_f32(), &self.params);
        let (_, angles) = flow.magnitude_angle();

        let magnitude_score = (-flow.mean_magnitude() / MAGNITUDE_SCALE).exp();
        let coherence_score = (-circular_std(&angles) / COHERENCE_SCALE).exp();

        self.magnitude_weight * magnitude_score + self.coherence_weight * coherence_score
    }

    fn maximum(&self) -> f64 {
        self.magnitude_weight + self.coherence_weight
    }

    fn sentinel(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Textured frame with a sinusoidal pattern offset by `phase` pixels.
    fn textured_frame(phase: f32) -> Frame {
        let mut pixels = Vec::new();
        for y in 0..48u32 {
            for x in 0..48u32 {
                let v = 128.0
                    + 60.0 * ((x as f32 + phase) * 0.22).sin()
                    + 50.0 * ((y as f32 + phase) * 0.18).cos();
                let v = v.clamp(0.0, 255.0) as u8;
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(48, 48, pixels).unwrap()
    }

    #[test]
    fn identical_frames_score_near_maximum() {
        let frame = textured_frame(0.0);
        let metric = OpticalFlowMetric::default();
        let score = metric.score(&frame, &frame);
        assert!(score > 0.9, "got {score}");
        assert!(score <= metric.maximum() + 1e-9);
    }

    #[test]
    fn large_motion_scores_lower_than_none() {
        let a = textured_frame(0.0);
        let near = textured_frame(0.0);
        let far = textured_frame(6.0);
        let metric = OpticalFlowMetric::default();
        assert!(metric.score(&a, &near) > metric.score(&a, &far));
    }

    #[test]
    fn default_weights_sum_to_one() {
        let metric = OpticalFlowMetric::default();
        assert!((metric.maximum() - 1.0).abs() < 1e-12);
    }
}
