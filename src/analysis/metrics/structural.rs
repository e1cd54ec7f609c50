//! Structural (edge map) correlation metric.
//!
//! Compares the scene structure of two frames by correlating their Canny
//! edge maps. Useful where colour distributions are too uniform to
//! discriminate but object outlines still move frame to frame.

use imageproc::edges::canny;

use crate::analysis::types::Frame;

use super::{matched_to, pearson, SimilarityMetric};

/// Canny hysteresis thresholds, fixed for every comparison.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Correlation of binary edge maps.
pub struct Structural;

impl Structural {
    /// Create a new structural metric.
    pub fn new() -> Self {
        Self
    }

    /// Binary edge indicator vector of a frame.
    fn edge_vector(frame: &Frame) -> Vec<f64> {
        let edges = canny(&frame.to_luma8(), CANNY_LOW, CANNY_HIGH);
        edges
            .as_raw()
            .iter()
            .map(|&p| if p > 0 { 1.0 } else { 0.0 })
            .collect()
    }
}

impl Default for Structural {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityMetric for Structural {
    fn name(&self) -> &str {
        "structural"
    }

    fn description(&self) -> &str {
        "Correlation of Canny edge maps"
    }

    fn score(&self, a: &Frame, b: &Frame) -> f64 {
        let b = matched_to(a, b);
        let edges_a = Self::edge_vector(a);
        let edges_b = Self::edge_vector(&b);

        // A uniformly empty edge map makes the correlation degenerate;
        // defined as 0.0 rather than NaN.
        if edges_a.iter().sum::<f64>() == 0.0 || edges_b.iter().sum::<f64>() == 0.0 {
            return 0.0;
        }

        pearson(&edges_a, &edges_b)
    }

    fn maximum(&self) -> f64 {
        1.0
    }

    fn sentinel(&self) -> f64 {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(rgb: [u8; 3]) -> Frame {
        let mut pixels = Vec::new();
        for _ in 0..(32 * 32) {
            pixels.extend_from_slice(&rgb);
        }
        Frame::new(32, 32, pixels).unwrap()
    }

    /// Frame split into a dark left half and bright right half, producing
    /// one strong vertical edge.
    fn split_frame(split_col: u32) -> Frame {
        let mut pixels = Vec::new();
        for _y in 0..32 {
            for x in 0..32 {
                let v = if x < split_col { 10 } else { 240 };
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(32, 32, pixels).unwrap()
    }

    #[test]
    fn blank_frames_score_zero() {
        let a = solid_frame([100, 100, 100]);
        let b = solid_frame([100, 100, 100]);
        let metric = Structural::new();
        assert_eq!(metric.score(&a, &b), 0.0);
    }

    #[test]
    fn matching_edges_correlate_positively() {
        let a = split_frame(16);
        let b = split_frame(16);
        let metric = Structural::new();
        let score = metric.score(&a, &b);
        assert!(score > 0.9, "got {score}");
    }

    #[test]
    fn displaced_edges_correlate_less() {
        let a = split_frame(8);
        let b = split_frame(24);
        let same = Structural::new().score(&a, &a);
        let moved = Structural::new().score(&a, &b);
        assert!(moved < same, "moved {moved} vs same {same}");
    }
}
