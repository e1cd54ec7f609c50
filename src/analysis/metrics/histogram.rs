//! HSV colour histogram correlation metric.
//!
//! Compares the colour distributions of two frames in HSV space, which is
//! less sensitive to lighting changes than raw RGB. Scores are Pearson
//! correlations of L2-normalized joint histograms, in [-1, 1].

use crate::analysis::types::Frame;

use super::{matched_to, pearson, SimilarityMetric};

/// Buckets per channel of the joint histogram.
const BINS: usize = 8;

/// Hue is stored in half-degrees, [0, 180).
const HUE_RANGE: f32 = 180.0;

/// HSV histogram correlation.
pub struct Histogram;

impl Histogram {
    /// Create a new histogram metric.
    pub fn new() -> Self {
        Self
    }

    /// Build the L2-normalized joint 8x8x8 HSV histogram of a frame.
    fn normalized_histogram(frame: &Frame) -> Vec<f64> {
        let mut hist = vec![0.0f64; BINS * BINS * BINS];

        for px in frame.pixels().chunks_exact(Frame::CHANNELS) {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            let h_bin = ((h / HUE_RANGE * BINS as f32) as usize).min(BINS - 1);
            let s_bin = ((s / 256.0 * BINS as f32) as usize).min(BINS - 1);
            let v_bin = ((v / 256.0 * BINS as f32) as usize).min(BINS - 1);
            hist[(h_bin * BINS + s_bin) * BINS + v_bin] += 1.0;
        }

        let norm = hist.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut hist {
                *x /= norm;
            }
        }
        hist
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityMetric for Histogram {
    fn name(&self) -> &str {
        "histogram"
    }

    fn description(&self) -> &str {
        "Correlation of joint HSV colour histograms"
    }

    fn score(&self, a: &Frame, b: &Frame) -> f64 {
        let b = matched_to(a, b);
        let hist_a = Self::normalized_histogram(a);
        let hist_b = Self::normalized_histogram(&b);
        pearson(&hist_a, &hist_b)
    }

    fn maximum(&self) -> f64 {
        1.0
    }

    fn sentinel(&self) -> f64 {
        -1.0
    }
}

/// Convert an RGB8 pixel to HSV with H in [0, 180) and S, V in [0, 256).
///
/// Matches the conventional 8-bit HSV layout where hue is halved to fit
/// a byte.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta > 0.0 {
        let mut h = if (max - r).abs() < f32::EPSILON {
            60.0 * (g - b) / delta
        } else if (max - g).abs() < f32::EPSILON {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if h < 0.0 {
            h += 360.0;
        }
        h / 2.0
    } else {
        0.0
    };

    (h, s, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(rgb: [u8; 3]) -> Frame {
        let mut pixels = Vec::new();
        for _ in 0..64 {
            pixels.extend_from_slice(&rgb);
        }
        Frame::new(8, 8, pixels).unwrap()
    }

    #[test]
    fn identical_frames_correlate_fully() {
        let frame = solid_frame([200, 40, 90]);
        let metric = Histogram::new();
        let score = metric.score(&frame, &frame);
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn different_colours_score_low() {
        let red = solid_frame([255, 0, 0]);
        let blue = solid_frame([0, 0, 255]);
        let metric = Histogram::new();
        let score = metric.score(&red, &blue);
        assert!(score < 0.5, "got {score}");
    }

    #[test]
    fn differing_resolutions_are_resampled_not_rejected() {
        let a = solid_frame([10, 200, 30]);
        let mut pixels = Vec::new();
        for _ in 0..16 {
            pixels.extend_from_slice(&[10, 200, 30]);
        }
        let b = Frame::new(4, 4, pixels).unwrap();
        let metric = Histogram::new();
        let score = metric.score(&a, &b);
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn rgb_to_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert!(h.abs() < 1e-3);
        assert!((s - 255.0).abs() < 1e-3);
        assert!((v - 255.0).abs() < 1e-3);

        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 120.0).abs() < 1e-3);
    }
}
