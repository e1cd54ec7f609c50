//! Core types for frame similarity analysis.

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::ordering::validate::ValidationError;

/// Grayscale plane with `f32` samples, used by the optical flow estimator.
pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A decoded video frame: row-major interleaved RGB8 pixels.
///
/// Frames are immutable once constructed. Ownership stays with the caller
/// (the frame store); the analysis engine only ever borrows them.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Number of interleaved channels per pixel.
    pub const CHANNELS: usize = 3;

    /// Create a frame from raw RGB8 data.
    ///
    /// Rejects zero-sized dimensions and buffers whose length does not
    /// match `width * height * 3`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> AnalysisResult<Self> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::BadFrameBuffer {
                width,
                height,
                len: pixels.len(),
            });
        }
        let expected = width as usize * height as usize * Self::CHANNELS;
        if pixels.len() != expected {
            return Err(AnalysisError::BadFrameBuffer {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Wrap an `image` crate RGB buffer without copying.
    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw interleaved RGB8 pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Total pixel count.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether two frames have identical dimensions.
    pub fn same_size(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// View as an `image` crate RGB buffer (copies the pixel data).
    pub fn to_rgb_image(&self) -> RgbImage {
        // Length was validated at construction, so this cannot fail.
        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Bilinearly resample to the given dimensions.
    pub fn resampled_to(&self, width: u32, height: u32) -> Frame {
        let resized = image::imageops::resize(
            &self.to_rgb_image(),
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        Frame::from_rgb_image(resized)
    }

    /// Convert to an 8-bit grayscale image using BT.601 luma weights.
    pub fn to_luma8(&self) -> GrayImage {
        let mut out = GrayImage::new(self.width, self.height);
        for (i, px) in self.pixels.chunks_exact(Self::CHANNELS).enumerate() {
            let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            let x = (i as u32) % self.width;
            let row = (i as u32) / self.width;
            out.put_pixel(x, row, Luma([y.round().clamp(0.0, 255.0) as u8]));
        }
        out
    }

    /// Convert to a float grayscale plane (values in 0..=255).
    pub fn to_luma_f32(&self) -> GrayF32Image {
        let mut data = Vec::with_capacity(self.pixel_count());
        for px in self.pixels.chunks_exact(Self::CHANNELS) {
            data.push(0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32);
        }
        // Length matches width * height by construction.
        GrayF32Image::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| GrayF32Image::new(self.width, self.height))
    }
}

/// A position in the frame store.
///
/// Frames that failed to decode are carried as [`FrameSlot::Unreadable`]
/// rather than aborting the run; the matrix builder substitutes the
/// metric's sentinel score for every pair that touches one.
#[derive(Debug, Clone)]
pub enum FrameSlot {
    /// Successfully decoded frame.
    Ready(Frame),
    /// Frame that could not be decoded or loaded.
    Unreadable,
}

impl FrameSlot {
    /// The decoded frame, if this slot is readable.
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            FrameSlot::Ready(frame) => Some(frame),
            FrameSlot::Unreadable => None,
        }
    }

    /// Whether this slot holds a decoded frame.
    pub fn is_ready(&self) -> bool {
        matches!(self, FrameSlot::Ready(_))
    }
}

/// Dense symmetric N x N matrix of pairwise similarity scores.
///
/// Built once per run by the matrix builder and read-only afterwards.
/// Higher scores mean "more likely temporally adjacent". The diagonal
/// holds the metric's maximum; pairs involving an unreadable frame hold
/// the metric's sentinel minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    n: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    /// Create a matrix of the given order, filled with `fill`.
    pub fn filled(n: usize, fill: f64) -> Self {
        Self {
            n,
            scores: vec![fill; n * n],
        }
    }

    /// Matrix order (the number of frames).
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the matrix has zero rows.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Score at `(i, j)`.
    ///
    /// # Panics
    /// Panics if either index is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n && j < self.n, "matrix index out of range");
        self.scores[i * self.n + j]
    }

    /// Set the score at `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.n && j < self.n, "matrix index out of range");
        self.scores[i * self.n + j] = value;
    }

    /// Row `i` as a slice of length `n`.
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.n, "matrix row out of range");
        &self.scores[i * self.n..(i + 1) * self.n]
    }

    /// Whether `M[i][j] == M[j][i]` for all pairs, within `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if (self.get(i, j) - self.get(j, i)).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }
}

/// Error types for analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// No frames were supplied.
    #[error("no frames supplied: nothing to reconstruct")]
    NoFrames,

    /// Frame buffer length does not match its declared dimensions.
    #[error("bad frame buffer: {width}x{height} with {len} bytes")]
    BadFrameBuffer { width: u32, height: u32, len: usize },

    /// The greedy walk could not run.
    #[error("ordering failed: {0}")]
    Ordering(#[from] crate::ordering::OrderingError),

    /// The produced sequence failed permutation validation.
    ///
    /// This indicates an internal logic fault; it is never expected on a
    /// correct greedy walk and exists as a diagnostic aid.
    #[error("reconstruction invariant violated: {0}")]
    InvariantViolation(#[from] ValidationError),
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width * height) {
            pixels.extend_from_slice(&rgb);
        }
        Frame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn frame_rejects_mismatched_buffer() {
        assert!(matches!(
            Frame::new(4, 4, vec![0u8; 10]),
            Err(AnalysisError::BadFrameBuffer { .. })
        ));
    }

    #[test]
    fn frame_rejects_zero_dimensions() {
        assert!(Frame::new(0, 4, vec![]).is_err());
        assert!(Frame::new(4, 0, vec![]).is_err());
    }

    #[test]
    fn frame_resamples_to_target_size() {
        let frame = solid_frame(8, 6, [10, 20, 30]);
        let resized = frame.resampled_to(4, 3);
        assert_eq!(resized.width(), 4);
        assert_eq!(resized.height(), 3);
        // Solid colour survives resampling.
        assert_eq!(&resized.pixels()[..3], &[10, 20, 30]);
    }

    #[test]
    fn luma_of_solid_gray_is_identity() {
        let frame = solid_frame(4, 4, [128, 128, 128]);
        let gray = frame.to_luma8();
        assert_eq!(gray.get_pixel(0, 0).0[0], 128);
    }

    #[test]
    fn matrix_get_set_and_rows() {
        let mut m = SimilarityMatrix::filled(3, 0.0);
        m.set(0, 2, 0.5);
        assert_eq!(m.get(0, 2), 0.5);
        assert_eq!(m.row(0), &[0.0, 0.0, 0.5]);
    }

    #[test]
    fn matrix_symmetry_check() {
        let mut m = SimilarityMatrix::filled(2, 0.0);
        m.set(0, 1, 0.3);
        assert!(!m.is_symmetric(1e-9));
        m.set(1, 0, 0.3);
        assert!(m.is_symmetric(1e-9));
    }

    #[test]
    fn unreadable_slot_has_no_frame() {
        let slot = FrameSlot::Unreadable;
        assert!(slot.frame().is_none());
        assert!(!slot.is_ready());
    }
}
