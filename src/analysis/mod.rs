//! Frame similarity analysis.
//!
//! The heart of the crate: pairwise similarity metrics, the symmetric
//! similarity matrix they fill, and the dense optical flow estimator the
//! flow metric builds on. `analyzer` ties the stages into the full
//! reconstruction pipeline.

pub mod analyzer;
pub mod flow;
pub mod matrix;
pub mod metrics;
pub mod types;

pub use analyzer::{reconstruct, Reconstruction};
pub use types::{AnalysisError, AnalysisResult, Frame, FrameSlot, SimilarityMatrix};
