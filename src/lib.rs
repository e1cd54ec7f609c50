//! JFR Core - Backend logic for Jumbled Frames Reconstruction
//!
//! This crate contains the similarity analysis and sequence reconstruction
//! logic with zero UI or container-format dependencies. It can be used by
//! a CLI tool or a GUI front-end: callers hand it decoded frame buffers and
//! get back a similarity matrix plus the recovered frame order.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod models;
pub mod ordering;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
