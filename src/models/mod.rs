//! Shared model types used across the crate.

mod enums;

pub use enums::MetricKind;
