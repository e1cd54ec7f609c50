//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level
//! updates.

use serde::{Deserialize, Serialize};

use crate::analysis::metrics::MetricWeights;
use crate::logging::LogLevel;
use crate::models::MetricKind;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Similarity analysis settings.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Sequence ordering settings.
    #[serde(default)]
    pub ordering: OrderingSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level when RUST_LOG is not set.
    #[serde(default)]
    pub level: LogLevel,
}

/// Similarity analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Metric used for pairwise frame comparison.
    #[serde(default)]
    pub metric: MetricKind,

    /// Weight of the histogram score in the combined metric.
    #[serde(default = "default_histogram_weight")]
    pub histogram_weight: f64,

    /// Weight of the structural score in the combined metric.
    #[serde(default = "default_structural_weight")]
    pub structural_weight: f64,

    /// Weight of the magnitude term in the optical flow metric.
    #[serde(default = "default_flow_magnitude_weight")]
    pub flow_magnitude_weight: f64,

    /// Weight of the coherence term in the optical flow metric.
    #[serde(default = "default_flow_coherence_weight")]
    pub flow_coherence_weight: f64,

    /// Pair count below which matrix building stays single-threaded.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            histogram_weight: default_histogram_weight(),
            structural_weight: default_structural_weight(),
            flow_magnitude_weight: default_flow_magnitude_weight(),
            flow_coherence_weight: default_flow_coherence_weight(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl AnalysisSettings {
    /// Bundle the four weight knobs for the metric factory.
    pub fn weights(&self) -> MetricWeights {
        MetricWeights {
            histogram: self.histogram_weight,
            structural: self.structural_weight,
            flow_magnitude: self.flow_magnitude_weight,
            flow_coherence: self.flow_coherence_weight,
        }
    }
}

fn default_histogram_weight() -> f64 {
    0.7
}

fn default_structural_weight() -> f64 {
    0.3
}

fn default_flow_magnitude_weight() -> f64 {
    0.7
}

fn default_flow_coherence_weight() -> f64 {
    0.3
}

fn default_parallel_threshold() -> usize {
    100
}

/// Sequence ordering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderingSettings {
    /// Frame index the greedy walk starts from.
    #[serde(default)]
    pub start_index: usize,
}

/// Identifies a config section for atomic section-level updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Logging,
    Analysis,
    Ordering,
}

impl ConfigSection {
    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Logging => "logging",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Ordering => "ordering",
        }
    }
}
