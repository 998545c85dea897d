//! Common configuration types shared by the slotcast crates.

mod loader;
mod path;
mod vars;

pub use loader::{Mergeable, load_from_paths};
pub use path::{CliArgs, ConfigPath, is_yaml_file};
pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one configured pipeline (e.g. `daily`, `hourly`).
#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: default_metrics_address(),
        }
    }
}

impl MetricsConfig {
    /// Merge values from another MetricsConfig (last-write-wins).
    pub fn merge_from(&mut self, other: Self) {
        if other.address != default_metrics_address() {
            self.address = other.address;
        }
    }
}

fn default_metrics_address() -> String {
    crate::metrics::DEFAULT_METRICS_ADDR.to_string()
}

/// Options that apply to every pipeline in the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Maximum number of pipeline runs executing at the same time.
    ///
    /// Defaults to 1, which runs the configured pipelines one after another.
    #[serde(default = "default_total_concurrency")]
    pub total_concurrency: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            total_concurrency: default_total_concurrency(),
        }
    }
}

impl GlobalConfig {
    /// Merge values from another GlobalConfig (last-write-wins).
    pub fn merge_from(&mut self, other: Self) {
        if other.total_concurrency != default_total_concurrency() {
            self.total_concurrency = other.total_concurrency;
        }
    }
}

fn default_total_concurrency() -> usize {
    1
}
