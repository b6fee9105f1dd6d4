//! Sorter runtime configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Tuning knobs for probing and dispatch.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SorterConfig {
    /// Delay between stability-probe samples.
    #[builder(default = "Duration::from_secs(3)")]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Probe attempts before a file is skipped as not ready.
    #[builder(default = "100")]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Filename suffixes marking known-incomplete files (partial
    /// downloads); such files are rejected without polling.
    #[builder(default = "default_temp_suffixes()")]
    #[serde(default = "default_temp_suffixes")]
    pub temp_suffixes: Vec<String>,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_max_attempts() -> u32 {
    100
}

fn default_temp_suffixes() -> Vec<String> {
    vec![
        ".part".to_string(),
        ".!qb".to_string(),
        ".crdownload".to_string(),
    ]
}

impl SorterConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.max_attempts {
            return Err("max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

impl SorterConfig {
    /// Create a new config builder.
    pub fn builder() -> SorterConfigBuilder {
        SorterConfigBuilder::default()
    }
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_attempts: default_max_attempts(),
            temp_suffixes: default_temp_suffixes(),
        }
    }
}
