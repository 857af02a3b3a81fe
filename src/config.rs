//! Cluster configuration module
//!
//! Loads cluster settings from `.env` and `SHARD_CLUSTER_*` environment
//! variables.

use crate::error::ClusterError;
use config::{Config, Environment};
use serde::Deserialize;

/// Environment variable prefix for every cluster setting
pub const ENV_PREFIX: &str = "SHARD_CLUSTER";

/// Cluster configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,

    /// Buffered events per cluster subscriber before it starts lagging
    pub event_capacity: usize,

    /// Record dispatch and relay metrics through the `metrics` facade
    pub record_metrics: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            event_capacity: 1024,
            record_metrics: true,
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ClusterError> {
        dotenvy::dotenv().ok();
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit environment source
    pub(crate) fn load(env: Environment) -> Result<Self, ClusterError> {
        let defaults = Self::default();

        let config: Self = Config::builder()
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?
            .set_default("event_capacity", defaults.event_capacity as i64)?
            .set_default("record_metrics", defaults.record_metrics)?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ClusterError> {
        if self.event_capacity == 0 {
            return Err(ClusterError::Config(format!(
                "{ENV_PREFIX}_EVENT_CAPACITY must be greater than zero"
            )));
        }
        Ok(())
    }
}
