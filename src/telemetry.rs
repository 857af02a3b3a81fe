//! Tracing setup for processes embedding the cluster

use crate::config::ClusterConfig;
use crate::error::ClusterError;
use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber using the configured log level.
///
/// `RUST_LOG` directives still apply; the cluster's own level is added on
/// top as `shard_cluster=<level>`. Fails if a subscriber is already set.
pub fn init_tracing(config: &ClusterConfig) -> Result<(), ClusterError> {
    let filter = env_filter(&config.log_level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ClusterError::Tracing(e.to_string()))
}

fn env_filter(level: &str) -> Result<EnvFilter, ClusterError> {
    let directive = format!("shard_cluster={level}")
        .parse()
        .map_err(|e| ClusterError::Config(format!("invalid log level '{level}': {e}")))?;

    Ok(EnvFilter::from_default_env().add_directive(directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_level_builds_filter() {
        assert!(env_filter("debug").is_ok());
    }

    #[test]
    fn test_invalid_level_is_config_error() {
        let err = env_filter("not a level!").unwrap_err();
        assert_eq!(err.error_type_label(), "config");
    }
}
