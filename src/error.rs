//! Error types for the shard cluster
//!
//! Two kinds of failure cross this crate:
//!
//! - [`ShardError`] belongs to the shard connection. The cluster is a router
//!   and relays it unchanged through the synchronous return, the completion
//!   handler, or the `error` event.
//! - [`ClusterError`] covers building the cluster itself (empty pool, missing
//!   runtime, bad configuration). Routing never produces one.

use thiserror::Error;

/// Error reported by a single shard connection.
///
/// Opaque to the cluster: it is cloned into event streams and handed back to
/// callers exactly as the shard produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct ShardError {
    /// Error class as named by the shard (e.g. `BrokerError`, `TimeoutError`)
    pub name: String,
    /// Human-readable detail
    pub message: String,
}

impl ShardError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Cluster construction and setup errors
///
/// Every variant carries enough context to act on without parsing the
/// message string.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The cluster was built with no shards
    #[error("shard pool is empty: at least one shard is required")]
    EmptyPool,

    /// Construction happened outside a tokio runtime
    #[error("no tokio runtime available to drive shard fan-out")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),

    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),

    /// Tracing subscriber could not be installed
    #[error("tracing setup failed: {0}")]
    Tracing(String),
}

impl ClusterError {
    /// Returns a static label string suitable for metrics.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::EmptyPool => "empty_pool",
            Self::NoRuntime(_) => "no_runtime",
            Self::Config(_) => "config",
            Self::Tracing(_) => "tracing",
        }
    }
}

impl From<config::ConfigError> for ClusterError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
