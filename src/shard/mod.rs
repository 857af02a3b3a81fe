//! Shard connection contract
//!
//! A shard is one broker connection in the pool. The cluster only needs to
//! invoke named operations on it, listen to its events, and borrow its pure
//! key/value extraction helpers; the connection's own protocol stays behind
//! [`ShardHandle`].

mod request;
mod stats;

pub use request::{Method, Request};
pub use stats::{ShardStats, ShardStatsEntry};

use crate::error::ShardError;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::broadcast;

/// Position of a shard in the pool, assigned 0..N-1 at construction
pub type ShardId = usize;

/// Event emitted by a shard connection
#[derive(Debug, Clone, PartialEq)]
pub enum ShardEvent {
    /// Pub/sub delivery, carrying the connection's argument list verbatim
    Message(Vec<Value>),
    /// Connection-level failure
    Error(ShardError),
    /// Non-fatal connection notice
    Warning(String),
}

impl ShardEvent {
    /// Event name as seen by listeners (`message`, `error`, `warning`)
    pub fn name(&self) -> &'static str {
        match self {
            ShardEvent::Message(_) => "message",
            ShardEvent::Error(_) => "error",
            ShardEvent::Warning(_) => "warning",
        }
    }
}

/// Capability set every shard connection exposes
pub trait ShardHandle: Send + Sync + 'static {
    /// Run an operation and return its value directly.
    fn invoke(&self, request: &Request) -> Result<Value, ShardError>;

    /// Issue an operation now and return a future for its completion.
    ///
    /// The request must be handed to the connection before this returns;
    /// calls issued back to back reach the shard in that order.
    fn dispatch(&self, request: Request) -> BoxFuture<'static, Result<Value, ShardError>>;

    /// Subscribe to this connection's `message`/`error`/`warning` stream.
    fn events(&self) -> broadcast::Receiver<ShardEvent>;

    /// Pure helper: top-level keys of a structured value
    fn extract_keys(&self, value: &Value) -> Vec<String>;

    /// Pure helper: top-level values of a structured value
    fn extract_values(&self, value: &Value) -> Vec<Value>;
}
