//! Shard Cluster - one client over a pool of broker shards
//!
//! Presents several independent store/pub-sub connections ("shards") as a
//! single client:
//! - Routes each operation through a pluggable mapper to one or many shards
//! - Fans out concurrently and aggregates results in issuance order
//! - Groups multi-key `expire`/`unexpire` calls into one request per shard
//! - Merges every shard's `message`/`error`/`warning` events into one stream
//!
//! # Example
//!
//! ```rust,ignore
//! use shard_cluster::{mapper_fn, MapResult, ShardCluster};
//!
//! let cluster = ShardCluster::with_defaults(shards)?;
//!
//! // Pin every channel to a shard by name length
//! cluster.set_mapper(mapper_fn(|key, _method, ids| {
//!     let len = key.as_str().map_or(0, str::len);
//!     MapResult::Single((len % ids.len()) as i64)
//! }));
//!
//! let reply = cluster.publish_async("news".into(), "hello".into()).await?;
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod events;
pub mod mapper;
pub mod metrics;
pub mod parallel;
pub mod shard;
pub mod telemetry;
pub mod testing;

pub use crate::cluster::{Reply, ShardCluster};
pub use crate::config::ClusterConfig;
pub use crate::error::{ClusterError, ShardError};
pub use crate::mapper::{broadcast_mapper, mapper_fn, MapResult, Mapper, TargetKind, TargetSet};
pub use crate::metrics::ClusterMetrics;
pub use crate::shard::{Method, Request, ShardEvent, ShardHandle, ShardId, ShardStats};
pub use crate::telemetry::init_tracing;
