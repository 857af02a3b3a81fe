//! Shard cluster: one client over a pool of shard connections
//!
//! Every call resolves its targets through the current mapper, then takes
//! one of three paths:
//!
//! - **direct, synchronous** ([`ShardCluster::call`]): each target in order,
//!   results returned as a list
//! - **direct, completion** ([`ShardCluster::call_with`] /
//!   [`ShardCluster::call_async`]): one target is forwarded as-is, several
//!   are fanned out and aggregated
//! - **batch** ([`ShardCluster::expire`] / [`ShardCluster::unexpire`]): keys
//!   grouped by destination shard, one request per shard

mod batch;
mod direct;
mod ops;

use crate::config::ClusterConfig;
use crate::error::{ClusterError, ShardError};
use crate::events::EventAggregator;
use crate::mapper::{broadcast_mapper, Mapper, MapperSlot, TargetSet};
use crate::metrics::ClusterMetrics;
use crate::parallel::Task;
use crate::shard::{Method, Request, ShardEvent, ShardHandle, ShardId, ShardStats};

use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Outcome delivered to a completion handler
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The call went to exactly one shard; its result as-is
    Single(Value),
    /// Fan-out results, one per target in issuance order
    Multi(Vec<Value>),
}

impl Reply {
    /// Every shard result as a list, whichever path produced them
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Reply::Single(value) => vec![value],
            Reply::Multi(values) => values,
        }
    }
}

/// A pool of shard connections presented as one client
pub struct ShardCluster {
    shards: Vec<Arc<dyn ShardHandle>>,
    shard_ids: Vec<ShardId>,
    mapper: MapperSlot,
    events: EventAggregator,
    stats: ShardStats,
    metrics: ClusterMetrics,
    runtime: Handle,
}

impl ShardCluster {
    /// Build a cluster over `shards`, which are numbered in the given order.
    ///
    /// Must be called from within a tokio runtime; relay and fan-out tasks
    /// run on it. Routing starts with the broadcast mapper.
    pub fn new(
        shards: Vec<Arc<dyn ShardHandle>>,
        config: &ClusterConfig,
    ) -> Result<Self, ClusterError> {
        if shards.is_empty() {
            return Err(ClusterError::EmptyPool);
        }
        let runtime = Handle::try_current().map_err(ClusterError::NoRuntime)?;

        let shard_ids: Vec<ShardId> = (0..shards.len()).collect();
        let stats = ShardStats::new(shard_ids.iter().copied());
        let metrics = ClusterMetrics::new(config.record_metrics);

        let events = EventAggregator::start(
            &runtime,
            &shards,
            config.event_capacity,
            stats.clone(),
            metrics.clone(),
        );

        info!(shard_count = shards.len(), "Shard cluster created");

        Ok(Self {
            shards,
            shard_ids,
            mapper: MapperSlot::new(broadcast_mapper()),
            events,
            stats,
            metrics,
            runtime,
        })
    }

    /// Build a cluster with default configuration.
    pub fn with_defaults(shards: Vec<Arc<dyn ShardHandle>>) -> Result<Self, ClusterError> {
        Self::new(shards, &ClusterConfig::default())
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Always false; construction rejects an empty pool
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    pub fn shard(&self, shard_id: ShardId) -> Option<&Arc<dyn ShardHandle>> {
        self.shards.get(shard_id)
    }

    /// Per-shard call and event counters
    pub fn stats(&self) -> ShardStats {
        self.stats.clone()
    }

    // Mapper and targeting

    /// Replace the mapper for every call made from now on.
    ///
    /// Calls that already resolved their targets keep them.
    pub fn set_mapper(&self, mapper: Mapper) {
        self.mapper.replace(mapper);
        info!("Shard mapper replaced");
    }

    pub fn mapper(&self) -> Mapper {
        self.mapper.get()
    }

    /// Resolve which shards handle `method` for `key`.
    pub fn resolve(&self, key: &Value, method: Method) -> TargetSet {
        self.mapper.resolve(key, method, &self.shard_ids)
    }

    /// Shard handles `method` for `key` would be sent to, in call order.
    pub fn map(&self, key: &Value, method: Method) -> Vec<Arc<dyn ShardHandle>> {
        self.resolve(key, method)
            .targets
            .into_iter()
            .map(|shard_id| Arc::clone(&self.shards[shard_id]))
            .collect()
    }

    // Events

    /// Receive `message`, `error` and `warning` events from every shard.
    pub fn events(&self) -> broadcast::Receiver<ShardEvent> {
        self.events.subscribe()
    }

    // Utility passthrough, served by the first shard

    pub fn extract_keys(&self, value: &Value) -> Vec<String> {
        self.reference_shard().extract_keys(value)
    }

    pub fn extract_values(&self, value: &Value) -> Vec<Value> {
        self.reference_shard().extract_values(value)
    }

    fn reference_shard(&self) -> &Arc<dyn ShardHandle> {
        &self.shards[0]
    }

    /// Pair `request` with its target shard, without issuing it yet.
    fn plan(&self, shard_id: ShardId, request: Request) -> ShardCall {
        ShardCall {
            shard_id,
            shard: Arc::clone(&self.shards[shard_id]),
            request,
            stats: self.stats.clone(),
            metrics: self.metrics.clone(),
        }
    }

    fn note_failure(&self, shard_id: ShardId, method: Method, err: &ShardError) {
        self.stats.record_failure(shard_id);
        self.metrics.record_dispatch_error(method);
        warn!(shard_id, %method, error = %err, "Shard call failed");
    }
}

/// One routed shard call that has not reached the shard yet
struct ShardCall {
    shard_id: ShardId,
    shard: Arc<dyn ShardHandle>,
    request: Request,
    stats: ShardStats,
    metrics: ClusterMetrics,
}

impl ShardCall {
    /// Hand the request to the shard now; the task resolves on completion.
    fn issue(self) -> Task {
        let ShardCall {
            shard_id,
            shard,
            request,
            stats,
            metrics,
        } = self;
        let method = request.method();

        stats.record_dispatch(shard_id);
        metrics.record_dispatch(shard_id, method);
        let completion = shard.dispatch(request);

        Box::pin(async move {
            let outcome = completion.await;
            if let Err(ref err) = outcome {
                stats.record_failure(shard_id);
                metrics.record_dispatch_error(method);
                warn!(shard_id, %method, error = %err, "Shard call failed");
            }
            outcome
        })
    }

    fn issue_all(calls: Vec<ShardCall>) -> Vec<Task> {
        calls.into_iter().map(ShardCall::issue).collect()
    }
}
