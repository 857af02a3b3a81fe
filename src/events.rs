//! Event fan-in from every shard onto one cluster stream
//!
//! Each shard's `message`, `error` and `warning` events are re-emitted on the
//! cluster with the same name and payload. Nothing identifies the origin
//! shard, so listeners see the cluster as one connection.

use crate::metrics::ClusterMetrics;
use crate::shard::{ShardEvent, ShardHandle, ShardId, ShardStats};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Relays shard events to cluster subscribers
pub struct EventAggregator {
    sender: broadcast::Sender<ShardEvent>,
    relays: Vec<JoinHandle<()>>,
}

impl EventAggregator {
    /// Subscribe to every shard and start one relay task per shard.
    ///
    /// Shard subscriptions are taken before this returns, so no event
    /// emitted after construction is missed by the relay.
    pub(crate) fn start(
        runtime: &Handle,
        shards: &[Arc<dyn ShardHandle>],
        capacity: usize,
        stats: ShardStats,
        metrics: ClusterMetrics,
    ) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        let relays = shards
            .iter()
            .enumerate()
            .map(|(shard_id, shard)| {
                let source = shard.events();
                let sink = sender.clone();
                let stats = stats.clone();
                let metrics = metrics.clone();
                runtime.spawn(relay(shard_id, source, sink, stats, metrics))
            })
            .collect();

        Self { sender, relays }
    }

    /// Receive every event from every shard, starting now.
    pub fn subscribe(&self) -> broadcast::Receiver<ShardEvent> {
        self.sender.subscribe()
    }
}

impl Drop for EventAggregator {
    fn drop(&mut self) {
        for relay in &self.relays {
            relay.abort();
        }
    }
}

async fn relay(
    shard_id: ShardId,
    mut source: broadcast::Receiver<ShardEvent>,
    sink: broadcast::Sender<ShardEvent>,
    stats: ShardStats,
    metrics: ClusterMetrics,
) {
    loop {
        match source.recv().await {
            Ok(event) => {
                stats.record_event(shard_id);
                metrics.record_event(&event);
                if sink.send(event).is_err() {
                    debug!(shard_id, "No cluster listeners; event dropped");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(shard_id, skipped, "Event relay lagged behind shard");
            }
            Err(RecvError::Closed) => {
                info!(shard_id, "Shard event stream ended");
                break;
            }
        }
    }
}
