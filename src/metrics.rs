//! Cluster metrics
//!
//! Recorded through the `metrics` facade; the embedding process decides
//! whether and where they are exported.

use crate::shard::{Method, ShardEvent, ShardId};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

/// Dispatch and relay metrics collector
#[derive(Debug, Clone)]
pub struct ClusterMetrics {
    enabled: bool,
}

impl ClusterMetrics {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            Self::register_metrics();
        }
        Self { enabled }
    }

    /// Collector that records nothing
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn register_metrics() {
        describe_counter!(
            "cluster_dispatch_total",
            Unit::Count,
            "Operations issued to shards"
        );
        describe_counter!(
            "cluster_dispatch_errors_total",
            Unit::Count,
            "Shard operations that reported an error"
        );
        describe_counter!(
            "cluster_events_relayed_total",
            Unit::Count,
            "Shard events re-emitted on the cluster"
        );
        describe_histogram!(
            "cluster_fanout_duration_seconds",
            Unit::Seconds,
            "Time from fan-out start to aggregate completion"
        );
    }

    pub fn record_dispatch(&self, shard_id: ShardId, method: Method) {
        if !self.enabled {
            return;
        }
        counter!(
            "cluster_dispatch_total",
            "shard_id" => shard_id.to_string(),
            "method" => method.as_str()
        )
        .increment(1);
    }

    pub fn record_dispatch_error(&self, method: Method) {
        if !self.enabled {
            return;
        }
        counter!("cluster_dispatch_errors_total", "method" => method.as_str()).increment(1);
    }

    pub fn record_fanout(&self, method: Method, duration: Duration) {
        if !self.enabled {
            return;
        }
        histogram!("cluster_fanout_duration_seconds", "method" => method.as_str())
            .record(duration.as_secs_f64());
    }

    pub fn record_event(&self, event: &ShardEvent) {
        if !self.enabled {
            return;
        }
        counter!("cluster_events_relayed_total", "event" => event.name()).increment(1);
    }
}

impl Default for ClusterMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}
