//! Per-shard call and event counters

use super::ShardId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for a single shard
#[derive(Debug, Default)]
pub struct ShardStatsEntry {
    pub calls_dispatched: AtomicU64,
    pub calls_failed: AtomicU64,
    pub events_relayed: AtomicU64,
    pub last_failure: Option<Instant>,
}

/// Shared counters across every shard in a cluster
#[derive(Debug, Clone)]
pub struct ShardStats {
    inner: Arc<DashMap<ShardId, ShardStatsEntry>>,
}

impl ShardStats {
    pub fn new(shard_ids: impl Iterator<Item = ShardId>) -> Self {
        let shards = DashMap::new();
        for shard_id in shard_ids {
            shards.insert(shard_id, ShardStatsEntry::default());
        }

        Self {
            inner: Arc::new(shards),
        }
    }

    pub fn record_dispatch(&self, shard_id: ShardId) {
        if let Some(entry) = self.inner.get(&shard_id) {
            entry.calls_dispatched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self, shard_id: ShardId) {
        if let Some(mut entry) = self.inner.get_mut(&shard_id) {
            entry.calls_failed.fetch_add(1, Ordering::Relaxed);
            entry.last_failure = Some(Instant::now());
        }
    }

    pub fn record_event(&self, shard_id: ShardId) {
        if let Some(entry) = self.inner.get(&shard_id) {
            entry.events_relayed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Calls issued to one shard, or `None` for an unknown id
    pub fn dispatched(&self, shard_id: ShardId) -> Option<u64> {
        self.inner
            .get(&shard_id)
            .map(|e| e.calls_dispatched.load(Ordering::Relaxed))
    }

    pub fn failed(&self, shard_id: ShardId) -> Option<u64> {
        self.inner
            .get(&shard_id)
            .map(|e| e.calls_failed.load(Ordering::Relaxed))
    }

    pub fn last_failure(&self, shard_id: ShardId) -> Option<Instant> {
        self.inner.get(&shard_id).and_then(|e| e.last_failure)
    }

    pub fn total_dispatched(&self) -> u64 {
        self.inner
            .iter()
            .map(|e| e.calls_dispatched.load(Ordering::Relaxed))
            .sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.inner
            .iter()
            .map(|e| e.calls_failed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn total_events_relayed(&self) -> u64 {
        self.inner
            .iter()
            .map(|e| e.events_relayed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn shard_count(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_shard() {
        let stats = ShardStats::new(0..3);
        stats.record_dispatch(0);
        stats.record_dispatch(2);
        stats.record_dispatch(2);
        stats.record_failure(2);

        assert_eq!(stats.dispatched(0), Some(1));
        assert_eq!(stats.dispatched(1), Some(0));
        assert_eq!(stats.dispatched(2), Some(2));
        assert_eq!(stats.failed(2), Some(1));
        assert!(stats.last_failure(2).is_some());
        assert!(stats.last_failure(0).is_none());
        assert_eq!(stats.total_dispatched(), 3);
        assert_eq!(stats.total_failed(), 1);
    }

    #[test]
    fn test_unknown_shard_is_ignored() {
        let stats = ShardStats::new(0..2);
        stats.record_event(7);
        assert_eq!(stats.dispatched(7), None);
        assert_eq!(stats.total_events_relayed(), 0);
        assert_eq!(stats.shard_count(), 2);
    }
}
