//! Key-to-shard mapping and target resolution
//!
//! A [`Mapper`] is supplied by the application and decides which shard ids
//! handle an operation. Resolution turns its raw [`MapResult`] into a
//! [`TargetSet`]: integers wrap around the pool size, so every integer the
//! mapper returns lands on a real shard.

use crate::shard::{Method, ShardId};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Routing function: `(key, method, all shard ids) -> route`
pub type Mapper = Arc<dyn Fn(&Value, Method, &[ShardId]) -> MapResult + Send + Sync>;

/// Raw mapper output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapResult {
    /// One shard; the call is forwarded untouched
    Single(i64),
    /// Several shards, in call order; duplicates are kept
    Multi(Vec<i64>),
    /// No route; the operation runs over zero shards
    Unrouted,
}

impl From<i64> for MapResult {
    fn from(id: i64) -> Self {
        MapResult::Single(id)
    }
}

impl From<usize> for MapResult {
    fn from(id: usize) -> Self {
        MapResult::Single(id as i64)
    }
}

impl From<Vec<i64>> for MapResult {
    fn from(ids: Vec<i64>) -> Self {
        MapResult::Multi(ids)
    }
}

impl From<Vec<usize>> for MapResult {
    fn from(ids: Vec<usize>) -> Self {
        MapResult::Multi(ids.into_iter().map(|id| id as i64).collect())
    }
}

/// Wrap a closure as a [`Mapper`].
pub fn mapper_fn<F>(f: F) -> Mapper
where
    F: Fn(&Value, Method, &[ShardId]) -> MapResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Broadcast to every shard regardless of key or method.
pub fn broadcast_mapper() -> Mapper {
    mapper_fn(|_key, _method, shard_ids| MapResult::from(shard_ids.to_vec()))
}

/// Whether the call goes to exactly one shard or through the fan-out path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Single,
    Multi,
}

/// Resolved route for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    pub kind: TargetKind,
    pub targets: Vec<ShardId>,
}

impl TargetSet {
    /// Resolve a mapper result against a pool of `shard_count` shards.
    pub fn from_map_result(result: MapResult, shard_count: usize) -> Self {
        match result {
            MapResult::Single(id) => Self {
                kind: TargetKind::Single,
                targets: vec![wrap(id, shard_count)],
            },
            MapResult::Multi(ids) => Self {
                kind: TargetKind::Multi,
                targets: ids.into_iter().map(|id| wrap(id, shard_count)).collect(),
            },
            MapResult::Unrouted => Self {
                kind: TargetKind::Multi,
                targets: Vec::new(),
            },
        }
    }

    pub fn is_single(&self) -> bool {
        self.kind == TargetKind::Single
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

// Pools are never empty, so the modulus is non-zero.
fn wrap(id: i64, shard_count: usize) -> ShardId {
    id.rem_euclid(shard_count as i64) as ShardId
}

/// The cluster's current mapper, swappable at runtime
pub(crate) struct MapperSlot {
    current: RwLock<Mapper>,
}

impl MapperSlot {
    pub(crate) fn new(mapper: Mapper) -> Self {
        Self {
            current: RwLock::new(mapper),
        }
    }

    pub(crate) fn get(&self) -> Mapper {
        self.current.read().clone()
    }

    pub(crate) fn replace(&self, mapper: Mapper) {
        *self.current.write() = mapper;
    }

    /// Run the current mapper and resolve its output.
    ///
    /// The lock is released before the mapper runs, so a mapper may itself
    /// call back into the cluster.
    pub(crate) fn resolve(&self, key: &Value, method: Method, shard_ids: &[ShardId]) -> TargetSet {
        let mapper = self.get();
        let result = mapper(key, method, shard_ids);
        TargetSet::from_map_result(result, shard_ids.len())
    }
}
