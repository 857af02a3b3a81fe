//! Batch dispatch for key-set operations (`expire`, `unexpire`)
//!
//! Keys are routed one at a time and grouped by destination shard, so each
//! shard receives a single request carrying only its keys.

use super::{ShardCall, ShardCluster};
use crate::error::ShardError;
use crate::parallel;
use crate::shard::{Request, ShardId};

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Keys destined for each shard, in the order they were given
pub(crate) type ExpiryBuckets = BTreeMap<ShardId, Vec<Value>>;

impl ShardCluster {
    /// Set a TTL, in seconds, on every key in `keys`.
    ///
    /// Each shard that receives keys is issued its request before this
    /// returns. `handler` runs once with the first shard error or one result
    /// per such shard, in ascending shard order. Returns the same empty
    /// placeholder list as [`ShardCluster::call_with`].
    pub fn expire<F>(&self, keys: Vec<Value>, ttl: u64, handler: F) -> Vec<Value>
    where
        F: FnOnce(Result<Vec<Value>, ShardError>) + Send + 'static,
    {
        self.batch_with(Request::Expire { keys, ttl }, handler)
    }

    /// Clear the TTL on every key in `keys`.
    pub fn unexpire<F>(&self, keys: Vec<Value>, handler: F) -> Vec<Value>
    where
        F: FnOnce(Result<Vec<Value>, ShardError>) + Send + 'static,
    {
        self.batch_with(Request::Unexpire { keys }, handler)
    }

    pub fn expire_async(
        &self,
        keys: Vec<Value>,
        ttl: u64,
    ) -> BoxFuture<'static, Result<Vec<Value>, ShardError>> {
        self.batch_async(Request::Expire { keys, ttl })
    }

    pub fn unexpire_async(&self, keys: Vec<Value>) -> BoxFuture<'static, Result<Vec<Value>, ShardError>> {
        self.batch_async(Request::Unexpire { keys })
    }

    /// Group the request's keys by the shards the mapper routes them to.
    ///
    /// A key routed to several shards lands in each of their buckets.
    pub(crate) fn bucket_keys(&self, request: &Request) -> ExpiryBuckets {
        let method = request.method();
        let mut buckets = ExpiryBuckets::new();

        for key in request.batch_keys() {
            for shard_id in self.resolve(key, method).targets {
                buckets.entry(shard_id).or_default().push(key.clone());
            }
        }

        buckets
    }

    /// Plan one call per non-empty bucket, in ascending shard order.
    fn batch_calls(&self, request: &Request) -> Vec<ShardCall> {
        let buckets = self.bucket_keys(request);
        debug!(
            method = %request.method(),
            shards = buckets.len(),
            "Dispatching batch"
        );

        buckets
            .into_iter()
            .map(|(shard_id, keys)| self.plan(shard_id, request.with_keys(keys)))
            .collect()
    }

    fn batch_with<F>(&self, request: Request, handler: F) -> Vec<Value>
    where
        F: FnOnce(Result<Vec<Value>, ShardError>) + Send + 'static,
    {
        let method = request.method();
        let calls = self.batch_calls(&request);
        let metrics = self.metrics.clone();
        let started = Instant::now();

        parallel::parallel(&self.runtime, ShardCall::issue_all(calls), move |outcome| {
            metrics.record_fanout(method, started.elapsed());
            handler(outcome);
        });

        Vec::new()
    }

    fn batch_async(&self, request: Request) -> BoxFuture<'static, Result<Vec<Value>, ShardError>> {
        let method = request.method();
        let calls = self.batch_calls(&request);
        let runtime = self.runtime.clone();
        let metrics = self.metrics.clone();

        Box::pin(async move {
            let started = Instant::now();
            let tasks = ShardCall::issue_all(calls);
            let outcome = parallel::join_ordered(&runtime, tasks).await;
            metrics.record_fanout(method, started.elapsed());
            outcome
        })
    }
}
