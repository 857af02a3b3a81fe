//! Direct dispatch for single-key passthrough operations

use super::{Reply, ShardCall, ShardCluster};
use crate::error::ShardError;
use crate::metrics::ClusterMetrics;
use crate::parallel;
use crate::shard::{Method, Request};

use futures::future::BoxFuture;
use serde_json::Value;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::debug;

impl ShardCluster {
    /// Run `request` on every target shard in order and collect the results.
    ///
    /// Stops at the first shard error and returns it; later targets are not
    /// called. An unrouted request returns an empty list.
    pub fn call(&self, request: &Request) -> Result<Vec<Value>, ShardError> {
        let method = request.method();
        let route = self.resolve(&request.routing_key(), method);
        debug!(%method, targets = ?route.targets, "Dispatching call");

        let mut results = Vec::with_capacity(route.targets.len());
        for &shard_id in &route.targets {
            self.stats.record_dispatch(shard_id);
            self.metrics.record_dispatch(shard_id, method);

            match self.shards[shard_id].invoke(request) {
                Ok(value) => results.push(value),
                Err(err) => {
                    self.note_failure(shard_id, method, &err);
                    return Err(err);
                }
            }
        }

        Ok(results)
    }

    /// Run `request` and report the outcome to `handler` once.
    ///
    /// Every target shard has been issued its call by the time this returns,
    /// so back-to-back calls reach a shard in call order. A single target
    /// gets its result forwarded as [`Reply::Single`]. Several targets run
    /// concurrently; `handler` gets the first error, or [`Reply::Multi`] with
    /// results in target order.
    ///
    /// Returns the shard results collected before this call returned.
    /// Completions arrive on the runtime, so the list is empty; callers
    /// wanting results must use `handler` or [`ShardCluster::call_async`].
    pub fn call_with<F>(&self, request: Request, handler: F) -> Vec<Value>
    where
        F: FnOnce(Result<Reply, ShardError>) + Send + 'static,
    {
        let routed = self.route(request);
        let call = routed.issue(self.runtime.clone(), self.metrics.clone());
        self.runtime.spawn(async move { handler(call.await) });
        Vec::new()
    }

    /// Future-returning form of [`ShardCluster::call_with`].
    ///
    /// Targets are resolved when this is called; shards are issued their
    /// calls when the future is first polled.
    pub fn call_async(&self, request: Request) -> BoxFuture<'static, Result<Reply, ShardError>> {
        let routed = self.route(request);
        let runtime = self.runtime.clone();
        let metrics = self.metrics.clone();

        Box::pin(async move { routed.issue(runtime, metrics).await })
    }

    /// Resolve targets now and pair each with its copy of the request.
    fn route(&self, request: Request) -> Routed {
        let method = request.method();
        let route = self.resolve(&request.routing_key(), method);
        debug!(%method, targets = ?route.targets, single = route.is_single(), "Dispatching with completion");

        let calls = route
            .targets
            .iter()
            .map(|&shard_id| self.plan(shard_id, request.clone()))
            .collect();

        Routed {
            method,
            single: route.is_single(),
            calls,
        }
    }
}

/// A completion-convention call with its targets resolved
struct Routed {
    method: Method,
    single: bool,
    calls: Vec<ShardCall>,
}

impl Routed {
    /// Issue every shard call now and return the aggregate completion.
    fn issue(
        self,
        runtime: Handle,
        metrics: ClusterMetrics,
    ) -> BoxFuture<'static, Result<Reply, ShardError>> {
        let Routed {
            method,
            single,
            calls,
        } = self;
        let mut tasks = ShardCall::issue_all(calls);

        if single {
            if let Some(task) = tasks.pop() {
                return Box::pin(async move { task.await.map(Reply::Single) });
            }
        }

        let started = Instant::now();
        Box::pin(async move {
            let outcome = parallel::join_ordered(&runtime, tasks).await;
            metrics.record_fanout(method, started.elapsed());
            outcome.map(Reply::Multi)
        })
    }
}
