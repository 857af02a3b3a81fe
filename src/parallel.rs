//! Concurrent task execution with first-error aggregation
//!
//! Awaits a list of already-issued shard calls and reports a single outcome:
//! the first error to arrive, or every result in task order. Tasks still in
//! flight after an error keep running to completion on the runtime; their
//! outcomes are discarded.

use crate::error::ShardError;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

/// Completion of one shard call that has already been issued
pub type Task = BoxFuture<'static, Result<Value, ShardError>>;

/// Await every task, returning results in task order or the first error.
pub async fn join_ordered(runtime: &Handle, tasks: Vec<Task>) -> Result<Vec<Value>, ShardError> {
    let count = tasks.len();
    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, task.await) })
        .collect();

    let mut slots: Vec<Option<Value>> = vec![None; count];

    while let Some((index, outcome)) = pending.next().await {
        match outcome {
            Ok(value) => slots[index] = Some(value),
            Err(err) => {
                if !pending.is_empty() {
                    debug!(
                        task = index,
                        in_flight = pending.len(),
                        "Task failed; draining remaining tasks without collecting"
                    );
                    runtime.spawn(async move { while pending.next().await.is_some() {} });
                }
                return Err(err);
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Await `tasks` on the runtime and call `finish` exactly once with the
/// aggregate outcome.
pub fn parallel<F>(runtime: &Handle, tasks: Vec<Task>, finish: F)
where
    F: FnOnce(Result<Vec<Value>, ShardError>) + Send + 'static,
{
    let rt = runtime.clone();
    runtime.spawn(async move {
        let outcome = join_ordered(&rt, tasks).await;
        finish(outcome);
    });
}
