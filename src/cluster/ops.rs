//! Typed passthrough surface
//!
//! Each broker operation gets three entry points with the shard-level
//! argument list:
//!
//! - `op(..)` runs on every target and returns the result list
//! - `op_with(.., handler)` reports through a completion handler
//! - `op_async(..)` resolves to the same outcome as the handler form

use super::{Reply, ShardCluster};
use crate::error::ShardError;
use crate::shard::Request;

use futures::future::BoxFuture;
use serde_json::Value;

macro_rules! passthrough {
    ($(
        $(#[$doc:meta])*
        $sync:ident, $with:ident, $fut:ident => $variant:ident { $($arg:ident : $ty:ty),* $(,)? };
    )*) => {
        impl ShardCluster {
            $(
                $(#[$doc])*
                pub fn $sync(&self, $($arg: $ty),*) -> Result<Vec<Value>, ShardError> {
                    self.call(&Request::$variant { $($arg),* })
                }

                pub fn $with<F>(&self, $($arg: $ty,)* handler: F) -> Vec<Value>
                where
                    F: FnOnce(Result<Reply, ShardError>) + Send + 'static,
                {
                    self.call_with(Request::$variant { $($arg),* }, handler)
                }

                pub fn $fut(&self, $($arg: $ty),*) -> BoxFuture<'static, Result<Reply, ShardError>> {
                    self.call_async(Request::$variant { $($arg),* })
                }
            )*
        }
    };
}

passthrough! {
    /// Subscribe to a pub/sub channel.
    subscribe, subscribe_with, subscribe_async => Subscribe { channel: String };
    is_subscribed, is_subscribed_with, is_subscribed_async => IsSubscribed { channel: String, include_pending: bool };
    /// Unsubscribe from one channel, or from all of them with `None`.
    unsubscribe, unsubscribe_with, unsubscribe_async => Unsubscribe { channel: Option<String> };
    publish, publish_with, publish_async => Publish { channel: String, data: Value };

    /// Store `value` under `key`.
    set, set_with, set_async => Set { key: Value, value: Value, get_value: bool };
    get_expiry, get_expiry_with, get_expiry_async => GetExpiry { key: Value };
    /// Append `value` to the collection at `key`.
    add, add_with, add_async => Add { key: Value, value: Value, get_value: bool };
    concat, concat_with, concat_async => Concat { key: Value, value: Value, get_value: bool };
    get, get_with, get_async => Get { key: Value };
    /// Read a slice of the collection at `key`; `to` is exclusive.
    get_range, get_range_with, get_range_async => GetRange { key: Value, from: i64, to: Option<i64> };
    get_all, get_all_with, get_all_async => GetAll {};
    count, count_with, count_async => Count { key: Value };

    register_death_query, register_death_query_with, register_death_query_async => RegisterDeathQuery { query: String, data: Value };
    exec, exec_with, exec_async => Exec { query: String, data: Value };
    query, query_with, query_async => Query { query: String, data: Value };

    remove, remove_with, remove_async => Remove { key: Value, get_value: bool };
    remove_range, remove_range_with, remove_range_async => RemoveRange { key: Value, from: i64, to: Option<i64>, get_value: bool };
    remove_all, remove_all_with, remove_all_async => RemoveAll {};
    splice, splice_with, splice_async => Splice { key: Value, index: i64, count: Option<i64>, items: Vec<Value> };
    pop, pop_with, pop_async => Pop { key: Value, get_value: bool };
    has_key, has_key_with, has_key_async => HasKey { key: Value };

    /// Send a raw message to the broker process.
    send, send_with, send_async => Send { data: Value };
    /// Close the shard connections.
    end, end_with, end_async => End {};
}
