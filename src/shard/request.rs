//! Typed operations forwarded to shards

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Every operation the cluster forwards to a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    Subscribe,
    IsSubscribed,
    Unsubscribe,
    Publish,
    Set,
    GetExpiry,
    Add,
    Concat,
    Get,
    GetRange,
    GetAll,
    Count,
    RegisterDeathQuery,
    Exec,
    Query,
    Remove,
    RemoveRange,
    RemoveAll,
    Splice,
    Pop,
    HasKey,
    Send,
    End,
    Expire,
    Unexpire,
}

impl Method {
    /// Operations routed one key at a time through the direct dispatcher
    pub const PASSTHROUGH: [Method; 23] = [
        Method::Subscribe,
        Method::IsSubscribed,
        Method::Unsubscribe,
        Method::Publish,
        Method::Set,
        Method::GetExpiry,
        Method::Add,
        Method::Concat,
        Method::Get,
        Method::GetRange,
        Method::GetAll,
        Method::Count,
        Method::RegisterDeathQuery,
        Method::Exec,
        Method::Query,
        Method::Remove,
        Method::RemoveRange,
        Method::RemoveAll,
        Method::Splice,
        Method::Pop,
        Method::HasKey,
        Method::Send,
        Method::End,
    ];

    /// Operations taking a key set, grouped per shard before dispatch
    pub const BATCH: [Method; 2] = [Method::Expire, Method::Unexpire];

    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Subscribe => "subscribe",
            Method::IsSubscribed => "isSubscribed",
            Method::Unsubscribe => "unsubscribe",
            Method::Publish => "publish",
            Method::Set => "set",
            Method::GetExpiry => "getExpiry",
            Method::Add => "add",
            Method::Concat => "concat",
            Method::Get => "get",
            Method::GetRange => "getRange",
            Method::GetAll => "getAll",
            Method::Count => "count",
            Method::RegisterDeathQuery => "registerDeathQuery",
            Method::Exec => "exec",
            Method::Query => "query",
            Method::Remove => "remove",
            Method::RemoveRange => "removeRange",
            Method::RemoveAll => "removeAll",
            Method::Splice => "splice",
            Method::Pop => "pop",
            Method::HasKey => "hasKey",
            Method::Send => "send",
            Method::End => "end",
            Method::Expire => "expire",
            Method::Unexpire => "unexpire",
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Method::Expire | Method::Unexpire)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation with its concrete arguments.
///
/// Keys are key chains as the broker understands them: a string or an array
/// of path segments. The first argument of each variant is its routing key.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Subscribe { channel: String },
    IsSubscribed { channel: String, include_pending: bool },
    Unsubscribe { channel: Option<String> },
    Publish { channel: String, data: Value },
    Set { key: Value, value: Value, get_value: bool },
    GetExpiry { key: Value },
    Add { key: Value, value: Value, get_value: bool },
    Concat { key: Value, value: Value, get_value: bool },
    Get { key: Value },
    GetRange { key: Value, from: i64, to: Option<i64> },
    GetAll,
    Count { key: Value },
    RegisterDeathQuery { query: String, data: Value },
    Exec { query: String, data: Value },
    Query { query: String, data: Value },
    Remove { key: Value, get_value: bool },
    RemoveRange { key: Value, from: i64, to: Option<i64>, get_value: bool },
    RemoveAll,
    Splice { key: Value, index: i64, count: Option<i64>, items: Vec<Value> },
    Pop { key: Value, get_value: bool },
    HasKey { key: Value },
    Send { data: Value },
    End,
    Expire { keys: Vec<Value>, ttl: u64 },
    Unexpire { keys: Vec<Value> },
}

impl Request {
    pub fn method(&self) -> Method {
        match self {
            Request::Subscribe { .. } => Method::Subscribe,
            Request::IsSubscribed { .. } => Method::IsSubscribed,
            Request::Unsubscribe { .. } => Method::Unsubscribe,
            Request::Publish { .. } => Method::Publish,
            Request::Set { .. } => Method::Set,
            Request::GetExpiry { .. } => Method::GetExpiry,
            Request::Add { .. } => Method::Add,
            Request::Concat { .. } => Method::Concat,
            Request::Get { .. } => Method::Get,
            Request::GetRange { .. } => Method::GetRange,
            Request::GetAll => Method::GetAll,
            Request::Count { .. } => Method::Count,
            Request::RegisterDeathQuery { .. } => Method::RegisterDeathQuery,
            Request::Exec { .. } => Method::Exec,
            Request::Query { .. } => Method::Query,
            Request::Remove { .. } => Method::Remove,
            Request::RemoveRange { .. } => Method::RemoveRange,
            Request::RemoveAll => Method::RemoveAll,
            Request::Splice { .. } => Method::Splice,
            Request::Pop { .. } => Method::Pop,
            Request::HasKey { .. } => Method::HasKey,
            Request::Send { .. } => Method::Send,
            Request::End => Method::End,
            Request::Expire { .. } => Method::Expire,
            Request::Unexpire { .. } => Method::Unexpire,
        }
    }

    /// The first argument, handed to the mapper.
    ///
    /// `Null` for operations without one (`getAll`, `removeAll`, `end`, and
    /// `unsubscribe` from every channel). Batch requests route per key, so
    /// their routing key is the whole key list.
    pub fn routing_key(&self) -> Value {
        match self {
            Request::Subscribe { channel }
            | Request::IsSubscribed { channel, .. }
            | Request::Publish { channel, .. } => Value::String(channel.clone()),
            Request::Unsubscribe { channel } => {
                channel.clone().map(Value::String).unwrap_or(Value::Null)
            }
            Request::Set { key, .. }
            | Request::GetExpiry { key }
            | Request::Add { key, .. }
            | Request::Concat { key, .. }
            | Request::Get { key }
            | Request::GetRange { key, .. }
            | Request::Count { key }
            | Request::Remove { key, .. }
            | Request::RemoveRange { key, .. }
            | Request::Splice { key, .. }
            | Request::Pop { key, .. }
            | Request::HasKey { key } => key.clone(),
            Request::RegisterDeathQuery { query, .. }
            | Request::Exec { query, .. }
            | Request::Query { query, .. } => Value::String(query.clone()),
            Request::Send { data } => data.clone(),
            Request::GetAll | Request::RemoveAll | Request::End => Value::Null,
            Request::Expire { keys, .. } | Request::Unexpire { keys } => Value::Array(keys.clone()),
        }
    }

    /// Keys of a batch request; empty for every other operation
    pub fn batch_keys(&self) -> &[Value] {
        match self {
            Request::Expire { keys, .. } | Request::Unexpire { keys } => keys,
            _ => &[],
        }
    }

    /// Same batch operation with its key set replaced, keeping every other
    /// argument. Non-batch requests are returned unchanged.
    pub(crate) fn with_keys(&self, bucket: Vec<Value>) -> Request {
        match self {
            Request::Expire { ttl, .. } => Request::Expire {
                keys: bucket,
                ttl: *ttl,
            },
            Request::Unexpire { .. } => Request::Unexpire { keys: bucket },
            other => other.clone(),
        }
    }
}
