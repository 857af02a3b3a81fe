//! Test doubles for exercising routing without a broker
//!
//! [`RecordingShard`] records every call it receives, answers with scripted
//! replies or errors, and lets tests emit events as if they came from the
//! connection. A shared [`CallJournal`] captures the cross-shard call order.

use crate::error::ShardError;
use crate::shard::{Method, Request, ShardEvent, ShardHandle};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Ordered log of `(shard label, method)` pairs shared by several shards
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<(String, Method)>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Method)> {
        self.entries.lock().clone()
    }

    fn push(&self, label: &str, method: Method) {
        self.entries.lock().push((label.to_string(), method));
    }
}

/// In-memory shard that records calls and replays scripted outcomes
pub struct RecordingShard {
    label: String,
    calls: Mutex<Vec<Request>>,
    replies: Mutex<HashMap<Method, Result<Value, ShardError>>>,
    delays: Mutex<HashMap<Method, Duration>>,
    journal: Option<CallJournal>,
    events: broadcast::Sender<ShardEvent>,
}

impl RecordingShard {
    pub fn new(label: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            label: label.into(),
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            journal: None,
            events,
        }
    }

    /// Also log calls to a journal shared with other shards
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Answer `method` with `value` instead of the default echo
    pub fn reply(self, method: Method, value: Value) -> Self {
        self.replies.lock().insert(method, Ok(value));
        self
    }

    /// Fail `method` with `err`
    pub fn fail(self, method: Method, err: ShardError) -> Self {
        self.replies.lock().insert(method, Err(err));
        self
    }

    /// Hold completion of `method` for `delay`; the call is still recorded
    /// when issued
    pub fn delay(self, method: Method, delay: Duration) -> Self {
        self.delays.lock().insert(method, delay);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Every request received, in arrival order
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Emit an event as the connection would
    pub fn emit(&self, event: ShardEvent) {
        let _ = self.events.send(event);
    }

    fn record(&self, request: &Request) -> Result<Value, ShardError> {
        let method = request.method();
        self.calls.lock().push(request.clone());
        if let Some(journal) = &self.journal {
            journal.push(&self.label, method);
        }

        match self.replies.lock().get(&method) {
            Some(outcome) => outcome.clone(),
            None => Ok(json!({ "shard": self.label, "method": method.as_str() })),
        }
    }
}

impl ShardHandle for RecordingShard {
    fn invoke(&self, request: &Request) -> Result<Value, ShardError> {
        self.record(request)
    }

    fn dispatch(&self, request: Request) -> BoxFuture<'static, Result<Value, ShardError>> {
        let outcome = self.record(&request);
        let delay = self.delays.lock().get(&request.method()).copied();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }

    fn events(&self) -> broadcast::Receiver<ShardEvent> {
        self.events.subscribe()
    }

    fn extract_keys(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    fn extract_values(&self, value: &Value) -> Vec<Value> {
        match value {
            Value::Object(map) => map.values().cloned().collect(),
            Value::Array(items) => items.clone(),
            _ => Vec::new(),
        }
    }
}
