//! Schemaless document store.
//!
//! Documents are JSON values addressed by [`StorePath`]. Collections are the
//! parent path of their documents. Every write publishes the written path on
//! a broadcast channel; live subscriptions re-read what they care about when
//! a matching path comes through.
//!
//! Operations are synchronous; async callers run them on the blocking pool.

pub mod file;
pub mod memory;

use crate::error::{Result, RuleError};
use crate::paths::StorePath;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub use file::FileStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Server-assigned values
// ---------------------------------------------------------------------------

const SERVER_KEY: &str = "$server";
const SERVER_TIMESTAMP: &str = "timestamp";

/// Placeholder for a field the store stamps with its own clock at write time.
pub fn server_timestamp() -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert(SERVER_KEY.to_string(), Value::String(SERVER_TIMESTAMP.to_string()));
    Value::Object(obj)
}

fn is_server_timestamp(v: &Value) -> bool {
    v.get(SERVER_KEY).and_then(Value::as_str) == Some(SERVER_TIMESTAMP)
}

/// Store clock. Never hands out the same instant twice, so ordering by
/// timestamp is total even for writes within one clock tick.
#[derive(Debug, Default)]
pub struct ServerClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ServerClock {
    pub fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }

    /// Replace top-level placeholders in `data` with the current instant.
    pub fn resolve(&self, data: &mut Value) {
        let Some(obj) = data.as_object_mut() else {
            return;
        };
        let mut stamp = None;
        for value in obj.values_mut() {
            if is_server_timestamp(value) {
                let ts = *stamp.get_or_insert_with(|| self.now());
                *value = Value::String(ts.to_rfc3339());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Change fan-out
// ---------------------------------------------------------------------------

type Scopes = Arc<Mutex<HashMap<StorePath, usize>>>;

/// Handle that counts as one live subscription until dropped.
#[derive(Debug)]
pub struct WatchGuard {
    scope: StorePath,
    scopes: Scopes,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        let mut scopes = self.scopes.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(n) = scopes.get_mut(&self.scope) {
            *n -= 1;
            if *n == 0 {
                scopes.remove(&self.scope);
            }
        }
    }
}

/// Change feed for one store instance. Each watcher registers the subtree
/// it cares about so pollers can limit their work to live scopes.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<StorePath>,
    scopes: Scopes,
}

impl Default for Notifier {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            scopes: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Notifier {
    pub fn notify(&self, path: &StorePath) {
        // No receivers is fine: nobody is subscribed.
        let _ = self.tx.send(path.clone());
    }

    /// Attach to the feed, registering interest in paths under `scope`.
    /// Every write is still delivered; the scope only bounds polling.
    pub fn watch(&self, scope: StorePath) -> (broadcast::Receiver<StorePath>, WatchGuard) {
        let mut scopes = self.scopes.lock().unwrap_or_else(|p| p.into_inner());
        *scopes.entry(scope.clone()).or_insert(0) += 1;
        let guard = WatchGuard {
            scope,
            scopes: Arc::clone(&self.scopes),
        };
        (self.tx.subscribe(), guard)
    }

    pub fn active(&self) -> usize {
        let scopes = self.scopes.lock().unwrap_or_else(|p| p.into_inner());
        scopes.values().sum()
    }

    /// Distinct scopes with at least one live watcher.
    pub fn scopes(&self) -> Vec<StorePath> {
        let scopes = self.scopes.lock().unwrap_or_else(|p| p.into_inner());
        scopes.keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` when it does not exist.
    fn get(&self, path: &StorePath) -> Result<Option<Value>>;

    /// Create or fully overwrite one document.
    fn set(&self, path: &StorePath, data: Value) -> Result<()>;

    /// Create a document with a store-assigned id inside `collection`.
    /// Server-timestamp placeholders are resolved. Returns the new id.
    fn add(&self, collection: &StorePath, data: Value) -> Result<String>;

    /// All documents directly inside `collection`, in no particular order.
    fn list(&self, collection: &StorePath) -> Result<Vec<Document>>;

    fn notifier(&self) -> &Notifier;

    /// Number of subscriptions currently attached to this store.
    fn active_subscriptions(&self) -> usize {
        self.notifier().active()
    }
}

pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Run store operations on the blocking pool so async callers never wait
/// on store I/O from a runtime thread.
pub(crate) async fn run_blocking<T, F>(store: &Arc<dyn DocumentStore>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn DocumentStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| RuleError::StoreUnavailable(format!("store task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
