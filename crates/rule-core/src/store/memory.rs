use super::{new_document_id, Document, DocumentStore, Notifier, ServerClock};
use crate::error::{Result, RuleError};
use crate::paths::StorePath;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-process store. Nothing survives the process.
///
/// `set_offline(true)` makes every operation fail with
/// [`RuleError::StoreUnavailable`], which is how connectivity loss is
/// exercised in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<StorePath, Value>>,
    clock: ServerClock,
    notifier: Notifier,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RuleError::StoreUnavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, path: &StorePath) -> Result<Option<Value>> {
        self.check_online()?;
        let docs = self.docs.read().unwrap_or_else(|p| p.into_inner());
        Ok(docs.get(path).cloned())
    }

    fn set(&self, path: &StorePath, data: Value) -> Result<()> {
        self.check_online()?;
        {
            let mut docs = self.docs.write().unwrap_or_else(|p| p.into_inner());
            docs.insert(path.clone(), data);
        }
        self.notifier.notify(path);
        Ok(())
    }

    fn add(&self, collection: &StorePath, mut data: Value) -> Result<String> {
        self.check_online()?;
        let id = new_document_id();
        let path = collection.child(id.clone());
        self.clock.resolve(&mut data);
        {
            let mut docs = self.docs.write().unwrap_or_else(|p| p.into_inner());
            docs.insert(path.clone(), data);
        }
        self.notifier.notify(&path);
        Ok(id)
    }

    fn list(&self, collection: &StorePath) -> Result<Vec<Document>> {
        self.check_online()?;
        let depth = collection.segments().len() + 1;
        let docs = self.docs.read().unwrap_or_else(|p| p.into_inner());
        Ok(docs
            .range(collection.clone()..)
            .take_while(|(path, _)| path.starts_with(collection))
            .filter(|(path, _)| path.segments().len() == depth)
            .map(|(path, data)| Document {
                id: path.segments()[depth - 1].clone(),
                data: data.clone(),
            })
            .collect())
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::server_timestamp;
    use serde_json::json;

    fn logs() -> StorePath {
        StorePath::new(["artifacts", "app", "users", "u1", "logs"])
    }

    #[test]
    fn set_then_get() {
        let store = MemoryStore::new();
        let path = StorePath::new(["a", "b"]);
        assert!(store.get(&path).unwrap().is_none());
        store.set(&path, json!({ "x": 1 })).unwrap();
        assert_eq!(store.get(&path).unwrap().unwrap()["x"], 1);
        store.set(&path, json!({ "y": 2 })).unwrap();
        let doc = store.get(&path).unwrap().unwrap();
        assert!(doc.get("x").is_none(), "set is a full overwrite");
    }

    #[test]
    fn add_assigns_unique_ids_and_stamps() {
        let store = MemoryStore::new();
        let a = store.add(&logs(), json!({ "timestamp": server_timestamp() })).unwrap();
        let b = store.add(&logs(), json!({ "timestamp": server_timestamp() })).unwrap();
        assert_ne!(a, b);
        let docs = store.list(&logs()).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.data["timestamp"].is_string()));
    }

    #[test]
    fn list_is_scoped_to_direct_children() {
        let store = MemoryStore::new();
        store.add(&logs(), json!({})).unwrap();
        store
            .set(&StorePath::new(["artifacts", "app", "users", "u2", "logs", "z"]), json!({}))
            .unwrap();
        store
            .set(&logs().child("nested").child("deeper"), json!({}))
            .unwrap();
        assert_eq!(store.list(&logs()).unwrap().len(), 1);
    }

    #[test]
    fn offline_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let path = StorePath::new(["a", "b"]);
        assert!(matches!(store.get(&path), Err(RuleError::StoreUnavailable(_))));
        assert!(store.set(&path, json!({})).is_err());
        assert!(store.add(&logs(), json!({})).is_err());
        store.set_offline(false);
        assert!(store.get(&path).unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_are_published() {
        let store = MemoryStore::new();
        let (mut rx, _guard) = store.notifier().watch(StorePath::new(["a"]));
        let path = StorePath::new(["a", "b"]);
        store.set(&path, json!({})).unwrap();
        assert_eq!(rx.recv().await.unwrap(), path);
    }
}
