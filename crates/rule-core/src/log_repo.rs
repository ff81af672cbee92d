//! Append-only review log for one app.

use crate::error::Result;
use crate::identity::Identity;
use crate::log::{entries_from_documents, Counts, LogEntry};
use crate::paths::{self, StorePath};
use crate::store::{run_blocking, server_timestamp, DocumentStore};
use crate::subscription::{watch_snapshots, Subscription};
use std::sync::Arc;

#[derive(Clone)]
pub struct LogRepository {
    store: Arc<dyn DocumentStore>,
    app_id: String,
}

impl LogRepository {
    pub fn new(store: Arc<dyn DocumentStore>, app_id: impl Into<String>) -> Self {
        Self {
            store,
            app_id: app_id.into(),
        }
    }

    fn collection(&self, identity: &Identity) -> StorePath {
        paths::logs_collection(&self.app_id, identity.as_str())
    }

    /// Live log for `identity`, newest first, re-emitted in full on every
    /// append (including this process's own).
    pub fn subscribe(&self, identity: &Identity) -> Subscription<Vec<LogEntry>> {
        let collection = self.collection(identity);
        let watched = collection.clone();
        watch_snapshots(
            Arc::clone(&self.store),
            "logs",
            paths::user_root(&self.app_id, identity.as_str()),
            move |changed| changed.parent().as_ref() == Some(&watched),
            move |store| Ok(entries_from_documents(&store.list(&collection)?)),
        )
    }

    /// One-shot read, newest first.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<LogEntry>> {
        let collection = self.collection(identity);
        run_blocking(&self.store, move |store| {
            Ok(entries_from_documents(&store.list(&collection)?))
        })
        .await
    }

    /// Record one review. The store assigns the id and the timestamp.
    pub async fn append(&self, identity: &Identity, data: Counts, reflection: String) -> Result<String> {
        let collection = self.collection(identity);
        let doc = serde_json::json!({
            "data": data,
            "reflection": reflection,
            "timestamp": server_timestamp(),
        });
        let result = run_blocking(&self.store, move |store| store.add(&collection, doc)).await;
        match &result {
            Ok(id) => tracing::debug!(%identity, %id, "review recorded"),
            Err(e) => tracing::error!(%identity, "review write failed: {e}"),
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::store::{FileStore, MemoryStore};
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    fn counts(pairs: &[(&str, u32)]) -> Counts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn empty_log_emits_empty_snapshot() {
        let repo = LogRepository::new(Arc::new(MemoryStore::new()), "app");
        let mut sub = repo.subscribe(&Identity::new("u1"));
        assert!(sub.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_arrive_newest_first() {
        let repo = LogRepository::new(Arc::new(MemoryStore::new()), "app");
        let me = Identity::new("u1");
        let mut sub = repo.subscribe(&me);
        assert!(sub.next().await.unwrap().is_empty());

        let mut ids = Vec::new();
        for n in 1..=3u32 {
            ids.push(repo.append(&me, counts(&[("s1", n)]), format!("day {n}")).await.unwrap());
        }

        let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let s = sub.next().await.unwrap();
                if s.len() == 3 {
                    break s;
                }
            }
        })
        .await
        .unwrap();
        let got: Vec<&str> = snapshot.iter().map(|e| e.id.as_str()).collect();
        let want: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
        assert_eq!(got, want);
        assert_eq!(snapshot[0].reflection, "day 3");
        assert!(snapshot.iter().all(|e| e.timestamp.is_some()));
    }

    #[tokio::test]
    async fn unresolved_timestamps_sort_last() {
        let store = Arc::new(MemoryStore::new());
        let repo = LogRepository::new(store.clone(), "app");
        let me = Identity::new("u1");
        let logs = paths::logs_collection("app", "u1");
        store
            .set(&logs.child("imported"), json!({ "data": { "s1": 1 }, "reflection": "" }))
            .unwrap();
        let fresh = repo.append(&me, counts(&[("s1", 1)]), String::new()).await.unwrap();

        let entries = repo.list(&me).await.unwrap();
        assert_eq!(entries[0].id, fresh);
        assert_eq!(entries[1].id, "imported");
        assert!(entries[1].timestamp.is_none());
    }

    #[tokio::test]
    async fn other_identity_appends_are_not_seen() {
        let repo = LogRepository::new(Arc::new(MemoryStore::new()), "app");
        let mut sub = repo.subscribe(&Identity::new("u1"));
        assert!(sub.next().await.unwrap().is_empty());
        repo.append(&Identity::new("u2"), Counts::new(), String::new())
            .await
            .unwrap();
        let res = tokio::time::timeout(Duration::from_millis(100), sub.next()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn append_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let repo = LogRepository::new(store.clone(), "app");
        store.set_offline(true);
        let err = repo
            .append(&Identity::new("u1"), Counts::new(), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuleError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn file_store_log_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = LogRepository::new(Arc::new(FileStore::open(dir.path()).unwrap()), "app");
        let me = Identity::new("u1");
        repo.append(&me, counts(&[("p1", 2)]), "legs".into()).await.unwrap();
        let entries = repo.list(&me).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].count("p1"), 2);
    }
}
