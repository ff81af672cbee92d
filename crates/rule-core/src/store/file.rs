//! Directory-backed store.
//!
//! Layout:
//!   <root>/<segment>/.../<doc>.json  : one JSON file per document
//!
//! A collection is the directory holding its documents. Writes go through
//! [`io::atomic_write`]. While at least one subscription is live, a poller
//! compares file modification times every [`POLL_INTERVAL`] so that writes
//! made by other processes reach subscribers too. Only the subtrees that
//! live subscriptions registered are scanned.

use super::{new_document_id, Document, DocumentStore, Notifier, ServerClock};
use crate::error::{Result, RuleError};
use crate::io;
use crate::paths::StorePath;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

pub const POLL_INTERVAL: Duration = Duration::from_millis(800);

const EXT: &str = "json";

#[derive(Debug)]
struct Inner {
    root: PathBuf,
    clock: ServerClock,
    notifier: Notifier,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Inside a Tokio runtime this also starts the cross-process change
    /// poller; it stops once the last handle to the store is dropped.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let store = Self {
            inner: Arc::new(Inner {
                root,
                clock: ServerClock::default(),
                notifier: Notifier::default(),
            }),
        };
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(poll_changes(Arc::downgrade(&store.inner)));
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn dir_path(&self, path: &StorePath) -> Result<PathBuf> {
        path.check_segments()?;
        let mut p = self.inner.root.clone();
        for s in path.segments() {
            p.push(s);
        }
        Ok(p)
    }

    fn doc_path(&self, path: &StorePath) -> Result<PathBuf> {
        let mut p = self.dir_path(path)?;
        p.set_extension(EXT);
        Ok(p)
    }
}

/// Permission problems get their own variant so callers can tell them
/// apart from a missing or broken store.
fn classify(err: RuleError, file: &Path) -> RuleError {
    match err {
        RuleError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            RuleError::PermissionDenied(file.display().to_string())
        }
        other => other,
    }
}

impl DocumentStore for FileStore {
    fn get(&self, path: &StorePath) -> Result<Option<Value>> {
        let file = self.doc_path(path)?;
        io::read_json(&file).map_err(|e| classify(e, &file))
    }

    fn set(&self, path: &StorePath, data: Value) -> Result<()> {
        let file = self.doc_path(path)?;
        io::atomic_write(&file, &serde_json::to_vec_pretty(&data)?).map_err(|e| classify(e, &file))?;
        self.inner.notifier.notify(path);
        Ok(())
    }

    fn add(&self, collection: &StorePath, mut data: Value) -> Result<String> {
        let id = new_document_id();
        let path = collection.child(id.clone());
        self.inner.clock.resolve(&mut data);
        let file = self.doc_path(&path)?;
        io::atomic_write(&file, &serde_json::to_vec_pretty(&data)?).map_err(|e| classify(e, &file))?;
        self.inner.notifier.notify(&path);
        Ok(id)
    }

    fn list(&self, collection: &StorePath) -> Result<Vec<Document>> {
        let dir = self.dir_path(collection)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut docs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = std::fs::read(&path)?;
            match serde_json::from_slice(&bytes) {
                Ok(data) => docs.push(Document {
                    id: id.to_string(),
                    data,
                }),
                Err(e) => tracing::warn!(path = %path.display(), "unreadable document: {e}"),
            }
        }
        Ok(docs)
    }

    fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}

// ---------------------------------------------------------------------------
// Cross-process change detection
// ---------------------------------------------------------------------------

/// Snapshot of every document file under the given scopes of `root` and
/// its modification time.
fn scan(root: &Path, scopes: &[StorePath]) -> HashMap<PathBuf, SystemTime> {
    let mut out = HashMap::new();
    let mut stack: Vec<PathBuf> = scopes
        .iter()
        .filter(|scope| scope.check_segments().is_ok())
        .map(|scope| scope.segments().iter().fold(root.to_path_buf(), |p, s| p.join(s)))
        .collect();
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some(EXT) {
                if let Ok(mtime) = meta.modified() {
                    out.insert(path, mtime);
                }
            }
        }
    }
    out
}

/// Map a document file back to its logical path.
fn store_path_for(root: &Path, file: &Path) -> Option<StorePath> {
    let rel = file.strip_prefix(root).ok()?.with_extension("");
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect::<Option<_>>()?;
    Some(StorePath::new(segments))
}

fn diff(
    before: &HashMap<PathBuf, SystemTime>,
    after: &HashMap<PathBuf, SystemTime>,
) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = after
        .iter()
        .filter(|(p, t)| before.get(*p) != Some(*t))
        .map(|(p, _)| p.clone())
        .collect();
    changed.extend(before.keys().filter(|p| !after.contains_key(*p)).cloned());
    changed
}

async fn poll_changes(inner: Weak<Inner>) {
    let mut last: Option<(Vec<StorePath>, HashMap<PathBuf, SystemTime>)> = None;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut scopes = inner.notifier.scopes();
        if scopes.is_empty() {
            last = None;
            continue;
        }
        scopes.sort();
        let root = inner.root.clone();
        let scanned = scopes.clone();
        let Ok(current) = tokio::task::spawn_blocking(move || scan(&root, &scanned)).await else {
            continue;
        };
        // A new scope starts from a fresh baseline rather than reporting
        // every file in it as changed.
        if let Some((_, before)) = last.as_ref().filter(|(prev, _)| *prev == scopes) {
            for file in diff(before, &current) {
                if let Some(path) = store_path_for(&inner.root, &file) {
                    tracing::debug!(%path, "external change");
                    inner.notifier.notify(&path);
                }
            }
        }
        last = Some((scopes, current));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::server_timestamp;
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> StorePath {
        StorePath::new(["artifacts", "app", "users", "u1", "config", "schema"])
    }

    fn user() -> StorePath {
        StorePath::new(["artifacts", "app", "users", "u1"])
    }

    fn logs() -> StorePath {
        StorePath::new(["artifacts", "app", "users", "u1", "logs"])
    }

    #[test]
    fn set_writes_json_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set(&schema(), json!({ "categories": [] })).unwrap();
        let file = dir.path().join("artifacts/app/users/u1/config/schema.json");
        assert!(file.exists());
        assert_eq!(store.get(&schema()).unwrap().unwrap()["categories"], json!([]));
    }

    #[test]
    fn add_and_list_collection() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.list(&logs()).unwrap().is_empty());
        let id = store
            .add(&logs(), json!({ "reflection": "hi", "timestamp": server_timestamp() }))
            .unwrap();
        let docs = store.list(&logs()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert!(docs[0].data["timestamp"].is_string());
    }

    #[test]
    fn second_handle_sees_writes() {
        let dir = TempDir::new().unwrap();
        let a = FileStore::open(dir.path()).unwrap();
        let b = FileStore::open(dir.path()).unwrap();
        a.set(&schema(), json!({ "v": 1 })).unwrap();
        assert_eq!(b.get(&schema()).unwrap().unwrap()["v"], 1);
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let evil = StorePath::new(["..", "escape"]);
        assert!(store.set(&evil, json!({})).is_err());
    }

    #[test]
    fn scan_diff_reports_new_and_removed() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let scopes = [user()];
        let before = scan(dir.path(), &scopes);
        store.set(&schema(), json!({})).unwrap();
        let after = scan(dir.path(), &scopes);
        let changed = diff(&before, &after);
        assert_eq!(changed.len(), 1);
        assert_eq!(store_path_for(dir.path(), &changed[0]), Some(schema()));
        let removed = diff(&after, &before);
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn scan_covers_only_watched_scopes() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set(&schema(), json!({})).unwrap();
        let other = StorePath::new(["artifacts", "app", "users", "u2", "config", "schema"]);
        store.set(&other, json!({})).unwrap();

        let seen = scan(dir.path(), &[user()]);
        assert_eq!(seen.len(), 1);
        assert!(seen.keys().all(|p| p.starts_with(dir.path().join("artifacts/app/users/u1"))));
        assert!(scan(dir.path(), &[]).is_empty());
    }

    #[tokio::test]
    async fn external_writes_are_detected() {
        let dir = TempDir::new().unwrap();
        let watcher = FileStore::open(dir.path()).unwrap();
        let (mut rx, _guard) = watcher.notifier().watch(user());

        // Let the poller take its baseline before the outside write.
        tokio::time::sleep(POLL_INTERVAL * 2).await;
        let file = dir.path().join("artifacts/app/users/u1/config/schema.json");
        io::atomic_write(&file, b"{}").unwrap();

        let path = tokio::time::timeout(POLL_INTERVAL * 4, rx.recv())
            .await
            .expect("poller should report the write")
            .unwrap();
        assert_eq!(path, schema());
    }
}
