use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::paths::StorePath;
use crate::store::{DocumentStore, WatchGuard};

// ─── Subscription ─────────────────────────────────────────────────────────

/// A live, lazy, never-ending stream of snapshots from the store.
///
/// Backed by a Tokio mpsc channel fed by a background task. The task emits
/// the current snapshot first, then a fresh snapshot each time a relevant
/// path changes. Consecutive identical snapshots are collapsed.
///
/// Dropping the subscription (or calling [`Subscription::cancel`]) aborts the
/// task and releases its slot on the store. A cancelled subscription cannot
/// be restarted; subscribe again instead.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    task: JoinHandle<()>,
    _guard: WatchGuard,
}

impl<T> Subscription<T> {
    pub fn cancel(self) {
        drop(self);
    }

    /// Wait for the next snapshot.
    pub async fn next_snapshot(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Snapshot loop ────────────────────────────────────────────────────────

/// Start a subscription that re-runs `load` against `store` whenever a path
/// accepted by `relevant` is written. `scope` is the subtree the
/// subscription reads from.
///
/// `load` runs on the blocking pool. A failing load is logged and skipped,
/// so subscribers keep the last good snapshot.
pub(crate) fn watch_snapshots<T, F, L>(
    store: Arc<dyn DocumentStore>,
    label: &'static str,
    scope: StorePath,
    relevant: F,
    load: L,
) -> Subscription<T>
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn(&StorePath) -> bool + Send + 'static,
    L: Fn(&dyn DocumentStore) -> Result<T> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    // Attach to the change feed before the first load so nothing written
    // in between is missed.
    let (mut changes, guard) = store.notifier().watch(scope);
    let load = Arc::new(load);

    let task = tokio::spawn(async move {
        let mut last: Option<T> = None;
        loop {
            let store = Arc::clone(&store);
            let load = Arc::clone(&load);
            match tokio::task::spawn_blocking(move || load(store.as_ref())).await {
                Ok(Ok(snapshot)) => {
                    if last.as_ref() != Some(&snapshot) {
                        if tx.send(snapshot.clone()).await.is_err() {
                            break; // Receiver dropped
                        }
                        last = Some(snapshot);
                    }
                }
                Ok(Err(e)) => tracing::error!(subscription = label, "sync error: {e}"),
                Err(e) => tracing::error!(subscription = label, "snapshot task failed: {e}"),
            }

            loop {
                match changes.recv().await {
                    Ok(path) if relevant(&path) => break,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(subscription = label, skipped = n, "coalescing missed changes");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    });

    Subscription {
        rx,
        task,
        _guard: guard,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
