//! Schema document access for one app.
//!
//! Writes always replace the whole document: no field merge, no version
//! check, the last writer wins. Two editors changing different fields at
//! the same time will silently lose one of the edits. Everything goes
//! through [`SchemaRepository::replace`] so a patching or versioned write
//! can be swapped in without touching callers.

use crate::error::Result;
use crate::identity::Identity;
use crate::paths::{self, StorePath};
use crate::schema::{Schema, SchemaEdit};
use crate::store::{run_blocking, DocumentStore};
use crate::subscription::{watch_snapshots, Subscription};
use std::sync::Arc;

#[derive(Clone)]
pub struct SchemaRepository {
    store: Arc<dyn DocumentStore>,
    app_id: String,
}

/// Read the schema document, writing the default tree first when absent.
fn load_or_seed(store: &dyn DocumentStore, path: &StorePath) -> Result<Schema> {
    match store.get(path)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => {
            let schema = Schema::default();
            store.set(path, serde_json::to_value(&schema)?)?;
            tracing::info!(%path, "seeded default schema");
            Ok(schema)
        }
    }
}

impl SchemaRepository {
    pub fn new(store: Arc<dyn DocumentStore>, app_id: impl Into<String>) -> Self {
        Self {
            store,
            app_id: app_id.into(),
        }
    }

    fn path(&self, identity: &Identity) -> StorePath {
        paths::schema_doc(&self.app_id, identity.as_str())
    }

    /// Live schema for `identity`. The first snapshot seeds the default tree
    /// if the document does not exist yet.
    pub fn subscribe(&self, identity: &Identity) -> Subscription<Schema> {
        let path = self.path(identity);
        let watched = path.clone();
        watch_snapshots(
            Arc::clone(&self.store),
            "schema",
            paths::user_root(&self.app_id, identity.as_str()),
            move |changed| *changed == watched,
            move |store| load_or_seed(store, &path),
        )
    }

    /// One-shot read with the same seeding rule as [`Self::subscribe`].
    pub async fn current(&self, identity: &Identity) -> Result<Schema> {
        let path = self.path(identity);
        run_blocking(&self.store, move |store| load_or_seed(store, &path)).await
    }

    /// Overwrite the whole schema document.
    pub async fn replace(&self, identity: &Identity, schema: &Schema) -> Result<()> {
        schema.validate()?;
        let path = self.path(identity);
        let value = serde_json::to_value(schema)?;
        let result = run_blocking(&self.store, move |store| store.set(&path, value)).await;
        if let Err(e) = &result {
            tracing::error!(%identity, "schema write failed: {e}");
        }
        result
    }

    /// Load the current schema, apply `edit`, and replace the whole document.
    /// Returns the written schema and whatever `edit` returned.
    pub async fn update<R, F>(&self, identity: &Identity, edit: F) -> Result<(Schema, R)>
    where
        F: FnOnce(&mut Schema) -> Result<R> + Send,
        R: Send,
    {
        let mut schema = self.current(identity).await?;
        let out = edit(&mut schema)?;
        self.replace(identity, &schema).await?;
        Ok((schema, out))
    }

    pub async fn apply(&self, identity: &Identity, edit: SchemaEdit) -> Result<Schema> {
        let (schema, ()) = self.update(identity, |s| s.apply(edit)).await?;
        Ok(schema)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
