//! Live view of one signed-in user: latest schema, latest logs, derived
//! progress.

use crate::aggregate::{aggregate, Progress};
use crate::context::{ClientContext, SignedIn};
use crate::error::Result;
use crate::identity::Identity;
use crate::log::LogEntry;
use crate::review::ReviewDraft;
use crate::schema::{Schema, SchemaEdit};
use crate::subscription::Subscription;
use std::sync::Arc;

/// What changed on the last [`Session::next_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Schema,
    Logs,
}

enum Next {
    Schema(Option<Schema>),
    Logs(Option<Vec<LogEntry>>),
}

pub struct Session {
    context: Arc<ClientContext>,
    identity: Identity,
    schema_sub: Option<Subscription<Schema>>,
    logs_sub: Option<Subscription<Vec<LogEntry>>>,
    schema: Schema,
    logs: Vec<LogEntry>,
    loading: bool,
}

async fn recv<T>(sub: &mut Option<Subscription<T>>) -> Option<T> {
    match sub {
        Some(sub) => sub.next_snapshot().await,
        None => std::future::pending().await,
    }
}

impl Session {
    /// Subscribe to the schema and the log. Must run inside a Tokio runtime.
    pub fn start(signed: SignedIn) -> Self {
        let SignedIn { context, identity } = signed;
        let schema_sub = context.schemas().subscribe(&identity);
        let logs_sub = context.logs().subscribe(&identity);
        tracing::info!(%identity, "session started");
        Self {
            context,
            identity,
            schema_sub: Some(schema_sub),
            logs_sub: Some(logs_sub),
            schema: Schema::default(),
            logs: Vec::new(),
            loading: true,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    /// Latest schema; the default tree until the first snapshot arrives.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// True until the first log snapshot has arrived.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> Progress {
        aggregate(&self.schema, &self.logs)
    }

    /// Wait for the next snapshot from either subscription and fold it into
    /// the session. `None` once both streams have ended.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if self.schema_sub.is_none() && self.logs_sub.is_none() {
                return None;
            }
            let next = tokio::select! {
                s = recv(&mut self.schema_sub) => Next::Schema(s),
                l = recv(&mut self.logs_sub) => Next::Logs(l),
            };
            match next {
                Next::Schema(Some(schema)) => {
                    self.schema = schema;
                    return Some(SessionEvent::Schema);
                }
                Next::Logs(Some(logs)) => {
                    self.logs = logs;
                    self.loading = false;
                    return Some(SessionEvent::Logs);
                }
                Next::Schema(None) => self.schema_sub = None,
                Next::Logs(None) => self.logs_sub = None,
            }
        }
    }

    /// Apply `edit` to the local schema and write the whole tree. A failed
    /// write leaves the local edit in place; the next snapshot from the
    /// store overrides it.
    pub async fn edit(&mut self, edit: SchemaEdit) -> Result<()> {
        self.schema.apply(edit)?;
        self.context.schemas().replace(&self.identity, &self.schema).await
    }

    pub async fn submit(&self, draft: &mut ReviewDraft) -> Result<String> {
        draft.submit(&self.context.logs(), &self.identity).await
    }

    /// Cancel both subscriptions.
    pub fn shutdown(mut self) {
        if let Some(sub) = self.schema_sub.take() {
            sub.cancel();
        }
        if let Some(sub) = self.logs_sub.take() {
            sub.cancel();
        }
        tracing::info!(identity = %self.identity, "session closed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
