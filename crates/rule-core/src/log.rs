//! Review log entries.
//!
//! Entries are immutable once written. Ordering is by server timestamp,
//! newest first; entries whose timestamp has not been resolved sort as if
//! stamped at the epoch.

use crate::error::Result;
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-habit counts keyed by habit id.
pub type Counts = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_counts")]
    pub data: Counts,
    #[serde(default)]
    pub reflection: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Stored fields of a log document; the id lives on the document itself.
#[derive(Debug, Deserialize)]
struct LogFields {
    #[serde(default, deserialize_with = "lenient_counts")]
    data: Counts,
    #[serde(default)]
    reflection: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    timestamp: Option<DateTime<Utc>>,
}

/// Anything that is not an RFC 3339 string (a pending server-timestamp
/// placeholder, null, a number) reads as unresolved.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

/// Decode each count on its own. Integral floats are accepted; a negative,
/// fractional or non-numeric count drops that habit only.
fn lenient_counts<'de, D>(deserializer: D) -> std::result::Result<Counts, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(map)) = value else {
        return Ok(Counts::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(habit, raw)| match count_from_value(&raw) {
            Some(n) => Some((habit, n)),
            None => {
                tracing::warn!(%habit, value = %raw, "ignoring unusable count");
                None
            }
        })
        .collect())
}

fn count_from_value(value: &serde_json::Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
        Some(f as u32)
    } else {
        None
    }
}

impl LogEntry {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let fields: LogFields = serde_json::from_value(doc.data.clone())?;
        Ok(Self {
            id: doc.id.clone(),
            data: fields.data,
            reflection: fields.reflection,
            timestamp: fields.timestamp,
        })
    }

    pub fn count(&self, habit: &str) -> u32 {
        self.data.get(habit).copied().unwrap_or(0)
    }

    fn sort_key(&self) -> i64 {
        self.timestamp.map(|t| t.timestamp_micros()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Sort newest first. Unresolved timestamps go last; ties break on id so the
/// order is stable across snapshots.
pub fn sort_newest_first(entries: &mut [LogEntry]) {
    entries.sort_by(|a, b| {
        b.sort_key()
            .cmp(&a.sort_key())
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Convert raw collection documents into sorted entries, skipping (and
/// logging) any document that does not parse.
pub fn entries_from_documents(docs: &[Document]) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = docs
        .iter()
        .filter_map(|doc| match LogEntry::from_document(doc) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(id = %doc.id, "skipping malformed log entry: {e}");
                None
            }
        })
        .collect();
    sort_newest_first(&mut entries);
    entries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
