use crate::error::{Result, RuleError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const ARTIFACTS: &str = "artifacts";
pub const USERS: &str = "users";
pub const CONFIG: &str = "config";
pub const SCHEMA_DOC: &str = "schema";
pub const LOGS: &str = "logs";

pub const DEFAULT_APP_ID: &str = "spire-rule-of-life";

// ---------------------------------------------------------------------------
// StorePath
// ---------------------------------------------------------------------------

/// Logical slash-separated location of a document or collection.
///
/// Store implementations decide how a path maps onto their own encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Parent collection of a document path.
    pub fn parent(&self) -> Option<StorePath> {
        if self.0.len() < 2 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// True when `self` equals `other` or lies beneath it.
    pub fn starts_with(&self, other: &StorePath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Reject segments that could escape a directory-backed store.
    pub fn check_segments(&self) -> Result<()> {
        for s in &self.0 {
            if s.is_empty() || s == "." || s == ".." || s.contains(['/', '\\']) {
                return Err(RuleError::InvalidId(s.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn user_root(app_id: &str, identity: &str) -> StorePath {
    StorePath::new([ARTIFACTS, app_id, USERS, identity])
}

pub fn schema_doc(app_id: &str, identity: &str) -> StorePath {
    user_root(app_id, identity).child(CONFIG).child(SCHEMA_DOC)
}

pub fn logs_collection(app_id: &str, identity: &str) -> StorePath {
    user_root(app_id, identity).child(LOGS)
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

pub const MAX_ID_LEN: usize = 128;

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").unwrap())
}

pub fn validate_id(id: &str) -> Result<()> {
    if id.len() > MAX_ID_LEN {
        return Err(RuleError::IdTooLong(id.to_string()));
    }
    if !id_re().is_match(id) {
        return Err(RuleError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
