//! Sign-in.
//!
//! Layout (local provider):
//!   <dir>/identity.yaml  : this device's anonymous identity
//!   <dir>/tokens.yaml    : issued sign-in tokens
//!
//! Bootstrap order: configured token first, anonymous on rejection or when
//! no token is configured. The first identity obtained is kept for the
//! process lifetime.

use crate::error::{Result, RuleError};
use crate::io;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque per-user key scoping every stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn generate() -> Self {
        Self(format!("anon-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub trait IdentityProvider: Send + Sync {
    fn sign_in_with_token(&self, token: &str) -> Result<Identity>;
    fn sign_in_anonymously(&self) -> Result<Identity>;
    /// Mint a token that signs in as `identity` elsewhere.
    fn issue_token(&self, identity: &Identity) -> Result<String>;
}

fn new_token() -> String {
    format!("rol_{}", Uuid::new_v4().simple())
}

/// Try `token`, then anonymous. `None` when every method failed.
pub async fn sign_in(provider: Arc<dyn IdentityProvider>, token: Option<String>) -> Option<Identity> {
    let result = tokio::task::spawn_blocking(move || {
        if let Some(token) = token {
            match provider.sign_in_with_token(&token) {
                Ok(identity) => return Ok(identity),
                Err(e) => tracing::warn!("bootstrap credential rejected, signing in anonymously: {e}"),
            }
        }
        provider.sign_in_anonymously()
    })
    .await;

    match result {
        Ok(Ok(identity)) => {
            tracing::info!(%identity, "signed in");
            Some(identity)
        }
        Ok(Err(e)) => {
            tracing::error!("sign-in failed: {e}");
            None
        }
        Err(e) => {
            tracing::error!("sign-in task failed: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// LocalIdentityProvider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeviceIdentity {
    identity: Identity,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    identity: Identity,
    issued_at: DateTime<Utc>,
}

/// Identities persisted next to a directory-backed store.
#[derive(Debug, Clone)]
pub struct LocalIdentityProvider {
    dir: PathBuf,
}

impl LocalIdentityProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn identity_path(&self) -> PathBuf {
        self.dir.join("identity.yaml")
    }

    fn tokens_path(&self) -> PathBuf {
        self.dir.join("tokens.yaml")
    }

    fn load_tokens(&self) -> Result<Vec<TokenRecord>> {
        Ok(io::read_yaml(&self.tokens_path())?.unwrap_or_default())
    }

    fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let data = serde_yaml::to_string(value)?;
        io::atomic_write(path, data.as_bytes())
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_in_with_token(&self, token: &str) -> Result<Identity> {
        self.load_tokens()?
            .into_iter()
            .find(|r| r.token == token)
            .map(|r| r.identity)
            .ok_or_else(|| RuleError::AuthRejected("unknown token".into()))
    }

    fn sign_in_anonymously(&self) -> Result<Identity> {
        let path = self.identity_path();
        if let Some(device) = io::read_yaml::<DeviceIdentity>(&path)
            .map_err(|e| RuleError::AuthUnavailable(format!("{}: {e}", path.display())))?
        {
            return Ok(device.identity);
        }
        let device = DeviceIdentity {
            identity: Identity::generate(),
            created_at: Utc::now(),
        };
        Self::save_yaml(&path, &device)
            .map_err(|e| RuleError::AuthUnavailable(format!("{}: {e}", path.display())))?;
        Ok(device.identity)
    }

    fn issue_token(&self, identity: &Identity) -> Result<String> {
        let mut tokens = self.load_tokens()?;
        let token = new_token();
        tokens.push(TokenRecord {
            token: token.clone(),
            identity: identity.clone(),
            issued_at: Utc::now(),
        });
        Self::save_yaml(&self.tokens_path(), &tokens)?;
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// MemoryIdentityProvider
// ---------------------------------------------------------------------------

/// Identities that live only as long as the provider; pairs with the
/// in-memory store.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    anonymous: OnceLock<Identity>,
    tokens: Mutex<HashMap<String, Identity>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn sign_in_with_token(&self, token: &str) -> Result<Identity> {
        let tokens = self.tokens.lock().unwrap_or_else(|p| p.into_inner());
        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| RuleError::AuthRejected("unknown token".into()))
    }

    fn sign_in_anonymously(&self) -> Result<Identity> {
        Ok(self.anonymous.get_or_init(Identity::generate).clone())
    }

    fn issue_token(&self, identity: &Identity) -> Result<String> {
        let token = new_token();
        let mut tokens = self.tokens.lock().unwrap_or_else(|p| p.into_inner());
        tokens.insert(token.clone(), identity.clone());
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
