//! Client wiring: one context per process, built from configuration and
//! handed to everything that talks to the store.

use crate::config::{ClientConfig, Endpoint};
use crate::error::Result;
use crate::identity::{self, Identity, IdentityProvider, LocalIdentityProvider, MemoryIdentityProvider};
use crate::log_repo::LogRepository;
use crate::schema_repo::SchemaRepository;
use crate::session::Session;
use crate::store::{DocumentStore, FileStore, MemoryStore};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ClientContext
// ---------------------------------------------------------------------------

pub struct ClientContext {
    config: ClientConfig,
    store: Arc<dyn DocumentStore>,
    identity_provider: Arc<dyn IdentityProvider>,
}

impl ClientContext {
    /// Open the store named by `config` and the identity provider that goes
    /// with it.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let (store, identity_provider): (Arc<dyn DocumentStore>, Arc<dyn IdentityProvider>) =
            match config.connection.endpoint()? {
                Endpoint::Memory => (
                    Arc::new(MemoryStore::new()),
                    Arc::new(MemoryIdentityProvider::new()),
                ),
                Endpoint::Directory(dir) => {
                    let store = FileStore::open(&dir)?;
                    (Arc::new(store), Arc::new(LocalIdentityProvider::new(dir)))
                }
            };
        tracing::debug!(app_id = %config.app_id, "client context ready");
        Ok(Self::with_parts(config, store, identity_provider))
    }

    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn DocumentStore>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            store,
            identity_provider,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.config.app_id
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn identity_provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity_provider
    }

    pub fn schemas(&self) -> SchemaRepository {
        SchemaRepository::new(Arc::clone(&self.store), self.config.app_id.clone())
    }

    pub fn logs(&self) -> LogRepository {
        LogRepository::new(Arc::clone(&self.store), self.config.app_id.clone())
    }

    /// Configured token first, anonymous otherwise. `None` when every
    /// method failed.
    pub async fn sign_in(&self) -> Option<Identity> {
        identity::sign_in(
            Arc::clone(&self.identity_provider),
            self.config.auth_token.clone(),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// A signed-in context without live subscriptions, for one-shot callers.
#[derive(Clone)]
pub struct SignedIn {
    pub context: Arc<ClientContext>,
    pub identity: Identity,
}

/// Where startup ended up.
pub enum Startup<T = Session> {
    /// No usable store configuration. Nothing was opened.
    ConfigurationRequired { reason: String },
    /// Every sign-in method failed.
    SignedOut,
    Ready(T),
}

impl<T> Startup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Startup<U> {
        match self {
            Startup::ConfigurationRequired { reason } => Startup::ConfigurationRequired { reason },
            Startup::SignedOut => Startup::SignedOut,
            Startup::Ready(t) => Startup::Ready(f(t)),
        }
    }
}

/// Build a context from `config` and sign in. Configuration problems stop
/// here, before any store is opened.
pub async fn connect(config: Result<ClientConfig>) -> Startup<SignedIn> {
    let context = match config.and_then(ClientContext::connect) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            tracing::warn!("configuration required: {e}");
            return Startup::ConfigurationRequired {
                reason: e.to_string(),
            };
        }
    };
    sign_in(context).await
}

/// Sign in on an existing context.
pub async fn sign_in(context: Arc<ClientContext>) -> Startup<SignedIn> {
    match context.sign_in().await {
        Some(identity) => Startup::Ready(SignedIn { context, identity }),
        None => Startup::SignedOut,
    }
}

/// [`connect`], then start a live session.
pub async fn bootstrap(config: Result<ClientConfig>) -> Startup {
    connect(config).await.map(Session::start)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use tempfile::TempDir;

    fn memory_config() -> ClientConfig {
        ClientConfig::from_parts(Some(r#"{"apiKey":"k","endpoint":"memory"}"#), Some("app"), None)
            .unwrap()
    }

    struct Refusing;

    impl IdentityProvider for Refusing {
        fn sign_in_with_token(&self, _: &str) -> Result<Identity> {
            Err(RuleError::AuthRejected("no".into()))
        }
        fn sign_in_anonymously(&self) -> Result<Identity> {
            Err(RuleError::AuthUnavailable("no".into()))
        }
        fn issue_token(&self, _: &Identity) -> Result<String> {
            Err(RuleError::AuthUnavailable("no".into()))
        }
    }

    #[tokio::test]
    async fn missing_config_requires_configuration() {
        let startup = bootstrap(ClientConfig::from_parts(None, None, None)).await;
        match startup {
            Startup::ConfigurationRequired { reason } => assert!(reason.contains("RULE_STORE_CONFIG")),
            _ => panic!("expected configuration required"),
        }
    }

    #[tokio::test]
    async fn malformed_config_requires_configuration() {
        let startup = bootstrap(ClientConfig::from_parts(Some("{oops"), None, None)).await;
        assert!(matches!(startup, Startup::ConfigurationRequired { .. }));
    }

    #[tokio::test]
    async fn memory_config_is_ready() {
        let Startup::Ready(session) = bootstrap(Ok(memory_config())).await else {
            panic!("expected ready");
        };
        assert!(session.identity().as_str().starts_with("anon-"));
        assert_eq!(session.context().store().active_subscriptions(), 2);
        session.shutdown();
    }

    #[tokio::test]
    async fn failed_sign_in_starts_nothing() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let context = Arc::new(ClientContext::with_parts(
            memory_config(),
            Arc::clone(&store),
            Arc::new(Refusing),
        ));
        assert!(matches!(sign_in(context).await, Startup::SignedOut));
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn directory_endpoint_persists_device_identity() {
        let dir = TempDir::new().unwrap();
        let raw = serde_json::json!({ "apiKey": "k", "endpoint": dir.path() }).to_string();
        let config = ClientConfig::from_parts(Some(raw.as_str()), None, None).unwrap();

        let Startup::Ready(first) = connect(Ok(config.clone())).await else {
            panic!("expected ready");
        };
        let Startup::Ready(second) = connect(Ok(config)).await else {
            panic!("expected ready");
        };
        assert_eq!(first.identity, second.identity);
        assert!(dir.path().join("identity.yaml").exists());
    }

    #[tokio::test]
    async fn token_from_config_is_used() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let alice = Identity::new("alice");
        let token = provider.issue_token(&alice).unwrap();
        let mut config = memory_config();
        config.auth_token = Some(token);
        let context = Arc::new(ClientContext::with_parts(
            config,
            Arc::new(MemoryStore::new()),
            provider,
        ));
        let Startup::Ready(signed) = sign_in(context).await else {
            panic!("expected ready");
        };
        assert_eq!(signed.identity, alice);
    }
}
