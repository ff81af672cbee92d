use crate::error::{Result, RuleError};
use crate::paths::{StorePath, DEFAULT_APP_ID};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

pub const CONFIG_ENV: &str = "RULE_STORE_CONFIG";
pub const APP_ID_ENV: &str = "RULE_APP_ID";
pub const AUTH_TOKEN_ENV: &str = "RULE_AUTH_TOKEN";

pub const DATA_DIR: &str = ".rule-of-life";
pub const MEMORY_ENDPOINT: &str = "memory";

/// Shown wherever the configuration-required state is rendered.
pub const CONFIGURATION_HELP: &str = "Add RULE_STORE_CONFIG (a JSON object with at least an \
\"apiKey\", e.g. {\"apiKey\":\"local\"}) to your environment to activate the store.";

// ---------------------------------------------------------------------------
// ConnectionConfig
// ---------------------------------------------------------------------------

/// Connection bundle supplied from outside as one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// `"memory"` or a directory path. Defaults to `~/.rule-of-life`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Memory,
    Directory(PathBuf),
}

impl ConnectionConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        let cfg: ConnectionConfig = serde_json::from_str(raw)
            .map_err(|e| RuleError::ConfigMalformed(format!("{CONFIG_ENV} is not valid JSON: {e}")))?;
        if cfg.api_key.trim().is_empty() {
            return Err(RuleError::ConfigMissing(format!(
                "{CONFIG_ENV} has no \"apiKey\""
            )));
        }
        Ok(cfg)
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(MEMORY_ENDPOINT) => Ok(Endpoint::Memory),
            Some(dir) if !dir.is_empty() => Ok(Endpoint::Directory(PathBuf::from(dir))),
            _ => home::home_dir()
                .map(|h| Endpoint::Directory(h.join(DATA_DIR)))
                .ok_or_else(|| {
                    RuleError::ConfigMissing(
                        "no home directory found; set \"endpoint\" in the store config".into(),
                    )
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything needed to construct a client context.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
    pub app_id: String,
    pub auth_token: Option<String>,
}

impl ClientConfig {
    /// Build from raw values. Missing or blank `raw_connection` is a
    /// configuration error; blank `app_id`/`auth_token` fall back to defaults.
    pub fn from_parts(
        raw_connection: Option<&str>,
        app_id: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<Self> {
        let raw = raw_connection
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RuleError::ConfigMissing(format!("{CONFIG_ENV} is not set")))?;
        let connection = ConnectionConfig::parse(raw)?;

        let app_id = app_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_APP_ID)
            .to_string();
        StorePath::new([app_id.as_str()])
            .check_segments()
            .map_err(|_| RuleError::ConfigMalformed(format!("{APP_ID_ENV} '{app_id}' is not a valid id")))?;

        let auth_token = auth_token
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            connection,
            app_id,
            auth_token,
        })
    }

    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(CONFIG_ENV).ok();
        let app_id = std::env::var(APP_ID_ENV).ok();
        let token = std::env::var(AUTH_TOKEN_ENV).ok();
        Self::from_parts(raw.as_deref(), app_id.as_deref(), token.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
