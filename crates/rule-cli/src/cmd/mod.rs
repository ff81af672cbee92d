pub mod dashboard;
pub mod identity;
pub mod logs;
pub mod review;
pub mod serve;
pub mod settings;
pub mod watch;

use rule_core::config::{ClientConfig, CONFIGURATION_HELP};
use rule_core::context::{self, SignedIn, Startup};
use std::fmt;

/// Raised when the store is not configured; the binary exits with code 2.
#[derive(Debug)]
pub struct ConfigurationRequired(pub String);

impl fmt::Display for ConfigurationRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{CONFIGURATION_HELP}", self.0)
    }
}

impl std::error::Error for ConfigurationRequired {}

/// Connect to the configured store and sign in.
pub async fn connect(config: rule_core::Result<ClientConfig>) -> anyhow::Result<SignedIn> {
    match context::connect(config).await {
        Startup::Ready(signed) => Ok(signed),
        Startup::ConfigurationRequired { reason } => Err(ConfigurationRequired(reason).into()),
        Startup::SignedOut => Err(anyhow::anyhow!("could not sign in: every sign-in method failed")),
    }
}
