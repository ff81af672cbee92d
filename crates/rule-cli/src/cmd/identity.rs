use crate::output::print_json;
use anyhow::anyhow;
use clap::Subcommand;
use rule_core::config::{ClientConfig, AUTH_TOKEN_ENV};
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub enum IdentitySubcommand {
    /// Show the identity this device signs in as
    Show,
    /// Mint a token that signs another device in as this identity
    Token,
}

pub async fn run(
    config: rule_core::Result<ClientConfig>,
    subcmd: IdentitySubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let signed = super::connect(config).await?;
    match subcmd {
        IdentitySubcommand::Show => {
            if json {
                print_json(&serde_json::json!({
                    "identity": signed.identity,
                    "app_id": signed.context.app_id(),
                }))?;
            } else {
                println!("{}", signed.identity);
            }
        }
        IdentitySubcommand::Token => {
            let provider = Arc::clone(signed.context.identity_provider());
            let identity = signed.identity.clone();
            let token = tokio::task::spawn_blocking(move || provider.issue_token(&identity))
                .await
                .map_err(|e| anyhow!("task join error: {e}"))??;
            if json {
                print_json(&serde_json::json!({ "identity": signed.identity, "token": token }))?;
            } else {
                println!("{token}");
                eprintln!("Set {AUTH_TOKEN_ENV}={token} on another device to sign in as {}", signed.identity);
            }
        }
    }
    Ok(())
}
