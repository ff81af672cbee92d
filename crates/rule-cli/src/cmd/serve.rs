use rule_core::config::ClientConfig;
use rule_core::context::{self, Startup};

/// Serve the HTTP API. An unconfigured store still serves, answering every
/// API request with 503 and the configuration guidance.
pub async fn run(config: rule_core::Result<ClientConfig>, port: u16) -> anyhow::Result<()> {
    let startup = context::connect(config).await;
    if let Startup::ConfigurationRequired { reason } = &startup {
        eprintln!("warning: {reason}\n{}", rule_core::config::CONFIGURATION_HELP);
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let actual = listener.local_addr()?.port();
    println!("Rule of Life API at http://localhost:{actual}/api");

    rule_server::serve_on(startup, listener).await
}
