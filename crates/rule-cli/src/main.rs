mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{identity::IdentitySubcommand, settings::SettingsSubcommand, ConfigurationRequired};
use rule_core::config::{ClientConfig, APP_ID_ENV, AUTH_TOKEN_ENV, CONFIG_ENV};

#[derive(Parser)]
#[command(
    name = "rule",
    about = "Rule of Life: weekly habit reviews and progress across the areas of your life",
    version,
    propagate_version = true
)]
struct Cli {
    /// Store connection bundle as JSON, e.g. {"apiKey":"local"}
    #[arg(long, global = true, env = CONFIG_ENV, hide_env_values = true)]
    store_config: Option<String>,

    /// App id that namespaces stored documents
    #[arg(long, global = true, env = APP_ID_ENV)]
    app_id: Option<String>,

    /// Sign-in token (falls back to anonymous sign-in when rejected)
    #[arg(long, global = true, env = AUTH_TOKEN_ENV, hide_env_values = true)]
    auth_token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show progress over the last seven reviews
    Dashboard,

    /// Record a review
    Review {
        /// Mark a habit done (count 1); repeatable
        #[arg(long = "check", value_name = "HABIT")]
        check: Vec<String>,

        /// Set an explicit count, e.g. --count p1=3; repeatable
        #[arg(long = "count", value_name = "HABIT=N")]
        count: Vec<String>,

        /// Free-text reflection
        #[arg(long)]
        reflection: Option<String>,
    },

    /// List recorded reviews, newest first
    Logs {
        /// Maximum number of reviews to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Edit categories and habits
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommand,
    },

    /// Print live progress as the schema or log changes, until Ctrl-C
    Watch,

    /// Serve the HTTP API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
    },

    /// Show the signed-in identity or mint a sign-in token
    Identity {
        #[command(subcommand)]
        subcommand: IdentitySubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Watch => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_parts(
        cli.store_config.as_deref(),
        cli.app_id.as_deref(),
        cli.auth_token.as_deref(),
    );

    let result = tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|rt| {
            rt.block_on(async move {
                match cli.command {
                    Commands::Dashboard => cmd::dashboard::run(config, cli.json).await,
                    Commands::Review {
                        check,
                        count,
                        reflection,
                    } => cmd::review::run(config, &check, &count, reflection, cli.json).await,
                    Commands::Logs { limit } => cmd::logs::run(config, limit, cli.json).await,
                    Commands::Settings { subcommand } => {
                        cmd::settings::run(config, subcommand, cli.json).await
                    }
                    Commands::Watch => cmd::watch::run(config, cli.json).await,
                    Commands::Serve { port } => cmd::serve::run(config, port).await,
                    Commands::Identity { subcommand } => {
                        cmd::identity::run(config, subcommand, cli.json).await
                    }
                }
            })
        });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = if e.downcast_ref::<ConfigurationRequired>().is_some() {
            2
        } else {
            1
        };
        std::process::exit(code);
    }
}
