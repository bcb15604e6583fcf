//! Mitra - conversational AI client
//!
//! Main entry point for the Mitra CLI.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mitra::cli::{Cli, Commands};
use mitra::commands;
use mitra::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Mirror the CLI storage override into the environment so that
    // `SessionStore::new()` honors it wherever it is constructed.
    if let Some(db_path) = &cli.storage_path {
        std::env::set_var("MITRA_DB_PATH", db_path);
        tracing::info!("Using storage DB override from CLI: {}", db_path);
    }

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command {
        Commands::Chat { resume, guest } => {
            tracing::info!("Starting chat session");
            commands::chat::run_chat(config, resume, guest).await
        }
        Commands::History { command } => commands::history::handle_history(&config, command),
        Commands::Auth { command } => commands::auth::handle_auth(&config, command).await,
        Commands::Upload { file, session } => {
            commands::upload::run_upload(&config, &file, session.as_deref()).await
        }
        Commands::Health => commands::health::run_health(&config).await,
    }
}

/// Initialize the tracing subscriber
///
/// Respects `RUST_LOG` when set; `--verbose` raises the default level.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "mitra=debug" } else { "mitra=warn" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
