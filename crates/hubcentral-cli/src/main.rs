//! CLI entry point for Hub Central.
//!
//! This binary provides the `hubcentral` command: `run` starts the event bus
//! and trigger scheduler, the other subcommands inspect or drive a single
//! component and exit.

mod cli;
mod commands;
mod config;
mod context;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::{HubConfig, LogFormat, LoggingConfig};
use crate::context::HubContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Provider API keys usually come from a local .env.
    let _ = dotenvy::dotenv();

    let config = HubConfig::load(&cli.config)?;
    init_tracing(&config.logging, &cli.command);
    tracing::debug!(path = %cli.config.display(), "configuration loaded");

    let hub = HubContext::build(config).await?;
    match cli.command {
        Commands::Run => commands::run(&hub).await,
        Commands::Status => commands::status(&hub).await,
        Commands::Ask {
            prompt,
            category,
            provider,
        } => commands::ask(&hub, prompt, category, provider).await,
        Commands::Categorize { text } => {
            commands::categorize(&hub, &text);
            Ok(())
        }
        Commands::Triggers { action } => commands::triggers(&hub, action).await,
    }
}

/// Initialize the tracing subscriber.  One-shot commands log at `warn`
/// unless `RUST_LOG` says otherwise.
fn init_tracing(logging: &LoggingConfig, command: &Commands) {
    let default_level = match command {
        Commands::Run => logging.level.as_str(),
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Compact => builder.with_target(false).compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
