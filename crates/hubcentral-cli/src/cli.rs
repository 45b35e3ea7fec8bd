//! CLI argument definitions for Hub Central.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hub Central -- event-driven automation and AI task routing.
#[derive(Parser)]
#[command(
    name = "hubcentral",
    version,
    about = "Hub Central -- event-driven automation and AI task routing",
    long_about = "Accepts events from many sources, runs persistent triggers on schedules, \
                  events, webhooks and context conditions, and routes natural-language tasks \
                  to interchangeable AI providers with automatic fallback."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the event bus and trigger scheduler and run until Ctrl-C.
    Run,

    /// Show providers, storage backends and trigger counts.
    Status,

    /// Route one prompt through the execution engine and print the answer.
    Ask {
        /// The prompt text.
        prompt: String,

        /// Skip categorization and use this category.
        #[arg(long)]
        category: Option<String>,

        /// Try this provider first.
        #[arg(long)]
        provider: Option<String>,
    },

    /// Print the category and candidate providers for a text.
    Categorize {
        /// Text to categorize.
        text: String,
    },

    /// Manage persistent triggers.
    Triggers {
        #[command(subcommand)]
        action: TriggerAction,
    },
}

#[derive(Subcommand)]
pub enum TriggerAction {
    /// List every trigger.
    List,

    /// List the built-in trigger templates.
    Templates,

    /// Create a trigger from a template.
    FromTemplate {
        /// Template slug or name.
        template: String,

        /// Name for the new trigger.
        #[arg(long)]
        name: Option<String>,

        /// Create the trigger disabled.
        #[arg(long)]
        disabled: bool,
    },

    /// Enable a disabled trigger or disable an enabled one.
    Toggle {
        /// Trigger id.
        id: String,
    },

    /// Delete a trigger.
    Delete {
        /// Trigger id.
        id: String,
    },

    /// Run a trigger's action now.
    Execute {
        /// Trigger id.
        id: String,

        /// JSON object merged into the execution context.
        #[arg(long)]
        context: Option<String>,
    },

    /// Show trigger statistics.
    Stats,
}
