//! AutoContext CLI: operate a local knowledge store.
//!
//! Commands:
//! - `init`   Write a starter config file
//! - `add`    Ingest a text entry
//! - `query`  Assemble budget-sized context for a query
//! - `stats`  Show store statistics

use autocontext_core::MetadataValue;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "autocontext",
    about = "AutoContext: budget-aware context retrieval over a local knowledge store",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.autocontext/config.toml)
    #[arg(short, long, global = true, env = "AUTOCONTEXT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add a text entry to the store (`-` reads stdin)
    Add {
        text: String,

        /// Metadata as key=value (repeatable)
        #[arg(short, long = "meta", value_parser = commands::parse_key_value)]
        meta: Vec<(String, MetadataValue)>,
    },

    /// Retrieve the most relevant entries that fit a token budget
    Query {
        text: String,

        /// Token budget (defaults to retrieval.default_max_tokens)
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Maximum number of entries
        #[arg(long)]
        max_entries: Option<usize>,

        /// Equality filter as key=value (repeatable)
        #[arg(short, long = "filter", value_parser = commands::parse_key_value)]
        filter: Vec<(String, MetadataValue)>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show store statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(commands::default_config_path);

    match cli.command {
        Commands::Init { force } => commands::init::run(&config_path, force)?,
        Commands::Add { text, meta } => commands::add::run(&config_path, text, meta).await?,
        Commands::Query {
            text,
            max_tokens,
            max_entries,
            filter,
            json,
        } => {
            let options = commands::query::QueryOptions {
                max_tokens,
                max_entries,
                filters: filter,
                json,
            };
            commands::query::run(&config_path, text, options).await?
        }
        Commands::Stats { json } => commands::stats::run(&config_path, json)?,
    }

    Ok(())
}
