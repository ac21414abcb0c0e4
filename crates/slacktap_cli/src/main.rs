//! tap-slack
//!
//! Command-line runner for the Slack extraction tap.
//!
//! # Commands
//!
//! - `sync` - Extract the selected streams as line-delimited JSON on stdout
//! - `discover` - Print the stream catalog
//! - `about` - Describe the tap, its settings and streams
//!
//! Logs go to stderr so stdout stays a clean message stream.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Incremental extraction of Slack workspaces.
#[derive(Parser)]
#[command(name = "tap-slack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the selected streams
    Sync {
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// State file to resume from and checkpoint into
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Also write the final state to this file
        #[arg(long)]
        state_out: Option<PathBuf>,

        /// Comma-separated streams to extract (default selection if omitted)
        #[arg(long, value_delimiter = ',')]
        streams: Vec<String>,

        /// Stop the run after this many records
        #[arg(long)]
        record_limit: Option<u64>,

        /// Stop each stream after this many records
        #[arg(long)]
        resource_record_limit: Option<u64>,

        /// Attempts per request before giving up
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Emit STATE every N pages
        #[arg(long)]
        state_interval: Option<u64>,
    },

    /// Print the catalog of available streams
    Discover {
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Comma-separated streams to mark selected
        #[arg(long, value_delimiter = ',')]
        streams: Vec<String>,
    },

    /// Describe the tap
    About {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            config,
            state,
            state_out,
            streams,
            record_limit,
            resource_record_limit,
            max_attempts,
            state_interval,
        } => {
            let options = commands::sync::SyncOptions {
                config,
                state,
                state_out,
                streams,
                record_limit,
                resource_record_limit,
                max_attempts,
                state_interval,
            };
            let summary = commands::sync::run(&options)?;
            if summary.has_failures() {
                std::process::exit(1);
            }
        }
        Commands::Discover { config, streams } => {
            commands::discover::run(&config, &streams)?;
        }
        Commands::About { format } => {
            commands::about::run(&format)?;
        }
        Commands::Version => {
            println!("tap-slack v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
