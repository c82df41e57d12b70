//! Rawcam CLI: discover camera+microphone pairs and preview them full-screen.
//!
//! Usage:
//!   rawcam devices             List discovered capture pairs
//!   rawcam check               Check system capabilities
//!   rawcam preview [--group]   Stream a pair full-screen until stopped

use clap::{Parser, Subcommand};
use rawcam_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "rawcam",
    about = "Raw full-screen preview of a webcam and its built-in microphone",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover capture pairs and print them
    Devices {
        /// Print the groups as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system capabilities
    Check,

    /// Stream a capture pair full-screen; Ctrl+C stops
    Preview {
        /// Group id to stream (defaults to the first discovered pair)
        #[arg(short, long)]
        group: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    rawcam_common::logging::init_logging(&config.logging);
    tracing::debug!(path = %rawcam_common::config::config_file_path().display(), "Configuration loaded");

    match cli.command {
        Commands::Devices { json } => commands::devices::run(&config, json).await,
        Commands::Check => commands::check::run(&config),
        Commands::Preview { group } => commands::preview::run(config, group).await,
    }
}
