//! OCT autosend - scheduled transfers from one wallet to a target list
//!
//! # WARNING
//! - This tool moves real funds on every batch.
//! - The remote RPC is trusted completely; its answers are not verified.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use octra_autosend::cli::commands;
use octra_autosend::config::Config;

/// OCT autosend - recurring transfers to a list of recipients
#[derive(Parser)]
#[command(name = "autosend")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "AUTOSEND_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run batches on the configured interval until interrupted
    Start,

    /// Run a single batch now and exit
    Once,

    /// Show wallet nonce and balances
    Balance,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("octra_autosend=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Start => commands::start(&config).await,
        Commands::Once => commands::once(&config).await,
        Commands::Balance => commands::balance(&config).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
