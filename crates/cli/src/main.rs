//! MotoAsesor CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Write the default config and create the catalog
//! - `serve`    — Start the WhatsApp webhook gateway and relay
//! - `chat`     — Talk to the advisor from the terminal
//! - `catalog`  — Print the catalog the way the model sees it
//! - `doctor`   — Diagnose config, inventory, and bridge

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "motoasesor",
    about = "MotoAsesor — WhatsApp motorcycle sales advisor",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the SQLite catalog
    Onboard {
        /// Fill an empty catalog with demo listings
        #[arg(long)]
        seed: bool,
    },

    /// Start the webhook gateway and message relay
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the advisor in the terminal
    Chat,

    /// Print the formatted catalog
    Catalog {
        /// Print the full opening prompt instead of just the catalog
        #[arg(long)]
        prompt: bool,
    },

    /// Diagnose system health
    Doctor,
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
        .init();

    match cli.command {
        Commands::Onboard { seed } => commands::onboard::run(seed).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Catalog { prompt } => commands::catalog::run(prompt).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
