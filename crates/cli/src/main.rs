//! RideDesk CLI: the main entry point.
//!
//! Commands:
//! - `call`    : Process recorded passenger clips in order
//! - `chat`    : Type to the agent instead of speaking
//! - `onboard` : Write the default config and instructions
//! - `doctor`  : Diagnose setup problems

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ridedesk",
    about = "RideDesk — voice agent that books rideshare trips",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Use this config file instead of ~/.ridedesk/config.toml
    #[arg(long, global = true, env = "RIDEDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a call from recorded audio clips, one utterance per file
    Call {
        /// Audio files (wav, mp3, m4a, ...) in the order they were spoken
        #[arg(required = true)]
        clips: Vec<PathBuf>,

        #[command(flatten)]
        output: commands::OutputArgs,
    },

    /// Text-mode conversation with the agent
    Chat {
        /// Also synthesize and play replies
        #[arg(long)]
        speak: bool,

        #[command(flatten)]
        output: commands::OutputArgs,
    },

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the conversation.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Call { clips, output } => commands::call::run(config_path, clips, output).await?,
        Commands::Chat { speak, output } => commands::chat::run(config_path, speak, output).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
