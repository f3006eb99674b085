mod cli;
mod config;
mod db;
mod emotion;
mod llm;
mod memory;
mod rate_limit;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "astra", version, about = "Emotionally aware conversational assistant with long-term memory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive conversation
    Chat,
    /// List stored memories
    Browse {
        /// Only show memories of this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Show memory statistics and database health
    Stats {
        /// Only count memories of this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Apply one emotional decay pass to all feeling memories
    Decay,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::AstraConfig::load()?;

    // Log to stderr so stdout stays clean for the conversation.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chat => cli::chat::chat(&config).await?,
        Command::Browse { user } => cli::browse::browse(&config, user.as_deref())?,
        Command::Stats { user } => cli::stats::stats(&config, user.as_deref())?,
        Command::Decay => cli::maintenance::decay(&config)?,
    }

    Ok(())
}
