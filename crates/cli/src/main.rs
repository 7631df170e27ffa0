//! Automaton CLI, the main entry point.
//!
//! Commands:
//! - `run`     Start the agent and keep it alive across sleep cycles
//! - `status`  Show identity, state and turn count
//! - `wake`    Ask a parked agent to wake up early
//! - `memory`  Inspect memory providers and recent turns

use automaton_config::AutomatonConfig;
use clap::{Parser, Subcommand};

mod commands;
mod heartbeat;

#[derive(Parser)]
#[command(
    name = "automaton",
    about = "Automaton - a self-sustaining autonomous agent runtime",
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
    /// Run the agent until interrupted
    Run {
        /// Override the configured memory provider
        #[arg(long)]
        memory: Option<String>,
    },

    /// Show agent status
    Status,

    /// Wake a sleeping agent
    Wake {
        /// Why the agent is being woken
        #[arg(default_value = "manual wake")]
        reason: Vec<String>,
    },

    /// Inspect memory
    Memory {
        #[command(subcommand)]
        action: MemoryCommands,
    },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// List available memory providers
    Providers,

    /// Show the most recent turns
    Recent {
        /// Number of turns to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AutomatonConfig::load()?;

    let filter = if cli.verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { memory } => commands::run::run(config, memory).await?,
        Commands::Status => commands::status::run(&config).await?,
        Commands::Wake { reason } => commands::wake::run(&config, &reason.join(" ")).await?,
        Commands::Memory { action } => match action {
            MemoryCommands::Providers => commands::memory::providers(&config),
            MemoryCommands::Recent { limit } => commands::memory::recent(&config, limit).await?,
        },
    }

    Ok(())
}
