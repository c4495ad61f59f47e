use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daylog::commands;
use daylog::config::Config;

#[derive(Parser)]
#[command(name = "daylog", version, about = "Work journal daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "daylog.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background daemon.
    Serve,
    /// Record a work entry.
    Add {
        /// Entry text.
        content: String,
    },
    /// List today's entries.
    List,
    /// Prompt once via dialog and record the answer.
    Popup,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => commands::run_serve(config).await,
        Commands::Add { content } => commands::run_add(config, content).await,
        Commands::List => commands::run_list(config).await,
        Commands::Popup => commands::run_popup(config).await,
    }
}
