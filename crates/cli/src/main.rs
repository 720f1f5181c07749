//! Lull CLI - lull command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// Lull - trailing-edge debounce for deferred tasks
#[derive(Parser)]
#[command(name = "lull")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (default: <config_dir>/lull/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log protocol steps (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List debounce tickets in the store
    Tickets {
        /// Ticket database (default: store.path from settings)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show the ticket held for one key
    Show {
        /// Namespaced key, e.g. Notify:user-7
        key: String,
        /// Ticket database (default: store.path from settings)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Remove the ticket for one key (its pending invocation will be skipped)
    Clear {
        /// Namespaced key, e.g. Notify:user-7
        key: String,
        /// Ticket database (default: store.path from settings)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// View settings
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Fire repeated triggers through an in-process worker and report what ran
    Simulate {
        /// Task type to trigger
        #[arg(long)]
        task: String,
        /// Number of triggers (default: 3)
        #[arg(long, default_value = "3")]
        triggers: usize,
        /// Pause between triggers in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,
        /// Literal debounce key
        #[arg(long, conflicts_with = "key_args")]
        key: Option<String>,
        /// Positions of ARGS joined into the key (default: all ARGS); the
        /// revision argument appended to each trigger cannot be selected
        #[arg(long, value_delimiter = ',')]
        key_args: Vec<usize>,
        /// Override the task's delay from settings
        #[arg(long)]
        delay_secs: Option<u64>,
        /// Task arguments (parsed as JSON when possible)
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show parsed settings
    List,
    /// Show the settings file location
    Path {
        /// Write the example file if none exists
        #[arg(long)]
        create: bool,
    },
    /// Print an example settings file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Tickets { db } => cmd::tickets::run_list(config, db).await,
        Commands::Show { key, db } => cmd::tickets::run_show(config, db, &key).await,
        Commands::Clear { key, db } => cmd::tickets::run_clear(config, db, &key).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(config).await,
            ConfigCommands::Path { create } => cmd::config::run_path(config, create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
        Commands::Simulate {
            task,
            triggers,
            interval_ms,
            key,
            key_args,
            delay_secs,
            args,
        } => {
            let options = cmd::simulate::SimulateOptions {
                task,
                triggers,
                interval_ms,
                key,
                key_args,
                delay_secs,
                args,
            };
            cmd::simulate::run(config, options).await
        }
    }
}
