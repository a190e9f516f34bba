//! CLI application for cheque field extraction.

mod commands;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{config, inspect, process};

/// Cheque field extraction - payee, amount, date and cheque number from OCR tokens
#[derive(Parser)]
#[command(name = "cheq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a token layout
    Process(process::ProcessArgs),

    /// Show text lines and anchor matches of a token layout
    Inspect(inspect::InspectArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// `-v` count wins; otherwise `RUST_LOG`, then the configured level.
fn log_filter(verbose: u8, config_path: Option<&std::path::Path>) -> EnvFilter {
    let level = match verbose {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    };
    if let Some(level) = level {
        return EnvFilter::new(level.as_str().to_lowercase());
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let configured = commands::load_config(config_path)
        .ok()
        .and_then(|c| Level::from_str(&c.logging.level).ok())
        .unwrap_or(Level::WARN);
    EnvFilter::new(configured.as_str().to_lowercase())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli.verbose, cli.config.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Process(args) => process::run(args, cli.config.as_deref()),
        Commands::Inspect(args) => inspect::run(args, cli.config.as_deref()),
        Commands::Config(args) => config::run(args, cli.config.as_deref()),
    }
}
