//! Tangent CLI binary.
//!
//! Tangency portfolio analysis, strategy backtests and order book replay.

mod commands;
mod error;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use commands::{backtest::BacktestArgs, book::BookArgs, tangency::TangencyArgs};
use error::CliError;
use output::{OutputFormat, OutputOptions};
use settings::Settings;
use std::{path::PathBuf, process};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tangent")]
#[command(about = "Tangent: tangency portfolios, backtests and order books", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (default: `$CONFIG_DIR/tangent/config.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Also export results to this file (`.csv` or `.json`)
    #[arg(long, global = true)]
    export: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Asset metrics, tangency weights and portfolio performance
    Tangency(TangencyArgs),

    /// Run a trading strategy over stored prices
    Backtest(BacktestArgs),

    /// Replay an order file through the limit order book
    Book(BookArgs),
}

fn init_logging(level: &str) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::Logging(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(&settings.log_level)?;
    debug!(?settings, "settings loaded");

    let output = OutputOptions {
        format: cli.format,
        export: cli.export,
    };

    match cli.command {
        Commands::Tangency(args) => commands::tangency::run(&args, settings.tangency, &output),
        Commands::Backtest(args) => {
            commands::backtest::run(&args, &settings.backtest, settings.data_dir, &output)
        }
        Commands::Book(args) => {
            commands::book::run(&args, settings.backtest.run.starting_cash, &output)
        }
    }
}
