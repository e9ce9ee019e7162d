//! Barsweep CLI - batch barcode scanner with a rotation sweep.
//!
//! Barsweep scans a directory of label photos and reports which ones carry a
//! readable barcode. Images whose code is printed at an angle are retried at
//! successive rotations until the decoder reads them.
//!
//! # Usage
//!
//! ```bash
//! # Scan a directory, records to stdout, summary to stderr
//! barsweep scan ./labels/
//!
//! # Finer sweep, JSON Lines to a file
//! barsweep scan ./labels/ --angle-step 5 --format jsonl --output results.jsonl
//!
//! # View configuration
//! barsweep config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Barsweep - batch barcode scanner that sweeps rotation angles.
#[derive(Parser, Debug)]
#[command(name = "barsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "BARSWEEP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan images for barcodes, rotating until one reads
    Scan(cli::scan::ScanArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match &cli.config {
        Some(path) => barsweep_core::Config::load_from(path).map_err(|e| {
            anyhow::anyhow!("Failed to load config from {}: {e}", path.display())
        })?,
        None => match barsweep_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `barsweep config path`."
                );
                barsweep_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Barsweep v{}", barsweep_core::VERSION);

    match cli.command {
        Commands::Scan(args) => cli::scan::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
