//! The `barsweep scan` command.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use barsweep_core::{Config, ImageProcessor, OutputFormat as CoreOutputFormat, Symbology};
use clap::Args;
use std::path::PathBuf;

use batch::{print_summary, run_batch};
use setup::setup_scanner;

/// Arguments for the `scan` command.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Image file or directory to scan
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format [default: from config, usually json]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of images scanned concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Degrees between sweep attempts
    #[arg(long)]
    pub angle_step: Option<u32>,

    /// Exclusive upper bound of the swept angles
    #[arg(long)]
    pub max_angle: Option<u32>,

    /// Median filter kernel size (odd)
    #[arg(long)]
    pub kernel_size: Option<u32>,

    /// Restrict decoding to a symbology (repeatable, e.g. --symbology data-matrix)
    #[arg(long = "symbology", value_parser = types::parse_symbology)]
    pub symbologies: Vec<Symbology>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Everything a scan needs, assembled by setup_scanner().
pub(crate) struct ScanContext {
    pub processor: ImageProcessor,
    pub input: PathBuf,
    pub output_format: CoreOutputFormat,
    pub pretty: bool,
    pub parallel: usize,
}

/// Execute the scan command.
pub async fn execute(args: ScanArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_scanner(&args, config)?;

    let files = ctx.processor.discover(&ctx.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", ctx.input);
    } else {
        tracing::info!("Found {} image(s) to scan", files.len());
    }

    let summary = run_batch(&ctx, files, args.output.as_deref(), !args.no_progress).await?;
    if let Some(output_path) = &args.output {
        tracing::info!("Output written to {:?}", output_path);
    }
    print_summary(&summary);

    Ok(())
}
