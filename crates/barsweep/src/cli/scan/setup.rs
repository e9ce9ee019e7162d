//! Scanner setup: config overrides, input expansion, processor creation.

use barsweep_core::{Config, ImageProcessor, OutputFormat as CoreOutputFormat};
use std::path::PathBuf;

use super::{ScanArgs, ScanContext};

/// Validate input, apply CLI overrides, and assemble everything needed to scan.
pub fn setup_scanner(args: &ScanArgs, mut config: Config) -> anyhow::Result<ScanContext> {
    let input = expand_input(&args.input);
    if !input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            input
        );
    }

    apply_overrides(&mut config, args);
    config.validate()?;

    let output_format = match args.format {
        Some(format) => format.into(),
        None => CoreOutputFormat::parse(&config.output.format).unwrap_or_default(),
    };

    let processor = ImageProcessor::new(&config)?;
    tracing::debug!(
        "Decoder: {}, pipeline: {}, angles: 0..{} step {}",
        processor.decoder_name(),
        processor.pipeline_label(),
        config.sweep.max_angle,
        config.sweep.angle_step
    );

    Ok(ScanContext {
        processor,
        input,
        output_format,
        pretty: config.output.pretty,
        parallel: config.processing.parallel_workers,
    })
}

/// Fold command-line flags into the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &ScanArgs) {
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    if let Some(step) = args.angle_step {
        config.sweep.angle_step = step;
    }
    if let Some(max) = args.max_angle {
        config.sweep.max_angle = max;
    }
    if let Some(kernel) = args.kernel_size {
        config.sweep.filter_kernel_size = kernel;
    }
    if !args.symbologies.is_empty() {
        config.decoder.formats = args.symbologies.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format.to_string();
    }
}

/// Expand `~` and environment variables in the input path.
fn expand_input(input: &std::path::Path) -> PathBuf {
    let raw = input.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => input.to_path_buf(),
    }
}
