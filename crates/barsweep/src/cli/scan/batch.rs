//! Batch scanning: bounded ordered stream, progress, streaming output, summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use barsweep_core::{BatchSummary, DiscoveredFile, ImageProcessor, OutputWriter};
use futures_util::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use super::ScanContext;

/// Scan every discovered file and write one record per file.
///
/// Records go to `output` (or stdout) as they complete. Up to
/// `ctx.parallel` images are in flight at once, but records are always
/// emitted in discovery order.
pub async fn run_batch(
    ctx: &ScanContext,
    files: Vec<DiscoveredFile>,
    output: Option<&Path>,
    show_progress: bool,
) -> anyhow::Result<BatchSummary> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = OutputWriter::new(sink, ctx.output_format, ctx.pretty);

    let progress = if show_progress {
        create_progress_bar(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let summary = scan_files(
        &ctx.processor,
        &files,
        ctx.parallel,
        &mut writer,
        &progress,
    )
    .await?;

    writer.finish()?;
    progress.finish_and_clear();
    Ok(summary)
}

/// Drive the ordered stream of scans into a writer.
pub(crate) async fn scan_files<W: Write>(
    processor: &ImageProcessor,
    files: &[DiscoveredFile],
    parallel: usize,
    writer: &mut OutputWriter<W>,
    progress: &ProgressBar,
) -> anyhow::Result<BatchSummary> {
    let start_time = std::time::Instant::now();
    let mut summary = BatchSummary::default();

    let mut outcomes = stream::iter(files)
        .map(|file| processor.process(&file.path))
        .buffered(parallel.max(1));

    while let Some(outcome) = outcomes.next().await {
        writer.write_record(&outcome)?;
        summary.record(&outcome);

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = summary.total() as f64 / elapsed;
            progress.set_message(format!("{:.1} img/sec, {} decoded", rate, summary.decoded));
        }
    }

    tracing::debug!(
        "Scanned {} image(s) in {:.1}s",
        summary.total(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(summary)
}

/// Create a progress bar for batch scanning.
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print the batch summary to stderr.
pub fn print_summary(summary: &BatchSummary) {
    eprint!("{}", render_summary(summary));
}

/// Format the summary table and the list of images that needed rotation.
pub(crate) fn render_summary(summary: &BatchSummary) -> String {
    let success = summary
        .success_rate()
        .map(|rate| format!("{rate:.1}%"))
        .unwrap_or_else(|| "n/a".to_string());

    let mut out = String::new();
    out.push('\n');
    out.push_str("  ====================================\n");
    out.push_str("               Summary\n");
    out.push_str("  ====================================\n");
    out.push_str(&format!("    Decoded:      {:>8}\n", summary.decoded));
    out.push_str(&format!("    Not decoded:  {:>8}\n", summary.not_decoded));
    if summary.load_failed > 0 {
        out.push_str(&format!("    Load failed:  {:>8}\n", summary.load_failed));
    }
    out.push_str("  ------------------------------------\n");
    out.push_str(&format!("    Total:        {:>8}\n", summary.total()));
    out.push_str(&format!("    Success rate: {:>8}\n", success));
    out.push_str("  ====================================\n");

    if summary.rotated.is_empty() {
        out.push_str("  No image needed rotation to decode.\n");
    } else {
        out.push_str("  Decoded after rotation:\n");
        for outcome in &summary.rotated {
            out.push_str(&format!(
                "    {} | {} | {}°\n",
                outcome.source,
                outcome.barcode_text.as_deref().unwrap_or_default(),
                outcome.rotation_angle.unwrap_or_default()
            ));
        }
    }
    out
}
