//! End-to-end scans of small on-disk batches with scripted decoders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use barsweep_core::{
    BarcodeDecoder, BatchSummary, Config, DecodeOutcome, DecodeStatus, FnDecoder, ImageProcessor,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

/// Write a flat gray PNG under a `.jpg` name; the loader sniffs content.
fn write_label(dir: &Path, name: &str, shade: u8) -> PathBuf {
    let path = dir.join(name);
    GrayImage::from_pixel(24, 24, Luma([shade]))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

/// A decoder that answers `text` on the `hit_on`-th call (1-based), or never.
fn scripted(text: &'static str, hit_on: Option<u32>) -> (Arc<dyn BarcodeDecoder>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(FnDecoder::new(
        "scripted",
        move |_: &DynamicImage| {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == hit_on {
                vec![text.to_string()]
            } else {
                Vec::new()
            }
        },
    ));
    (decoder, calls)
}

/// A decoder that tells images apart by their shade and keeps a call count
/// per shade: 10 reads at once, 20 on the fifth try, anything else never.
fn shade_keyed() -> (Arc<dyn BarcodeDecoder>, Arc<Mutex<HashMap<u8, u32>>>) {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let counts = calls.clone();
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(FnDecoder::new(
        "shade",
        move |img: &DynamicImage| {
            let gray = img.to_luma8();
            let shade = gray.get_pixel(gray.width() / 2, gray.height() / 2).0[0];
            let mut counts = counts.lock().unwrap();
            let call = counts.entry(shade).or_insert(0);
            *call += 1;
            match (shade, *call) {
                (10, 1) => vec!["123456".to_string()],
                (20, 5) => vec!["ABC".to_string()],
                _ => Vec::new(),
            }
        },
    ));
    (decoder, calls)
}

#[tokio::test]
async fn scenario_a_reads_without_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_label(dir.path(), "a.jpg", 10);
    let (decoder, calls) = scripted("123456", Some(1));
    let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

    let outcome = processor.process(&path).await;

    assert_eq!(outcome.status, DecodeStatus::Decoded);
    assert_eq!(outcome.barcode_text.as_deref(), Some("123456"));
    assert_eq!(outcome.rotation_angle, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let json = serde_json::to_value(&outcome).unwrap();
    assert!(json.get("rotation_angle").is_none());
}

#[tokio::test]
async fn scenario_b_reads_at_forty_degrees() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_label(dir.path(), "b.jpg", 20);
    let (decoder, calls) = scripted("ABC", Some(5));
    let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

    let outcome = processor.process(&path).await;

    assert_eq!(outcome.status, DecodeStatus::Decoded);
    assert_eq!(outcome.barcode_text.as_deref(), Some("ABC"));
    assert_eq!(outcome.rotation_angle, Some(40));
    assert_eq!(outcome.attempts, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn scenario_c_exhausts_every_angle() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_label(dir.path(), "c.jpg", 30);
    let (decoder, calls) = scripted("unused", None);
    let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

    let outcome = processor.process(&path).await;

    assert_eq!(outcome.status, DecodeStatus::NotDecoded);
    assert_eq!(outcome.barcode_text, None);
    assert_eq!(outcome.rotation_angle, None);
    assert_eq!(calls.load(Ordering::SeqCst), 36);
}

#[tokio::test]
async fn scenario_d_load_failure_never_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.jpg");
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();
    let (decoder, calls) = scripted("unused", Some(1));
    let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

    let corrupt = processor.process(&path).await;
    let missing = processor.process(&dir.path().join("gone.jpg")).await;

    for outcome in [&corrupt, &missing] {
        assert_eq!(outcome.status, DecodeStatus::LoadFailed);
        assert_eq!(outcome.barcode_text, None);
        assert!(outcome.error.is_some());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn batch_summary_over_mixed_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_label(dir.path(), "a.jpg", 10);
    write_label(dir.path(), "b.jpg", 20);
    write_label(dir.path(), "c.jpg", 30);
    std::fs::write(dir.path().join("d.jpg"), [0xFF, 0xD8, 0xFF]).unwrap();

    let (decoder, calls) = shade_keyed();
    let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

    let mut outcomes: Vec<DecodeOutcome> = Vec::new();
    for file in processor.discover(dir.path()) {
        outcomes.push(processor.process(&file.path).await);
    }
    let summary = BatchSummary::from_outcomes(&outcomes);

    let statuses: Vec<DecodeStatus> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            DecodeStatus::Decoded,
            DecodeStatus::Decoded,
            DecodeStatus::NotDecoded,
            DecodeStatus::LoadFailed,
        ]
    );
    assert_eq!(summary.decoded, 2);
    assert_eq!(summary.not_decoded, 1);
    assert_eq!(summary.load_failed, 1);
    assert_eq!(summary.total(), 4);

    let rate = summary.success_rate().unwrap();
    assert!((rate - 200.0 / 3.0).abs() < 1e-9);

    assert_eq!(summary.rotated.len(), 1);
    assert!(summary.rotated[0].source.ends_with("b.jpg"));
    assert_eq!(summary.rotated[0].rotation_angle, Some(40));

    let counts = calls.lock().unwrap();
    assert_eq!(counts.get(&10), Some(&1));
    assert_eq!(counts.get(&20), Some(&5));
    assert_eq!(counts.get(&30), Some(&36));
}

#[tokio::test]
async fn rescanning_gives_identical_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_label(dir.path(), "b.jpg", 20);

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let (decoder, _) = scripted("ABC", Some(5));
        let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();
        outcomes.push(processor.process(&path).await);
    }
    assert_eq!(outcomes[0], outcomes[1]);
}

#[test]
fn empty_batch_has_no_success_rate() {
    let summary = BatchSummary::from_outcomes(Vec::<DecodeOutcome>::new().iter());
    assert_eq!(summary.total(), 0);
    assert_eq!(summary.success_rate(), None);
    assert!(summary.rotated.is_empty());
}
