//! Pipeline orchestration - validate, load, preprocess, sweep.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::decoder::{BarcodeDecoder, DecoderFactory};
use crate::error::{ConfigError, PipelineError, Result};
use crate::preprocess::{self, PreprocessStep};
use crate::sweep::RotationSweepDecoder;
use crate::types::DecodeOutcome;

use super::discovery::{DiscoveredFile, FileDiscovery};
use super::load::ImageLoader;
use super::validate::Validator;

/// Turns image paths into decode outcomes.
///
/// Every call to [`ImageProcessor::process`] produces exactly one outcome;
/// failures to load an image are reported as `LOAD_FAILED` rather than
/// returned as errors so a batch never stops on a bad file.
pub struct ImageProcessor {
    loader: ImageLoader,
    validator: Validator,
    discovery: FileDiscovery,
    sweep: RotationSweepDecoder,
    /// Steps run before the median filter; the rest live in the sweep.
    pre_filter: Arc<[PreprocessStep]>,
    max_dimension: u32,
    decoder: Arc<dyn BarcodeDecoder>,
}

impl ImageProcessor {
    /// Create a processor using the decoder backend named in the config.
    pub fn new(config: &Config) -> Result<Self> {
        let decoder: Arc<dyn BarcodeDecoder> =
            Arc::from(DecoderFactory::create(&config.decoder)?);
        Ok(Self::with_decoder(config, decoder)?)
    }

    /// Create a processor around an explicit decoder.
    pub fn with_decoder(
        config: &Config,
        decoder: Arc<dyn BarcodeDecoder>,
    ) -> std::result::Result<Self, ConfigError> {
        let (pre_filter, post_filter) = preprocess::split_at_median(&config.sweep.preprocess);
        Ok(Self {
            loader: ImageLoader::new(config.limits.clone()),
            validator: Validator::new(config.limits.clone()),
            discovery: FileDiscovery::new(config.processing.clone()),
            sweep: RotationSweepDecoder::new(config.sweep.params())?
                .with_post_filter(post_filter),
            pre_filter: pre_filter.into(),
            max_dimension: config.limits.max_image_dimension,
            decoder,
        })
    }

    /// Scan one image file.
    pub async fn process(&self, path: &Path) -> DecodeOutcome {
        let start = std::time::Instant::now();
        let source = path.display().to_string();
        tracing::debug!("Processing: {:?}", path);

        if let Err(e) = self.validator.validate(path) {
            tracing::warn!("Skipping {}: {}", source, e);
            return DecodeOutcome::load_failed(source, e.to_string());
        }

        let loaded = match self.loader.load(path).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", source, e);
                return DecodeOutcome::load_failed(source, e.to_string());
            }
        };
        tracing::trace!("  Load: {:?} ({}x{})", start.elapsed(), loaded.width, loaded.height);

        let stage = Stage {
            sweep: self.sweep.clone(),
            pre_filter: self.pre_filter.clone(),
            max_dimension: self.max_dimension,
        };
        let decoder = self.decoder.clone();
        let task_source = source.clone();
        let scanned = tokio::task::spawn_blocking(move || {
            stage.scan(decoder.as_ref(), task_source, &loaded.image)
        })
        .await;

        let outcome = match scanned {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Sweep task failed for {}: {}", source, e);
                DecodeOutcome {
                    error: Some(format!("Sweep task failed: {e}")),
                    ..DecodeOutcome::not_decoded(source, 0)
                }
            }
        };

        tracing::debug!(
            "Scanned {} in {:?}: {} after {} attempt(s)",
            outcome.source,
            start.elapsed(),
            outcome.status,
            outcome.attempts
        );
        outcome
    }

    /// Preprocess and sweep an image that is already in memory.
    pub fn scan_image(&self, source: impl Into<String>, image: &DynamicImage) -> DecodeOutcome {
        let stage = Stage {
            sweep: self.sweep.clone(),
            pre_filter: self.pre_filter.clone(),
            max_dimension: self.max_dimension,
        };
        stage.scan(self.decoder.as_ref(), source.into(), image)
    }

    /// Discover all image files at a path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(path)
    }

    /// Name of the decoder backend in use.
    pub fn decoder_name(&self) -> &str {
        self.decoder.name()
    }

    /// Tag describing the whole chain, e.g.
    /// `[ORIGINAL][UPSCALE][MEDIAN][SHARPEN][ROTATE]`.
    pub fn pipeline_label(&self) -> String {
        format!(
            "[ORIGINAL]{}[MEDIAN]{}[ROTATE]",
            preprocess::chain_label(&self.pre_filter),
            preprocess::chain_label(self.sweep.post_filter())
        )
    }
}

/// The CPU-bound part of a scan, owned so it can move onto a blocking thread.
struct Stage {
    sweep: RotationSweepDecoder,
    pre_filter: Arc<[PreprocessStep]>,
    max_dimension: u32,
}

impl Stage {
    fn scan(
        &self,
        decoder: &dyn BarcodeDecoder,
        source: String,
        image: &DynamicImage,
    ) -> DecodeOutcome {
        // Checked before any pixel is touched so an upscale never allocates
        // past the limit.
        let (width, height) =
            preprocess::chain_dimensions(&self.pre_filter, image.width(), image.height());
        let max_dim = self.max_dimension as u64;
        if width > max_dim || height > max_dim {
            let e = PipelineError::ImageTooLarge {
                path: PathBuf::from(&source),
                width: width.min(u32::MAX as u64) as u32,
                height: height.min(u32::MAX as u64) as u32,
                max_dim: self.max_dimension,
            };
            tracing::warn!("Skipping {} after preprocessing: {}", source, e);
            return DecodeOutcome::load_failed(source, e.to_string());
        }

        let prepared = preprocess::apply_chain(&self.pre_filter, image);
        self.sweep.decode(source, &prepared, decoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::FnDecoder;
    use crate::types::DecodeStatus;
    use image::{GrayImage, Luma};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_decoder(
        answer: Option<&'static str>,
    ) -> (Arc<dyn BarcodeDecoder>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let decoder: Arc<dyn BarcodeDecoder> =
            Arc::new(FnDecoder::new("counting", move |_: &DynamicImage| {
                counter.fetch_add(1, Ordering::SeqCst);
                answer.map(|a| vec![a.to_string()]).unwrap_or_default()
            }));
        (decoder, calls)
    }

    #[tokio::test]
    async fn test_missing_file_is_load_failed_without_decoding() {
        let (decoder, calls) = counting_decoder(Some("never"));
        let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

        let outcome = processor.process(Path::new("/no/such/d.jpg")).await;
        assert_eq!(outcome.status, DecodeStatus::LoadFailed);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.attempts, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_loaded_file_is_swept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.jpg");
        GrayImage::from_pixel(16, 16, Luma([128]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let (decoder, calls) = counting_decoder(None);
        let processor = ImageProcessor::with_decoder(&Config::default(), decoder).unwrap();

        let outcome = processor.process(&path).await;
        assert_eq!(outcome.status, DecodeStatus::NotDecoded);
        assert_eq!(outcome.source, path.display().to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 36);
    }

    #[test]
    fn test_scan_image_applies_preprocessing() {
        let mut config = Config::default();
        config.sweep.preprocess = vec![PreprocessStep::Upscale { factor: 2.0 }];
        let decoder = FnDecoder::new("size", |img: &DynamicImage| {
            if img.width() == 20 {
                vec!["upscaled".to_string()]
            } else {
                vec![]
            }
        });
        let processor = ImageProcessor::with_decoder(&config, Arc::new(decoder)).unwrap();

        let image = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let outcome = processor.scan_image("mem", &image);
        assert_eq!(outcome.barcode_text.as_deref(), Some("upscaled"));
        assert_eq!(outcome.rotation_angle, None);
    }

    #[tokio::test]
    async fn test_upscale_past_dimension_limit_is_load_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.jpg");
        GrayImage::from_pixel(40, 40, Luma([128]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let mut config = Config::default();
        config.limits.max_image_dimension = 64;
        config.sweep.preprocess = vec![PreprocessStep::Upscale { factor: 2.0 }];
        let (decoder, calls) = counting_decoder(Some("never"));
        let processor = ImageProcessor::with_decoder(&config, decoder).unwrap();

        let outcome = processor.process(&path).await;
        assert_eq!(outcome.status, DecodeStatus::LoadFailed);
        assert!(outcome.error.unwrap().contains("80x80"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_huge_upscale_is_rejected_by_config() {
        let mut config = Config::default();
        config.limits.max_image_dimension = 64;
        config.sweep.preprocess = vec![PreprocessStep::Upscale { factor: 100_000.0 }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sharpen_survives_median() {
        // A soft vertical edge: the median keeps it, sharpening then adds
        // overshoot on both sides that the decoder must still see.
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, _| {
            Luma([match x {
                0..=13 => 80,
                14 => 110,
                15 => 140,
                _ => 170,
            }])
        }));
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = seen.clone();
        let decoder: Arc<dyn BarcodeDecoder> =
            Arc::new(FnDecoder::new("recorder", move |img: &DynamicImage| {
                sink.lock().unwrap().get_or_insert_with(|| img.to_luma8());
                vec!["seen".to_string()]
            }));

        let mut config = Config::default();
        config.sweep.preprocess = vec![PreprocessStep::Grayscale, PreprocessStep::Sharpen];
        let processor = ImageProcessor::with_decoder(&config, decoder).unwrap();
        processor.scan_image("edge", &image);

        let received = seen.lock().unwrap().take().unwrap();
        let median_only = crate::sweep::transform::median(&image, 7).to_luma8();
        assert_ne!(received, median_only);
        assert!(received.get_pixel(13, 16).0[0] < 80);
        assert!(received.get_pixel(16, 16).0[0] > 170);
    }

    #[test]
    fn test_with_decoder_rejects_invalid_sweep() {
        let mut config = Config::default();
        config.sweep.filter_kernel_size = 2;
        let (decoder, _) = counting_decoder(None);
        assert!(ImageProcessor::with_decoder(&config, decoder).is_err());
    }

    #[test]
    fn test_pipeline_label() {
        let mut config = Config::default();
        config.sweep.preprocess = vec![PreprocessStep::Grayscale];
        let (decoder, _) = counting_decoder(None);
        let processor = ImageProcessor::with_decoder(&config, decoder).unwrap();
        assert_eq!(
            processor.pipeline_label(),
            "[ORIGINAL][GRAYSCALE][MEDIAN][ROTATE]"
        );

        config.sweep.preprocess = vec![
            PreprocessStep::Sharpen,
            PreprocessStep::Upscale { factor: 2.0 },
        ];
        let (decoder, _) = counting_decoder(None);
        let processor = ImageProcessor::with_decoder(&config, decoder).unwrap();
        assert_eq!(
            processor.pipeline_label(),
            "[ORIGINAL][UPSCALE][MEDIAN][SHARPEN][ROTATE]"
        );
        assert_eq!(processor.decoder_name(), "counting");
    }
}
