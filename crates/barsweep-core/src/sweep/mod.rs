//! The rotation sweep: median-filter an image once, then try the decoder on
//! it at `0, step, 2*step, ... < max_angle` degrees until something decodes.
//!
//! Enhancement steps configured to run after the median (sharpen, thresholds,
//! morphology, ...) are applied to the filtered raster before any rotation.
//!
//! The first angle that yields a result wins. There is no scoring and no
//! retry; a sweep over a deterministic decoder always produces the same
//! outcome for the same image.

pub mod transform;

use image::DynamicImage;
use std::sync::Arc;

use crate::decoder::BarcodeDecoder;
use crate::error::ConfigError;
use crate::preprocess::{self, PreprocessStep};
use crate::types::{DecodeAttempt, DecodeOutcome};

/// Parameters of a rotation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepParams {
    /// Degrees between consecutive attempts
    pub angle_step: u32,
    /// Exclusive upper bound of the swept angles
    pub max_angle: u32,
    /// Odd median filter kernel size
    pub filter_kernel_size: u32,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            angle_step: 10,
            max_angle: 360,
            filter_kernel_size: 7,
        }
    }
}

impl SweepParams {
    /// Check the parameters describe a finite sweep with a valid kernel.
    pub fn validate(&self) -> Result<(), String> {
        if self.angle_step == 0 {
            return Err("angle_step must be > 0".into());
        }
        if self.max_angle == 0 {
            return Err("max_angle must be > 0".into());
        }
        if self.filter_kernel_size == 0 || self.filter_kernel_size % 2 == 0 {
            return Err(format!(
                "filter_kernel_size must be odd and > 0, got {}",
                self.filter_kernel_size
            ));
        }
        Ok(())
    }

    /// The swept angles in the order they are tried.
    pub fn angles(&self) -> impl Iterator<Item = u32> {
        (0..self.max_angle).step_by(self.angle_step.max(1) as usize)
    }
}

/// Searches rotation angles for one at which the decoder reads a barcode.
#[derive(Debug, Clone)]
pub struct RotationSweepDecoder {
    params: SweepParams,
    post_filter: Arc<[PreprocessStep]>,
}

impl RotationSweepDecoder {
    /// Create a sweep with validated parameters.
    pub fn new(params: SweepParams) -> Result<Self, ConfigError> {
        params.validate().map_err(ConfigError::ValidationError)?;
        Ok(Self {
            params,
            post_filter: Arc::from([]),
        })
    }

    /// Run `steps` on the median-filtered image before it is rotated.
    pub fn with_post_filter(mut self, steps: impl Into<Arc<[PreprocessStep]>>) -> Self {
        self.post_filter = steps.into();
        self
    }

    /// Steps applied between the median filter and the rotation.
    pub fn post_filter(&self) -> &[PreprocessStep] {
        &self.post_filter
    }

    /// The parameters this sweep runs with.
    pub fn params(&self) -> SweepParams {
        self.params
    }

    /// Lazily run the sweep, yielding one attempt per angle.
    ///
    /// The image is filtered once up front (median, then any post-filter
    /// steps); every attempt (angle 0 included) sees the filtered raster. Nothing is decoded until the iterator is
    /// advanced, so stopping early skips the remaining angles.
    pub fn attempts<'a>(
        &self,
        image: &DynamicImage,
        decoder: &'a dyn BarcodeDecoder,
    ) -> impl Iterator<Item = DecodeAttempt> + 'a {
        let median = transform::median(image, self.params.filter_kernel_size);
        let filtered = if self.post_filter.is_empty() {
            median
        } else {
            preprocess::apply_chain(&self.post_filter, &median)
        };
        self.params.angles().map(move |angle| {
            let results = if angle == 0 {
                decoder.decode(&filtered)
            } else {
                decoder.decode(&transform::rotate(&filtered, angle))
            };
            DecodeAttempt {
                angle,
                result: results.into_iter().next(),
            }
        })
    }

    /// Run the sweep to the first successful angle.
    pub fn decode(
        &self,
        source: impl Into<String>,
        image: &DynamicImage,
        decoder: &dyn BarcodeDecoder,
    ) -> DecodeOutcome {
        let source = source.into();
        let mut calls = 0u32;

        for attempt in self.attempts(image, decoder) {
            calls += 1;
            tracing::trace!(
                source = %source,
                angle = attempt.angle,
                hit = attempt.result.is_some(),
                "Sweep attempt"
            );
            if let Some(text) = attempt.result {
                tracing::debug!("Decoded {} at {} degrees", source, attempt.angle);
                return DecodeOutcome::decoded(source, text, attempt.angle, calls);
            }
        }

        tracing::debug!(
            "No barcode in {} after {} attempts ({})",
            source,
            calls,
            decoder.name()
        );
        DecodeOutcome::not_decoded(source, calls)
    }
}
