//! Optional preprocessing applied once per image, around the median filter.
//!
//! Steps fall into two phases around the sweep's median filter: geometry and
//! colour conversion (upscale, grayscale) run before it, every enhancement
//! runs after it so the median does not smooth it away. Within a phase steps
//! keep their configured order. Steps that only make sense on a single
//! channel (equalize, sharpen, thresholds, morphology, CLAHE) convert to luma
//! first; the rest keep the working format.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel};
use imageproc::contrast::ThresholdType;
use imageproc::distance_transform::Norm;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use serde::{Deserialize, Serialize};

use crate::sweep::transform::normalize;

/// Largest accepted upscale factor.
pub const MAX_UPSCALE_FACTOR: f32 = 8.0;

/// A single preprocessing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PreprocessStep {
    /// Scale both dimensions by `factor` (Catmull-Rom)
    Upscale { factor: f32 },
    /// Convert to 8-bit luma
    Grayscale,
    /// Gaussian blur with standard deviation `sigma`
    Gaussian { sigma: f32 },
    /// Histogram equalization
    Equalize,
    /// 3x3 sharpening kernel
    Sharpen,
    /// Multiply every channel by `alpha`, saturating at 255
    Contrast { alpha: f32 },
    /// Binary threshold at `level`
    Threshold { level: u8 },
    /// Binary threshold against the mean of a (2 * `block_radius` + 1) square
    /// block; a pixel is white when at least as bright as the mean minus `offset`
    AdaptiveThreshold {
        block_radius: u32,
        #[serde(default)]
        offset: i16,
    },
    /// Contrast limited adaptive histogram equalization over a `tiles` x
    /// `tiles` grid
    Clahe { clip_limit: f32, tiles: u32 },
    /// Morphological dilation (L-infinity ball of `radius`)
    Dilate { radius: u8 },
    /// Morphological erosion (L-infinity ball of `radius`)
    Erode { radius: u8 },
}

impl PreprocessStep {
    /// Range-check the step's parameters.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            PreprocessStep::Upscale { factor }
                if !(factor.is_finite() && factor > 0.0 && factor <= MAX_UPSCALE_FACTOR) =>
            {
                Err(format!(
                    "upscale factor must be in (0, {MAX_UPSCALE_FACTOR}], got {factor}"
                ))
            }
            PreprocessStep::Gaussian { sigma } if !(sigma.is_finite() && sigma > 0.0) => {
                Err(format!("gaussian sigma must be > 0, got {sigma}"))
            }
            PreprocessStep::Contrast { alpha } if !(alpha.is_finite() && alpha >= 0.0) => {
                Err(format!("contrast alpha must be >= 0, got {alpha}"))
            }
            PreprocessStep::Dilate { radius: 0 } | PreprocessStep::Erode { radius: 0 } => {
                Err("morphology radius must be > 0".into())
            }
            PreprocessStep::AdaptiveThreshold { block_radius: 0, .. } => {
                Err("adaptive_threshold block_radius must be > 0".into())
            }
            PreprocessStep::Clahe { clip_limit, .. }
                if !(clip_limit.is_finite() && clip_limit > 0.0) =>
            {
                Err(format!("clahe clip_limit must be > 0, got {clip_limit}"))
            }
            PreprocessStep::Clahe { tiles: 0, .. } => Err("clahe tiles must be > 0".into()),
            _ => Ok(()),
        }
    }

    /// Short tag used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PreprocessStep::Upscale { .. } => "UPSCALE",
            PreprocessStep::Grayscale => "GRAYSCALE",
            PreprocessStep::Gaussian { .. } => "GAUSSIAN",
            PreprocessStep::Equalize => "EQUALIZE",
            PreprocessStep::Sharpen => "SHARPEN",
            PreprocessStep::Contrast { .. } => "CONTRAST",
            PreprocessStep::Threshold { .. } => "THRESHOLD",
            PreprocessStep::AdaptiveThreshold { .. } => "ADAPTIVE_THRESHOLD",
            PreprocessStep::Clahe { .. } => "CLAHE",
            PreprocessStep::Dilate { .. } => "DILATE",
            PreprocessStep::Erode { .. } => "ERODE",
        }
    }

    /// True for steps that run before the median filter.
    pub fn runs_before_median(&self) -> bool {
        matches!(
            self,
            PreprocessStep::Upscale { .. } | PreprocessStep::Grayscale
        )
    }

    /// Dimensions of the image this step produces from a `width` x `height`
    /// input, computed without touching any pixels.
    pub fn output_dimensions(&self, width: u64, height: u64) -> (u64, u64) {
        match *self {
            PreprocessStep::Upscale { factor } => {
                (scaled_u64(width, factor), scaled_u64(height, factor))
            }
            _ => (width, height),
        }
    }

    /// Apply this step, returning an image in a working format.
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match *self {
            PreprocessStep::Upscale { factor } => {
                let width = scaled(image.width(), factor);
                let height = scaled(image.height(), factor);
                normalize(&image.resize_exact(width, height, FilterType::CatmullRom))
            }
            PreprocessStep::Grayscale => DynamicImage::ImageLuma8(image.to_luma8()),
            PreprocessStep::Gaussian { sigma } => match normalize(image) {
                DynamicImage::ImageLuma8(gray) => {
                    DynamicImage::ImageLuma8(imageproc::filter::gaussian_blur_f32(&gray, sigma))
                }
                other => DynamicImage::ImageRgb8(imageproc::filter::gaussian_blur_f32(
                    &other.to_rgb8(),
                    sigma,
                )),
            },
            PreprocessStep::Equalize => DynamicImage::ImageLuma8(
                imageproc::contrast::equalize_histogram(&image.to_luma8()),
            ),
            PreprocessStep::Sharpen => {
                DynamicImage::ImageLuma8(imageproc::filter::sharpen3x3(&image.to_luma8()))
            }
            PreprocessStep::Contrast { alpha } => {
                let mut out = normalize(image);
                match &mut out {
                    DynamicImage::ImageLuma8(gray) => gain(gray, alpha),
                    DynamicImage::ImageRgb8(rgb) => gain(rgb, alpha),
                    _ => {}
                }
                out
            }
            PreprocessStep::Threshold { level } => DynamicImage::ImageLuma8(
                imageproc::contrast::threshold(&image.to_luma8(), level, ThresholdType::Binary),
            ),
            PreprocessStep::AdaptiveThreshold {
                block_radius,
                offset,
            } => DynamicImage::ImageLuma8(adaptive_threshold(
                &image.to_luma8(),
                block_radius,
                offset,
            )),
            PreprocessStep::Clahe { clip_limit, tiles } => {
                DynamicImage::ImageLuma8(clahe(&image.to_luma8(), clip_limit, tiles))
            }
            PreprocessStep::Dilate { radius } => DynamicImage::ImageLuma8(
                imageproc::morphology::dilate(&image.to_luma8(), Norm::LInf, radius),
            ),
            PreprocessStep::Erode { radius } => DynamicImage::ImageLuma8(
                imageproc::morphology::erode(&image.to_luma8(), Norm::LInf, radius),
            ),
        }
    }
}

/// Run every step in order. An empty chain only normalizes the format.
pub fn apply_chain(steps: &[PreprocessStep], image: &DynamicImage) -> DynamicImage {
    steps
        .iter()
        .fold(normalize(image), |current, step| step.apply(&current))
}

/// Split a chain into the steps run before and after the median filter,
/// keeping the configured order inside each half.
pub fn split_at_median(steps: &[PreprocessStep]) -> (Vec<PreprocessStep>, Vec<PreprocessStep>) {
    steps.iter().cloned().partition(PreprocessStep::runs_before_median)
}

/// Dimensions after running the whole chain on a `width` x `height` image.
pub fn chain_dimensions(steps: &[PreprocessStep], width: u32, height: u32) -> (u64, u64) {
    steps
        .iter()
        .fold((width as u64, height as u64), |(w, h), step| {
            step.output_dimensions(w, h)
        })
}

/// Tag string describing a chain, e.g. `[UPSCALE][GRAYSCALE]`.
pub fn chain_label(steps: &[PreprocessStep]) -> String {
    let mut label = String::new();
    for step in steps {
        label.push('[');
        label.push_str(step.label());
        label.push(']');
    }
    label
}

fn scaled(dimension: u32, factor: f32) -> u32 {
    scaled_u64(dimension as u64, factor).min(u32::MAX as u64) as u32
}

fn scaled_u64(dimension: u64, factor: f32) -> u64 {
    ((dimension as f64) * factor as f64).round().max(1.0) as u64
}

fn adaptive_threshold(gray: &GrayImage, block_radius: u32, offset: i16) -> GrayImage {
    if offset == 0 {
        return imageproc::contrast::adaptive_threshold(gray, block_radius);
    }

    let (width, height) = gray.dimensions();
    let integral = integral_image::<_, u32>(gray);
    GrayImage::from_fn(width, height, |x, y| {
        let (left, top) = (x.saturating_sub(block_radius), y.saturating_sub(block_radius));
        let right = (x + block_radius).min(width - 1);
        let bottom = (y + block_radius).min(height - 1);
        let count = (right - left + 1) * (bottom - top + 1);
        let mean = sum_image_pixels(&integral, left, top, right, bottom)[0] / count;

        if gray.get_pixel(x, y).0[0] as i32 >= mean as i32 - offset as i32 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Per-tile equalization with clipped histograms, blended bilinearly
/// between the centres of neighbouring tiles.
fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = (tx * tile_w).min(width);
            let y0 = (ty * tile_h).min(height);
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(gray, (x0, y0, x1, y1), clip_limit));
        }
    }

    let axis = |pos: u32, tile: u32, count: u32| -> (usize, usize, f32) {
        let t = ((pos as f32 + 0.5) / tile as f32 - 0.5).clamp(0.0, (count - 1) as f32);
        let i0 = t.floor() as u32;
        let i1 = (i0 + 1).min(count - 1);
        (i0 as usize, i1 as usize, t - i0 as f32)
    };

    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y).0[0] as usize;
        let (x0, x1, ax) = axis(x, tile_w, tiles_x);
        let (y0, y1, ay) = axis(y, tile_h, tiles_y);
        let row = tiles_x as usize;
        let at = |tx: usize, ty: usize| luts[ty * row + tx][value] as f32;

        let top = at(x0, y0) * (1.0 - ax) + at(x1, y0) * ax;
        let bottom = at(x0, y1) * (1.0 - ax) + at(x1, y1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_lut(
    gray: &GrayImage,
    (x0, y0, x1, y1): (u32, u32, u32, u32),
    clip_limit: f32,
) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let area = x1.saturating_sub(x0) as u64 * y1.saturating_sub(y0) as u64;
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let mut hist = [0u64; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let limit = ((clip_limit as f64 * area as f64 / 256.0) as u64).max(1);
    let mut excess = 0u64;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u64::from(i < remainder);
    }

    let mut cumulative = 0u64;
    for (bin, v) in hist.iter().zip(lut.iter_mut()) {
        cumulative += bin;
        *v = (cumulative * 255 / area).min(255) as u8;
    }
    lut
}

fn gain<P>(buffer: &mut ImageBuffer<P, Vec<u8>>, alpha: f32)
where
    P: Pixel<Subpixel = u8>,
{
    for pixel in buffer.pixels_mut() {
        for value in pixel.channels_mut() {
            *value = (*value as f32 * alpha).round().clamp(0.0, 255.0) as u8;
        }
    }
}
