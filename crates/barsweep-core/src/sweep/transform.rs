//! Raster operations used by the sweep: working-format normalization, median
//! filtering and edge-replicating rotation.

use image::{DynamicImage, ImageBuffer, Pixel};
use imageproc::filter::median_filter;

/// Bring an image into one of the two working formats: 8-bit luma stays luma,
/// everything else becomes 8-bit RGB.
pub fn normalize(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) => {
            DynamicImage::ImageLuma8(image.to_luma8())
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Median filter with a square `kernel_size` window. Borders are clamped.
///
/// A kernel of 1 returns the image unchanged.
pub fn median(image: &DynamicImage, kernel_size: u32) -> DynamicImage {
    let radius = kernel_size / 2;
    match image {
        _ if radius == 0 => normalize(image),
        DynamicImage::ImageLuma8(gray) => {
            DynamicImage::ImageLuma8(median_filter(gray, radius, radius))
        }
        DynamicImage::ImageRgb8(rgb) => {
            DynamicImage::ImageRgb8(median_filter(rgb, radius, radius))
        }
        other => median(&normalize(other), kernel_size),
    }
}

/// Rotate counter-clockwise about the image centre by `degrees`.
///
/// Output keeps the input dimensions; samples that fall outside the source
/// take the nearest edge pixel.
pub fn rotate(image: &DynamicImage, degrees: u32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => {
            DynamicImage::ImageLuma8(rotate_replicate(gray, degrees as f64))
        }
        DynamicImage::ImageRgb8(rgb) => {
            DynamicImage::ImageRgb8(rotate_replicate(rgb, degrees as f64))
        }
        other => rotate(&normalize(other), degrees),
    }
}

/// Bilinear rotation with border replication (clamped source coordinates).
fn rotate_replicate<P>(src: &ImageBuffer<P, Vec<u8>>, degrees: f64) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    let mut out = ImageBuffer::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width - 1) as f64 / 2.0;
    let cy = (height - 1) as f64 / 2.0;
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    let channels = P::CHANNEL_COUNT as usize;

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        // Inverse mapping: where in the source this output pixel comes from.
        let sx = (cx + cos * dx - sin * dy).clamp(0.0, max_x);
        let sy = (cy + sin * dx + cos * dy).clamp(0.0, max_y);

        let x0 = sx.floor() as u32;
        let y0 = sy.floor() as u32;
        let x1 = (x0 + 1).min(width - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fx = sx - x0 as f64;
        let fy = sy - y0 as f64;

        let p00 = src.get_pixel(x0, y0).channels();
        let p10 = src.get_pixel(x1, y0).channels();
        let p01 = src.get_pixel(x0, y1).channels();
        let p11 = src.get_pixel(x1, y1).channels();

        let dst = pixel.channels_mut();
        for c in 0..channels {
            let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
            let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
            dst[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}
