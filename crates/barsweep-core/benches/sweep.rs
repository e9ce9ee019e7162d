//! Benchmarks for the rotation sweep.
//!
//! Run with: cargo bench -p barsweep-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, Luma};

use barsweep_core::sweep::transform;
use barsweep_core::{FnDecoder, RotationSweepDecoder, SweepParams};

fn label_image(size: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(size, size, |x, y| {
        Luma([if (x / 4 + y / 16) % 2 == 0 { 0 } else { 255 }])
    }))
}

fn benchmark_median(c: &mut Criterion) {
    let img = label_image(256);

    c.bench_function("median_k7_256", |b| {
        b.iter(|| transform::median(black_box(&img), 7))
    });
}

fn benchmark_rotate(c: &mut Criterion) {
    let img = label_image(256);

    c.bench_function("rotate_37deg_256", |b| {
        b.iter(|| transform::rotate(black_box(&img), 37))
    });
}

fn benchmark_full_sweep(c: &mut Criterion) {
    let img = label_image(256);
    let sweep = RotationSweepDecoder::new(SweepParams::default()).unwrap();
    let decoder = FnDecoder::new("never", |_: &DynamicImage| Vec::new());

    c.bench_function("sweep_36_angles_256", |b| {
        b.iter(|| sweep.decode("bench", black_box(&img), &decoder))
    });
}

criterion_group!(benches, benchmark_median, benchmark_rotate, benchmark_full_sweep);
criterion_main!(benches);
