use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, RgbImage};
use img_prep::{target_dimensions, transform, ConversionOptions, TargetFormat};
use std::io::Cursor;

fn create_test_image(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn bench_target_dimensions(c: &mut Criterion) {
    c.bench_function("target_dimensions", |b| {
        b.iter(|| target_dimensions(black_box(6000), black_box(4000), black_box(1568)))
    });
}

fn bench_transform_formats(c: &mut Criterion) {
    let source = create_test_image(2400, 1600);
    let mut group = c.benchmark_group("transform");
    group.sample_size(10);

    for format in [TargetFormat::Jpeg, TargetFormat::Png, TargetFormat::WebP] {
        let options = ConversionOptions::new(format, Some(80), Some(1568), false).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(format), &options, |b, options| {
            b.iter(|| transform(black_box(&source), options))
        });
    }

    group.finish();
}

fn bench_png_quality_tiers(c: &mut Criterion) {
    let source = create_test_image(640, 480);
    let mut group = c.benchmark_group("png_quality");
    group.sample_size(10);

    // one quality per deflater tier
    for quality in [60u8, 80, 95] {
        let options =
            ConversionOptions::new(TargetFormat::Png, Some(quality), None, false).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(quality), &options, |b, options| {
            b.iter(|| transform(black_box(&source), options))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_target_dimensions,
    bench_transform_formats,
    bench_png_quality_tiers
);
criterion_main!(benches);
