use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use ndarray::Array3;
use raster_change::{
    ChangeDetector,
    analysis::pixel_change::PixelChangeDetector,
    raster::{BandLayout, ElementType, RasterImage},
};

fn scene(offset: usize) -> RasterImage {
    let data = Array3::from_shape_fn((5, 512, 512), |(b, y, x)| ((b * 31 + y * 7 + x * 3 + offset) % 4096) as f64);
    RasterImage::new(data, BandLayout::BandMajor, ElementType::U16).unwrap()
}

fn bench_pixel_change(c: &mut Criterion) {
    let (before, after) = (scene(0), scene(17));

    c.bench_function("pixel_change_parallel", |b| {
        let detector = PixelChangeDetector::new(1.0).unwrap();
        b.iter(|| detector.detect(black_box(&before), black_box(&after)).unwrap())
    });

    c.bench_function("pixel_change_sequential", |b| {
        let detector = PixelChangeDetector::new(1.0).unwrap().with_parallel(false);
        b.iter(|| detector.detect(black_box(&before), black_box(&after)).unwrap())
    });

    c.bench_function("full_analysis", |b| {
        let detector = ChangeDetector::new();
        b.iter(|| detector.analyze(black_box(&before), black_box(&after)).unwrap())
    });
}

criterion_group!(benches, bench_pixel_change);
criterion_main!(benches);
