//! Planner Benchmarks
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package adapt-media --bench planner
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use adapt_media::{CompositionPipeline, GeometryPlanner};
use adapt_models::{AdaptMode, BoundingBox, CompositionOptions, FormatProfile, RoiBox, RoiCategory, SourceGeometry};

fn synthetic_rois(count: usize) -> Vec<RoiBox> {
    (0..count)
        .map(|i| {
            let f = i as f64;
            let category = match i % 4 {
                0 => RoiCategory::Logo,
                1 => RoiCategory::Text,
                2 => RoiCategory::Face,
                _ => RoiCategory::Generic,
            };
            RoiBox::new(
                f * 0.5,
                BoundingBox::new((f * 97.0) % 1700.0, (f * 53.0) % 900.0, 120.0, 80.0),
                category,
                0.4 + (i % 6) as f64 * 0.1,
            )
        })
        .collect()
}

fn bench_plan(c: &mut Criterion) {
    let planner = GeometryPlanner::default();
    let source = SourceGeometry::new(1920, 1080);
    let billboard = Arc::new(FormatProfile::custom("BILLBOARD_14x48", 1680, 480, 30));

    let mut group = c.benchmark_group("plan_fill");
    for count in [0usize, 10, 100, 1000] {
        let rois = synthetic_rois(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &rois, |b, rois| {
            b.iter(|| planner.plan(black_box(source), &billboard, AdaptMode::Fill, black_box(rois)))
        });
    }
    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let planner = GeometryPlanner::default();
    let pipeline = CompositionPipeline::default();
    let portrait = Arc::new(FormatProfile::custom("PORTRAIT", 1080, 1920, 30));
    let plan = match planner.plan(SourceGeometry::new(1920, 1080), &portrait, AdaptMode::Fit, &[]) {
        Ok(plan) => plan,
        Err(e) => panic!("planning failed: {e}"),
    };
    let options = CompositionOptions::new(true, true);

    c.bench_function("compose_fit_blur_enhance", |b| {
        b.iter(|| pipeline.compose(black_box(&plan), black_box(&options)))
    });
}

criterion_group!(benches, bench_plan, bench_compose);
criterion_main!(benches);
