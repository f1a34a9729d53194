//! Brush engine benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use puffbrush_lib::brush::{BrushEngine, BrushPoint, BrushSettings, BrushShape};
use puffbrush_lib::config::EngineConfig;
use puffbrush_lib::puff::PuffParameters;
use puffbrush_lib::surface::RasterSurface;

fn generate_stroke(count: usize) -> Vec<BrushPoint> {
    (0..count)
        .map(|i| {
            let t = i as f32 / count as f32;
            BrushPoint {
                timestamp: i as f64,
                ..BrushPoint::new(
                    t * 1000.0,
                    (t * std::f32::consts::PI * 4.0).sin() * 100.0 + 500.0,
                    0.3 + t * 0.4,
                )
            }
        })
        .collect()
}

fn engine() -> BrushEngine {
    BrushEngine::new(EngineConfig {
        jitter_seed: Some(0),
        ..Default::default()
    })
}

fn benchmark_stamp_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stamp Synthesis");

    for shape in [
        BrushShape::Round,
        BrushShape::Watercolor,
        BrushShape::Spray,
        BrushShape::Charcoal,
        BrushShape::Calligraphy,
    ] {
        let settings = BrushSettings {
            size: 64.0,
            hardness: 0.5,
            shape,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new("uncached", format!("{:?}", shape)),
            &settings,
            |b, settings| {
                b.iter(|| {
                    // Fresh engine so every iteration synthesizes
                    let mut engine = engine();
                    engine.create_brush_stamp(settings)
                })
            },
        );
    }

    let settings = BrushSettings::default();
    let mut cached = engine();
    cached.create_brush_stamp(&settings);
    group.bench_function("cache_hit", |b| b.iter(|| cached.create_brush_stamp(&settings)));

    group.finish();
}

fn benchmark_stroke_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stroke Rendering");

    for count in [10, 100, 500].iter() {
        let points = generate_stroke(*count);
        let settings = BrushSettings {
            size: 24.0,
            ..Default::default()
        };
        let mut engine = engine();
        let mut surface = RasterSurface::new(1024, 1024);

        group.bench_with_input(BenchmarkId::new("render", count), &points, |b, points| {
            b.iter(|| engine.render_brush_stroke(points, &settings, &mut surface))
        });
    }

    // Pressure-driven size defeats the cache more often
    let points = generate_stroke(100);
    let settings = BrushSettings {
        size: 24.0,
        dynamics: puffbrush_lib::brush::DynamicsSettings {
            size_pressure: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut engine = engine();
    let mut surface = RasterSurface::new(1024, 1024);
    group.bench_function("size_pressure", |b| {
        b.iter(|| engine.render_brush_stroke(&points, &settings, &mut surface))
    });

    group.finish();
}

fn benchmark_puff_stroke(c: &mut Criterion) {
    let points = generate_stroke(50);
    let params = PuffParameters::default();
    let mut engine = engine();
    let mut paint = RasterSurface::new(1024, 1024);
    let mut displacement = RasterSurface::displacement(1024, 1024);

    c.bench_function("puff_stroke", |b| {
        b.iter(|| engine.puff_stroke(&points, &params, &mut paint, &mut displacement))
    });
}

criterion_group!(
    benches,
    benchmark_stamp_synthesis,
    benchmark_stroke_rendering,
    benchmark_puff_stroke
);
criterion_main!(benches);
