//! End-to-end behaviour of stamps, strokes and puffs

#![allow(clippy::unwrap_used)]

use super::*;
use crate::config::EngineConfig;
use crate::perf::PerformanceGovernor;
use crate::puff::{calculate_displacement_value, PuffEngine, PuffParameters};
use crate::surface::{RasterSurface, TargetSurface};

fn builder() -> (StampBuilder, ImageStore, PerformanceGovernor) {
    (
        StampBuilder::new(&EngineConfig::default()),
        ImageStore::new(),
        PerformanceGovernor::default(),
    )
}

fn settings(shape: BrushShape) -> BrushSettings {
    BrushSettings {
        size: 24.0,
        hardness: 0.6,
        angle: 30.0,
        color: "#336699".to_string(),
        shape,
        ..Default::default()
    }
}

#[test]
fn every_shape_is_reproducible() {
    for shape in BrushShape::ALL {
        let (mut a, images, mut gov) = builder();
        let (mut b, _, _) = builder();
        let first = a.create_brush_stamp(&settings(shape), &images, &mut gov);
        let second = b.create_brush_stamp(&settings(shape), &images, &mut gov);
        assert_eq!(first.source, StampSource::Procedural, "{:?}", shape);
        assert_eq!(first.image.as_raw(), second.image.as_raw(), "{:?}", shape);
        assert!(first.image.pixels().any(|p| p[3] > 0), "{:?} is empty", shape);
    }
}

#[test]
fn equal_keys_give_identical_stamps() {
    let (mut stamps, images, mut gov) = builder();
    let a = BrushSettings {
        flow: 0.2,
        spacing: 0.9,
        ..settings(BrushShape::Spray)
    };
    let b = BrushSettings {
        flow: 1.0,
        spacing: 0.05,
        angle: 390.0,
        ..settings(BrushShape::Spray)
    };
    assert_eq!(stamp_cache_key(&a, &images), stamp_cache_key(&b, &images));

    let first = stamps.create_brush_stamp(&a, &images, &mut gov);
    let second = stamps.create_brush_stamp(&b, &images, &mut gov);
    assert_eq!(second.source, StampSource::Cache);
    assert_eq!(first.image.as_raw(), second.image.as_raw());

    // A fresh builder synthesizes the same pixels
    let (mut fresh, _, _) = builder();
    let third = fresh.create_brush_stamp(&b, &images, &mut gov);
    assert_eq!(first.image.as_raw(), third.image.as_raw());
}

#[test]
fn hard_round_scenario() {
    let (mut stamps, images, mut gov) = builder();
    let round = BrushSettings {
        size: 20.0,
        opacity: 1.0,
        hardness: 1.0,
        color: "#000000".to_string(),
        ..Default::default()
    };
    let stamp = stamps.create_brush_stamp(&round, &images, &mut gov);
    assert_eq!(stamp.side(), 40);
    assert_eq!(stamp.image.get_pixel(20, 20).0, [0, 0, 0, 255]);
    // Normalized distance 1 from the centre
    assert_eq!(stamp.image.get_pixel(30, 20)[3], 0);
    assert_eq!(stamp.image.get_pixel(20, 10)[3], 0);
    assert_eq!(stamp.image.get_pixel(0, 0)[3], 0);
}

#[test]
fn linear_gradient_stamp_blends_at_centre() {
    let (mut stamps, images, mut gov) = builder();
    let gradient = BrushSettings {
        size: 20.0,
        gradient: Some(GradientSettings {
            kind: GradientKind::Linear,
            stops: vec![
                GradientStop::new(0.0, "#ff0000"),
                GradientStop::new(100.0, "#0000ff"),
            ],
            angle: 0.0,
        }),
        ..Default::default()
    };
    let stamp = stamps.create_brush_stamp(&gradient, &images, &mut gov);
    let [r, g, b, a] = stamp.image.get_pixel(20, 20).0;
    assert!((r as i32 - 0x7f).abs() <= 1, "r = {}", r);
    assert_eq!(g, 0);
    assert!((b as i32 - 0x7f).abs() <= 1, "b = {}", b);
    assert_eq!(a, 255);

    // Left side leans red, right side leans blue
    let left = stamp.image.get_pixel(13, 20);
    let right = stamp.image.get_pixel(27, 20);
    assert!(left[0] > left[2]);
    assert!(right[2] > right[0]);
}

#[test]
fn builder_cache_keeps_insertion_order_bound() {
    let (mut stamps, images, mut gov) = builder();
    for i in 0..150 {
        let size = BrushSettings {
            size: 1.0 + i as f32,
            ..Default::default()
        };
        stamps.create_brush_stamp(&size, &images, &mut gov);
        assert!(stamps.cache().len() <= 100);
    }
    assert_eq!(stamps.cache().len(), 90);
    let oldest = stamps.cache().keys().next().unwrap();
    assert!(oldest.starts_with("{\"size\":61.0,"), "{}", oldest);
    assert_eq!(gov.cache_misses(), 150);
}

#[test]
fn pressure_stroke_shrinks_footprint() {
    let mut engine = BrushEngine::new(EngineConfig {
        jitter_seed: Some(1),
        ..Default::default()
    });
    let settings = BrushSettings {
        size: 20.0,
        dynamics: DynamicsSettings {
            size_pressure: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let pressures = [1.0, 0.5, 0.2];
    let sizes: Vec<f32> = pressures
        .iter()
        .enumerate()
        .map(|(i, &p)| calculate_dynamics(&BrushPoint::new(0.0, 0.0, p), &settings, i).size)
        .collect();
    assert_eq!(sizes, vec![20.0, 10.0, 4.0]);

    let mut surface = RasterSurface::new(120, 40);
    let points: Vec<BrushPoint> = pressures
        .iter()
        .enumerate()
        .map(|(i, &p)| BrushPoint::new(20.0 + i as f32 * 40.0, 20.0, p))
        .collect();
    engine.render_brush_stroke(&points, &settings, &mut surface);

    let painted_width = |cx: u32| {
        (cx.saturating_sub(15)..cx + 15)
            .filter(|&x| surface.image().get_pixel(x, 20)[3] > 0)
            .count()
    };
    let widths = [painted_width(20), painted_width(60), painted_width(100)];
    assert!(widths[0] > widths[1] && widths[1] > widths[2], "{:?}", widths);
    assert_eq!(engine.cached_stamps(), 3);
}

#[test]
fn puff_displacement_stays_in_range() {
    let engine = PuffEngine::default();
    let images = ImageStore::new();
    let mut paint = RasterSurface::new(100, 100);
    let mut displacement = RasterSurface::displacement(100, 100);
    let params = PuffParameters {
        size: 40.0,
        height: 1.0,
        ..Default::default()
    };
    let points = [BrushPoint::new(30.0, 50.0, 1.0), BrushPoint::new(70.0, 50.0, 1.0)];
    engine.puff_stroke(&points, &params, &images, &mut paint, &mut displacement);

    for (x, y, p) in displacement.image().enumerate_pixels() {
        assert!(p[0] >= 128, "({}, {}) = {}", x, y, p[0]);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[3], 255);
        // Nothing is raised further than one radius from the path
        let outside = (y as f32 + 0.5 - 50.0).abs() > 20.0 || x > 91 || x < 9;
        if outside {
            assert_eq!(p[0], 128, "({}, {})", x, y);
        }
    }
    assert_eq!(calculate_displacement_value(0.0, 50.0, 1.0, 0.5), 255);
    assert_eq!(calculate_displacement_value(60.0, 50.0, 1.0, 0.5), 128);
}
