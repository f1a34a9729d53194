//! Interpolation algorithms for filling gaps between sampled stroke points

use serde::{Deserialize, Serialize};

use super::BrushPoint;

/// Interpolation mode for brush strokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationMode {
    /// No interpolation
    None,
    /// Linear interpolation
    #[default]
    Linear,
    /// Catmull-Rom spline (smooth curves)
    CatmullRom,
}

/// Points along the segment `p1 -> p2`, excluding `p1` and ending exactly on `p2`.
/// `p0` and `p3` are the neighbours used by the spline; pass `p1`/`p2` again at
/// the ends of a stroke.
pub fn segment_points(
    mode: InterpolationMode,
    p0: &BrushPoint,
    p1: &BrushPoint,
    p2: &BrushPoint,
    p3: &BrushPoint,
    spacing: f32,
) -> Vec<BrushPoint> {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let segment_length = (dx * dx + dy * dy).sqrt();

    if mode == InterpolationMode::None || !(spacing > 0.0) || segment_length <= spacing {
        return vec![*p2];
    }

    let steps = (segment_length / spacing).ceil() as usize;
    let step_distance = segment_length / steps as f32;
    (1..=steps)
        .map(|step| {
            if step == steps {
                return BrushPoint {
                    distance: step_distance,
                    ..*p2
                };
            }
            let t = step as f32 / steps as f32;
            let mut point = match mode {
                InterpolationMode::CatmullRom => catmull_rom_point(p0, p1, p2, p3, t),
                _ => lerp_point(p1, p2, t),
            };
            point.distance = step_distance;
            point
        })
        .collect()
}

/// Linear gap filling at `spacing` pixels
pub fn interpolate_linear(points: &[BrushPoint], spacing: f32) -> Vec<BrushPoint> {
    interpolate(InterpolationMode::Linear, points, spacing)
}

/// Catmull-Rom spline interpolation for smooth curves
///
/// This produces natural-looking curves that pass through all control points.
/// End segments reuse the end point as the missing neighbour.
pub fn interpolate_catmull_rom(points: &[BrushPoint], spacing: f32) -> Vec<BrushPoint> {
    interpolate(InterpolationMode::CatmullRom, points, spacing)
}

pub fn interpolate(mode: InterpolationMode, points: &[BrushPoint], spacing: f32) -> Vec<BrushPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(points.len() * 4);
    result.push(*first);

    // Process each segment (need 4 points for each segment)
    for i in 0..points.len() - 1 {
        let p0 = if i == 0 { &points[0] } else { &points[i - 1] };
        let p1 = &points[i];
        let p2 = &points[i + 1];
        let p3 = if i + 2 < points.len() {
            &points[i + 2]
        } else {
            &points[points.len() - 1]
        };
        result.extend(segment_points(mode, p0, p1, p2, p3, spacing));
    }

    result
}

fn lerp_point(a: &BrushPoint, b: &BrushPoint, t: f32) -> BrushPoint {
    let lerp = |x: f32, y: f32| x + (y - x) * t;
    BrushPoint {
        x: lerp(a.x, b.x),
        y: lerp(a.y, b.y),
        pressure: lerp(a.pressure, b.pressure),
        tilt_x: lerp(a.tilt_x, b.tilt_x),
        tilt_y: lerp(a.tilt_y, b.tilt_y),
        velocity: lerp(a.velocity, b.velocity),
        timestamp: a.timestamp + (b.timestamp - a.timestamp) * t as f64,
        distance: 0.0,
        uv: a.uv.zip(b.uv).map(|(ua, ub)| ua.lerp(ub, t)),
        world: a.world.zip(b.world).map(|(wa, wb)| wa.lerp(wb, t)),
    }
}

/// Calculate a single point on a Catmull-Rom spline
fn catmull_rom_point(
    p0: &BrushPoint,
    p1: &BrushPoint,
    p2: &BrushPoint,
    p3: &BrushPoint,
    t: f32,
) -> BrushPoint {
    let t2 = t * t;
    let t3 = t2 * t;

    // Catmull-Rom basis functions
    let b0 = -0.5 * t3 + t2 - 0.5 * t;
    let b1 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let b2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let b3 = 0.5 * t3 - 0.5 * t2;

    // Position follows the spline; the remaining channels are interpolated
    // linearly so pressure never overshoots its sampled range
    BrushPoint {
        x: b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        y: b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
        ..lerp_point(p1, p2, t)
    }
}

/// Calculate the length of a path through points
pub fn path_length(points: &[BrushPoint]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| {
            let dx = w[1].x - w[0].x;
            let dy = w[1].y - w[0].y;
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}
