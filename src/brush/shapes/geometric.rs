//! Hard-edged geometric shapes

use std::f32::consts::SQRT_2;

use image::RgbaImage;

use super::{fill_pixels, hard_falloff, smoothstep, ShapeContext};

/// Outward edge normals of an upward-pointing equilateral triangle (y down)
const TRIANGLE_NORMALS: [(f32, f32); 3] = [(0.0, 1.0), (-0.866_025_4, -0.5), (0.866_025_4, -0.5)];

pub fn round(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        Some((ctx.color_at(x, y), ctx.opacity * hard_falloff(d, ctx.hardness)))
    });
}

pub fn square(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let (dx, dy) = ctx.rotated_offset(x, y);
        let d = dx.abs().max(dy.abs()) / ctx.radius;
        if d > 1.0 {
            return None;
        }
        Some((ctx.color_at(x, y), ctx.opacity * hard_falloff(d, ctx.hardness)))
    });
}

pub fn diamond(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let (dx, dy) = ctx.rotated_offset(x, y);
        let d = (dx.abs() + dy.abs()) / SQRT_2 / ctx.radius;
        if d > 1.0 {
            return None;
        }
        Some((ctx.color_at(x, y), ctx.opacity * hard_falloff(d, ctx.hardness)))
    });
}

/// Equilateral triangle inscribed in the brush circle. Distance is measured
/// against the edge of the angular sector the pixel falls in, scaled so the
/// edge midpoints (at half the radius) sit at 1.0.
pub fn triangle(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let inradius = ctx.radius * 0.5;
    fill_pixels(buffer, |x, y| {
        let (dx, dy) = ctx.rotated_offset(x, y);
        let d = TRIANGLE_NORMALS
            .iter()
            .map(|(nx, ny)| dx * nx + dy * ny)
            .fold(f32::MIN, f32::max)
            / inradius;
        if d > 1.0 {
            return None;
        }
        Some((ctx.color_at(x, y), ctx.opacity * hard_falloff(d.max(0.0), ctx.hardness)))
    });
}

/// Flat nib: an ellipse rotated by the brush angle, minor axis `0.3 * roundness`
pub fn calligraphy(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let aspect = (ctx.settings.roundness * 0.3).clamp(0.05, 1.0);
    let minor = ctx.radius * aspect;
    fill_pixels(buffer, |x, y| {
        let (u, v) = ctx.rotated_offset(x, y);
        let nu = u / ctx.radius;
        let nv = v / minor;
        let d = (nu * nu + nv * nv).sqrt();
        if d > 1.0 {
            return None;
        }
        let edge = 1.0 - smoothstep(0.85, 1.0, d);
        let ink_flow = 0.9 + 0.1 * (u * 0.5).sin();
        Some((ctx.color_at(x, y), ctx.opacity * edge * ink_flow))
    });
}

/// Square outline cut into a checkerboard of filled and empty cells
pub fn stencil(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let cell = (ctx.radius / 4.0).max(2.0);
    fill_pixels(buffer, |x, y| {
        let (dx, dy) = ctx.rotated_offset(x, y);
        let d = dx.abs().max(dy.abs()) / ctx.radius;
        if d > 1.0 {
            return None;
        }
        let cell_index = (dx / cell).floor() as i64 + (dy / cell).floor() as i64;
        if cell_index.rem_euclid(2) != 0 {
            return None;
        }
        let edge = if d > 0.95 { (1.0 - d) / 0.05 } else { 1.0 };
        Some((ctx.color_at(x, y), ctx.opacity * edge))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::settings::BrushSettings;

    fn render(f: super::super::Synthesizer, settings: &BrushSettings) -> RgbaImage {
        let side = (settings.size * 2.0).ceil() as u32;
        let mut buffer = RgbaImage::new(side, side);
        let ctx = ShapeContext::new(settings, side, settings.size / 2.0, 0);
        f(&mut buffer, &ctx);
        buffer
    }

    #[test]
    fn square_fills_corners_round_does_not() {
        let settings = BrushSettings {
            size: 40.0,
            ..Default::default()
        };
        // (55, 55) is 15px along both axes from the centre (40, 40): inside the
        // square of half-side 20, outside the circle of radius 20
        assert!(render(square, &settings).get_pixel(55, 55)[3] > 0);
        assert_eq!(render(round, &settings).get_pixel(55, 55)[3], 0);
    }

    #[test]
    fn triangle_points_up() {
        let settings = BrushSettings {
            size: 40.0,
            ..Default::default()
        };
        let buffer = render(triangle, &settings);
        // Apex above the centre is painted, the same distance below is past the base
        assert!(buffer.get_pixel(40, 25)[3] > 0);
        assert_eq!(buffer.get_pixel(40, 55)[3], 0);
    }

    #[test]
    fn calligraphy_follows_angle() {
        let flat = BrushSettings {
            size: 40.0,
            ..Default::default()
        };
        let turned = BrushSettings {
            angle: 90.0,
            ..flat.clone()
        };
        let a = render(calligraphy, &flat);
        let b = render(calligraphy, &turned);
        // Horizontal nib reaches far along x, vertical nib along y
        assert!(a.get_pixel(55, 40)[3] > 0);
        assert_eq!(a.get_pixel(40, 55)[3], 0);
        assert!(b.get_pixel(40, 55)[3] > 0);
    }

    #[test]
    fn stencil_has_holes() {
        let settings = BrushSettings {
            size: 40.0,
            ..Default::default()
        };
        let buffer = render(stencil, &settings);
        let inside: Vec<_> = (25..55).map(|x| buffer.get_pixel(x, 41)[3]).collect();
        assert!(inside.iter().any(|a| *a == 255));
        assert!(inside.iter().any(|a| *a == 0));
    }
}
