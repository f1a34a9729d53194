//! Wet and opaque paint media
//!
//! Each medium has a characteristic base opacity and colour treatment:
//!
//! | medium     | base opacity | colour            | edge                         |
//! |------------|--------------|-------------------|------------------------------|
//! | watercolor | 0.4          | granulation noise | soft, bleeds to 1.25, darker rim |
//! | oil        | 1.0          | stroke ridges, x1.08 gloss | smooth                |
//! | acrylic    | 0.95         | saturation x1.15  | firm                         |
//! | gouache    | 0.95         | matte x0.92       | smooth plateau               |
//! | ink        | 1.0          | x0.95             | squared, sharp               |

use image::RgbaImage;

use super::{fill_pixels, hard_falloff, smoothstep, ShapeContext};

const WATERCOLOR_BLEED: f32 = 1.25;

pub fn watercolor(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > WATERCOLOR_BLEED {
            return None;
        }

        let granulation =
            0.85 + 0.075 * ((x * 0.8).sin() * (y * 0.8).sin() + ((x - y) * 0.37).cos());

        let (falloff, rim) = if d <= 1.0 {
            (
                1.0 - 0.5 * smoothstep(0.6, 1.0, d),
                1.0 + 0.3 * smoothstep(0.75, 1.0, d),
            )
        } else {
            // Pigment bleeding past the nominal edge
            (0.5 * (WATERCOLOR_BLEED - d) / (WATERCOLOR_BLEED - 1.0), 1.0)
        };

        let alpha = ctx.opacity * 0.4 * falloff * granulation * rim;
        Some((ctx.color_at(x, y), alpha))
    });
}

pub fn oil(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let (sin, cos) = ctx.angle.sin_cos();
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        // Bristle ridges run along the brush direction
        let across = -(x - ctx.cx) * sin + (y - ctx.cy) * cos;
        let ridges = 0.9 + 0.1 * (across * 0.9).sin();
        let color = ctx.color_at(x, y).scaled(1.08 * ridges);
        let falloff = 1.0 - smoothstep(0.85, 1.0, d);
        Some((color, ctx.opacity * falloff))
    });
}

pub fn acrylic(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let color = ctx.color_at(x, y).saturated(1.15);
        Some((color, ctx.opacity * 0.95 * hard_falloff(d, 0.9)))
    });
}

pub fn gouache(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let color = ctx.color_at(x, y).scaled(0.92);
        Some((color, ctx.opacity * 0.95 * (1.0 - d.powi(6))))
    });
}

pub fn ink(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let edge = ((1.0 - d) / 0.1).clamp(0.0, 1.0).powi(2);
        let color = ctx.color_at(x, y).scaled(0.95);
        Some((color, ctx.opacity * edge))
    });
}
