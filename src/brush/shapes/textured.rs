//! Dry media and effect brushes: a deterministic sinusoidal grain over a
//! Gaussian-like radial falloff.

use image::RgbaImage;

use super::{fill_pixels, hard_falloff, soft_falloff, ShapeContext};

const HIGHLIGHTER_MAX_ALPHA: f32 = 0.3;
const BLUR_REACH: f32 = 1.5;
const SMUDGE_REACH: f32 = 1.3;

pub fn texture(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let grain = 0.7 + 0.3 * (x * 0.5).sin() * (y * 0.5).cos() * ((x + y) * 0.25).sin();
        Some((ctx.color_at(x, y), ctx.opacity * soft_falloff(d, ctx.hardness) * grain))
    });
}

pub fn pencil(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let hardness = ctx.hardness.max(0.6);
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let grain = 0.55 + 0.45 * (x * 2.1 + y * 0.4).sin().abs() * (y * 1.9 - x * 0.3).cos().abs();
        Some((ctx.color_at(x, y), ctx.opacity * 0.9 * hard_falloff(d, hardness) * grain))
    });
}

pub fn pastel(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let grain = 0.65 + 0.35 * ((x * 1.3).sin() * (y * 1.7).cos()).abs();
        Some((ctx.color_at(x, y), ctx.opacity * soft_falloff(d, ctx.hardness) * grain))
    });
}

pub fn marker(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let hardness = ctx.hardness.max(0.85);
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let streaks = 0.92 + 0.08 * (y * 0.6).sin();
        Some((ctx.color_at(x, y), ctx.opacity * 0.9 * hard_falloff(d, hardness) * streaks))
    });
}

/// Translucent marker; alpha never exceeds 30 %
pub fn highlighter(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let grain = 0.95 + 0.05 * (x * 0.3).sin();
        let alpha = (ctx.opacity * hard_falloff(d, 0.9) * grain).min(HIGHLIGHTER_MAX_ALPHA);
        Some((ctx.color_at(x, y), alpha))
    });
}

/// Rubber stamp: flat super-Gaussian body with ink speckle
pub fn stamp(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let body = (-d.powi(4) * 3.0).exp();
        let speckle = 0.85 + 0.15 * (x * 1.7).sin() * (y * 1.3).cos();
        Some((ctx.color_at(x, y), ctx.opacity * body * speckle))
    });
}

pub fn blur(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > BLUR_REACH {
            return None;
        }
        let n = d / BLUR_REACH;
        let falloff = (-n * n * 3.0).exp();
        let grain = 0.95 + 0.05 * ((x + y) * 0.2).sin();
        Some((ctx.color_at(x, y), ctx.opacity * 0.5 * falloff * grain))
    });
}

pub fn smudge(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let (sin, cos) = ctx.angle.sin_cos();
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > SMUDGE_REACH {
            return None;
        }
        let along = (x - ctx.cx) * cos + (y - ctx.cy) * sin;
        let smear = 0.8 + 0.2 * (along * 0.3).sin();
        let n = d / SMUDGE_REACH;
        let falloff = (-n * n * 3.0).exp();
        Some((ctx.color_at(x, y), ctx.opacity * 0.6 * falloff * smear))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::settings::BrushSettings;

    fn render(f: super::super::Synthesizer) -> RgbaImage {
        let settings = BrushSettings {
            size: 40.0,
            ..Default::default()
        };
        let mut buffer = RgbaImage::new(80, 80);
        let ctx = ShapeContext::new(&settings, 80, 20.0, 0);
        f(&mut buffer, &ctx);
        buffer
    }

    #[test]
    fn blur_and_smudge_diffuse_past_radius() {
        // 24px from centre, radius 20
        assert!(render(blur).get_pixel(64, 40)[3] > 0);
        assert!(render(smudge).get_pixel(64, 40)[3] > 0);
        assert_eq!(render(pencil).get_pixel(64, 40)[3], 0);
    }

    #[test]
    fn grain_varies_alpha() {
        for f in [texture as super::super::Synthesizer, pencil, pastel] {
            let buffer = render(f);
            let row: Vec<u8> = (35..45).map(|x| buffer.get_pixel(x, 40)[3]).collect();
            assert!(row.iter().any(|a| *a != row[0]));
        }
    }
}
