//! Particle and grain brushes
//!
//! These accumulate contributions from randomly placed sub-centres. The
//! random source is seeded per stamp (from the stamp cache key), so a given
//! configuration always produces the same bitmap.

use std::f32::consts::TAU;

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{fill_pixels, smoothstep, soft_falloff, to_pixel, ShapeContext};

const AIRBRUSH_NOZZLES: usize = 8;
const CHARCOAL_LAYERS: usize = 3;
const CHALK_REACH: f32 = 1.1;

struct Nozzle {
    x: f32,
    y: f32,
    weight: f32,
}

pub fn airbrush(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let mut rng = StdRng::seed_from_u64(ctx.seed);
    let nozzles: Vec<Nozzle> = (0..AIRBRUSH_NOZZLES)
        .map(|_| {
            let angle = rng.gen::<f32>() * TAU;
            let dist = rng.gen::<f32>().sqrt() * ctx.radius * 0.35;
            Nozzle {
                x: ctx.cx + angle.cos() * dist,
                y: ctx.cy + angle.sin() * dist,
                weight: rng.gen_range(0.6..1.0),
            }
        })
        .collect();
    let total_weight: f32 = nozzles.iter().map(|n| n.weight).sum();
    let spread = ctx.radius * 0.7;

    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        let mist: f32 = nozzles
            .iter()
            .map(|n| {
                let nx = (x - n.x) / spread;
                let ny = (y - n.y) / spread;
                n.weight * (-(nx * nx + ny * ny) * 2.5).exp()
            })
            .sum::<f32>()
            / total_weight;
        let noise = 0.85 + 0.15 * rng.gen::<f32>();
        let falloff = 1.0 - smoothstep(ctx.hardness * 0.5, 1.0, d);
        Some((ctx.color_at(x, y), ctx.opacity * falloff * mist * noise))
    });
}

pub fn spray(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let mut rng = StdRng::seed_from_u64(ctx.seed);
    let (w, h) = buffer.dimensions();
    let mut coverage = vec![0.0f32; (w * h) as usize];

    let particles = (ctx.radius * ctx.radius * 0.8).clamp(20.0, 4000.0) as usize;
    let dot_scale = (ctx.radius / 20.0).clamp(0.5, 3.0);

    for _ in 0..particles {
        let angle = rng.gen::<f32>() * TAU;
        // Uniform in radius rather than area: denser towards the centre
        let dist = rng.gen::<f32>() * ctx.radius;
        let px = ctx.cx + angle.cos() * dist;
        let py = ctx.cy + angle.sin() * dist;
        let dot_radius = (0.5 + rng.gen::<f32>()) * dot_scale;

        let x0 = (px - dot_radius).floor().max(0.0) as u32;
        let y0 = (py - dot_radius).floor().max(0.0) as u32;
        let x1 = ((px + dot_radius).ceil() as u32).min(w.saturating_sub(1));
        let y1 = ((py + dot_radius).ceil() as u32).min(h.saturating_sub(1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - px;
                let dy = y as f32 - py;
                let dd = (dx * dx + dy * dy).sqrt();
                if dd < dot_radius {
                    coverage[(y * w + x) as usize] += 1.0 - dd / dot_radius;
                }
            }
        }
    }

    for y in 0..h {
        for x in 0..w {
            let cov = coverage[(y * w + x) as usize];
            if cov <= 0.0 {
                continue;
            }
            let (fx, fy) = (x as f32, y as f32);
            if ctx.euclidean(fx, fy) > 1.0 {
                continue;
            }
            let pixel = to_pixel(ctx.color_at(fx, fy), ctx.opacity * cov.min(1.0));
            if pixel[3] > 0 {
                buffer.put_pixel(x, y, pixel);
            }
        }
    }
}

struct GrainLayer {
    fx: f32,
    fy: f32,
    phase_x: f32,
    phase_y: f32,
}

pub fn charcoal(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let mut rng = StdRng::seed_from_u64(ctx.seed);
    let layers: Vec<GrainLayer> = (0..CHARCOAL_LAYERS)
        .map(|_| GrainLayer {
            fx: rng.gen_range(0.8..1.6),
            fy: rng.gen_range(0.8..1.6),
            phase_x: rng.gen::<f32>() * TAU,
            phase_y: rng.gen::<f32>() * TAU,
        })
        .collect();

    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > 1.0 {
            return None;
        }
        // Paper tooth: some pixels catch no pigment at all
        if rng.gen::<f32>() < 0.25 {
            return None;
        }
        let grain = layers
            .iter()
            .map(|l| 0.5 + 0.5 * (x * l.fx + l.phase_x).sin() * (y * l.fy + l.phase_y).cos())
            .sum::<f32>()
            / CHARCOAL_LAYERS as f32;
        Some((ctx.color_at(x, y), ctx.opacity * 0.85 * soft_falloff(d, ctx.hardness) * grain))
    });
}

pub fn chalk(buffer: &mut RgbaImage, ctx: &ShapeContext) {
    let mut rng = StdRng::seed_from_u64(ctx.seed);
    fill_pixels(buffer, |x, y| {
        let d = ctx.euclidean(x, y);
        if d > CHALK_REACH {
            return None;
        }
        let coverage = if d <= 1.0 {
            0.75
        } else {
            0.75 * (CHALK_REACH - d) / (CHALK_REACH - 1.0)
        };
        let roll = rng.gen::<f32>();
        let intensity = 0.6 + 0.4 * rng.gen::<f32>();
        if roll >= coverage {
            return None;
        }
        let falloff = 1.0 - smoothstep(0.8, CHALK_REACH, d);
        Some((ctx.color_at(x, y), ctx.opacity * falloff * intensity))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::settings::BrushSettings;

    fn render(f: super::super::Synthesizer, seed: u64) -> RgbaImage {
        let settings = BrushSettings {
            size: 40.0,
            ..Default::default()
        };
        let mut buffer = RgbaImage::new(80, 80);
        let ctx = ShapeContext::new(&settings, 80, 20.0, seed);
        f(&mut buffer, &ctx);
        buffer
    }

    #[test]
    fn different_seeds_differ() {
        for f in [airbrush as super::super::Synthesizer, spray, charcoal, chalk] {
            assert_ne!(render(f, 1), render(f, 2));
        }
    }

    #[test]
    fn chalk_leaves_gaps() {
        let buffer = render(chalk, 9);
        let inside = (30..50)
            .flat_map(|y| (30..50).map(move |x| (x, y)))
            .filter(|(x, y)| buffer.get_pixel(*x, *y)[3] == 0)
            .count();
        assert!(inside > 0);
    }

    #[test]
    fn spray_stays_inside_radius() {
        let buffer = render(spray, 3);
        for (x, y, px) in buffer.enumerate_pixels() {
            if px[3] > 0 {
                let dx = x as f32 - 40.0;
                let dy = y as f32 - 40.0;
                assert!((dx * dx + dy * dy).sqrt() <= 20.0);
            }
        }
    }
}
