//! Procedural brush shapes
//!
//! Every shape follows the same recipe: measure a shape-specific normalized
//! distance from the stamp centre, reject pixels past the shape's threshold,
//! then write `opacity * falloff * grain` as alpha with the colour resolved for
//! that pixel. Pixels outside the shape are left fully transparent.
//!
//! Shapes are grouped by family:
//! - [`geometric`]: round, square, diamond, triangle, calligraphy, stencil
//! - [`media`]: watercolor, oil, acrylic, gouache, ink
//! - [`textured`]: texture, pencil, pastel, marker, highlighter, stamp, blur, smudge
//! - [`stochastic`]: airbrush, spray, charcoal, chalk (seeded per stamp)

mod geometric;
mod media;
mod stochastic;
mod textured;

use image::{Rgba, RgbaImage};

use super::color::{ColorSource, Rgb};
use super::settings::{BrushSettings, BrushShape};

/// Geometry and resolved inputs shared by all synthesizers
pub struct ShapeContext<'a> {
    pub settings: &'a BrushSettings,
    pub color: ColorSource,
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    /// Clamped settings opacity
    pub opacity: f32,
    /// Clamped settings hardness
    pub hardness: f32,
    /// Brush angle in radians
    pub angle: f32,
    /// Seed for stochastic shapes
    pub seed: u64,
}

impl<'a> ShapeContext<'a> {
    pub fn new(settings: &'a BrushSettings, side: u32, radius: f32, seed: u64) -> Self {
        let center = side as f32 / 2.0;
        Self {
            settings,
            color: ColorSource::from_settings(settings),
            cx: center,
            cy: center,
            radius: radius.max(0.5),
            opacity: settings.opacity.clamp(0.0, 1.0),
            hardness: settings.hardness.clamp(0.0, 1.0),
            angle: settings.normalized_angle().to_radians(),
            seed,
        }
    }

    #[inline]
    pub fn color_at(&self, x: f32, y: f32) -> Rgb {
        self.color.at(x, y, self.cx, self.cy, self.radius)
    }

    /// Offset of pixel (x, y) from the centre, rotated into brush space
    #[inline]
    pub fn rotated_offset(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = x - self.cx;
        let dy = y - self.cy;
        if self.angle == 0.0 {
            return (dx, dy);
        }
        let (sin, cos) = self.angle.sin_cos();
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    #[inline]
    pub fn euclidean(&self, x: f32, y: f32) -> f32 {
        let dx = x - self.cx;
        let dy = y - self.cy;
        (dx * dx + dy * dy).sqrt() / self.radius
    }
}

pub type Synthesizer = fn(&mut RgbaImage, &ShapeContext);

/// Dispatch table from shape to its synthesizer
pub fn synthesizer(shape: BrushShape) -> Synthesizer {
    match shape {
        BrushShape::Round => geometric::round,
        BrushShape::Square => geometric::square,
        BrushShape::Diamond => geometric::diamond,
        BrushShape::Triangle => geometric::triangle,
        BrushShape::Calligraphy => geometric::calligraphy,
        BrushShape::Stencil => geometric::stencil,
        BrushShape::Airbrush => stochastic::airbrush,
        BrushShape::Spray => stochastic::spray,
        BrushShape::Charcoal => stochastic::charcoal,
        BrushShape::Chalk => stochastic::chalk,
        BrushShape::Watercolor => media::watercolor,
        BrushShape::Oil => media::oil,
        BrushShape::Acrylic => media::acrylic,
        BrushShape::Gouache => media::gouache,
        BrushShape::Ink => media::ink,
        BrushShape::Texture => textured::texture,
        BrushShape::Pencil => textured::pencil,
        BrushShape::Pastel => textured::pastel,
        BrushShape::Marker => textured::marker,
        BrushShape::Highlighter => textured::highlighter,
        BrushShape::Stamp => textured::stamp,
        BrushShape::Blur => textured::blur,
        BrushShape::Smudge => textured::smudge,
    }
}

/// Fill `buffer` with `shape` as described by `ctx`
pub fn synthesize(shape: BrushShape, buffer: &mut RgbaImage, ctx: &ShapeContext) {
    synthesizer(shape)(buffer, ctx);
}

/// Visit every pixel; the closure returns colour and alpha (0-1) for pixels inside the shape
#[inline]
pub(crate) fn fill_pixels<F>(buffer: &mut RgbaImage, mut shade: F)
where
    F: FnMut(f32, f32) -> Option<(Rgb, f32)>,
{
    let (w, h) = buffer.dimensions();
    for y in 0..h {
        for x in 0..w {
            if let Some((rgb, alpha)) = shade(x as f32, y as f32) {
                let pixel = to_pixel(rgb, alpha);
                if pixel[3] > 0 {
                    buffer.put_pixel(x, y, pixel);
                }
            }
        }
    }
}

#[inline]
pub(crate) fn to_pixel(rgb: Rgb, alpha: f32) -> Rgba<u8> {
    let a = (alpha * 255.0).round();
    let a = if a.is_finite() { a.clamp(0.0, 255.0) } else { 0.0 };
    Rgba([rgb.r, rgb.g, rgb.b, a as u8])
}

/// Full strength up to `hardness`, then linear to zero at the edge
#[inline]
pub(crate) fn hard_falloff(d: f32, hardness: f32) -> f32 {
    if d >= 1.0 {
        0.0
    } else if d <= hardness {
        1.0
    } else {
        ((1.0 - d) / (1.0 - hardness)).clamp(0.0, 1.0)
    }
}

/// Flat core of `0.8 * hardness`, Gaussian-like tail to the edge
#[inline]
pub(crate) fn soft_falloff(d: f32, hardness: f32) -> f32 {
    let core = hardness * 0.8;
    if d <= core {
        return 1.0;
    }
    let t = (d - core) / (1.0 - core).max(f32::EPSILON);
    (-t * t * 3.0).exp()
}

#[inline]
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
