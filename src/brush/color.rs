//! Colour parsing and gradient resolution

use std::f32::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::settings::{BrushSettings, GradientKind, GradientSettings, GradientStop};
use crate::core::{EngineError, EngineResult};

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `#rgb`, or either without the leading `#`
    pub fn from_hex(value: &str) -> EngineResult<Self> {
        let hex = value.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            _ if !hex.is_ascii() => {
                return Err(EngineError::InvalidInput(format!(
                    "Invalid colour: {}",
                    value
                )))
            }
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => {
                return Err(EngineError::InvalidInput(format!(
                    "Invalid colour: {}",
                    value
                )))
            }
        };

        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map_err(|_| EngineError::InvalidInput(format!("Invalid colour: {}", value)))
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Parse, falling back to black and logging on malformed input
    pub fn from_hex_or_black(value: &str) -> Self {
        Self::from_hex(value).unwrap_or_else(|err| {
            tracing::warn!("{}, using black", err);
            Self::BLACK
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    /// Multiply each channel, clamping to [0, 255]
    pub fn scaled(self, factor: f32) -> Rgb {
        let s = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: s(self.r),
            g: s(self.g),
            b: s(self.b),
        }
    }

    /// Push channels away from their mean by `factor`
    pub fn saturated(self, factor: f32) -> Rgb {
        let mean = (self.r as f32 + self.g as f32 + self.b as f32) / 3.0;
        let s = |c: u8| (mean + (c as f32 - mean) * factor).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: s(self.r),
            g: s(self.g),
            b: s(self.b),
        }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Gradient with parsed, position-sorted stops
#[derive(Debug, Clone)]
pub struct ResolvedGradient {
    kind: GradientKind,
    angle_rad: f32,
    /// (position in [0, 1], colour)
    stops: Vec<(f32, Rgb)>,
}

impl ResolvedGradient {
    /// Returns `None` for gradients without stops
    pub fn new(gradient: &GradientSettings) -> Option<Self> {
        let mut stops: Vec<(f32, Rgb)> = gradient
            .stops
            .iter()
            .map(|GradientStop { position, color }| {
                ((position / 100.0).clamp(0.0, 1.0), Rgb::from_hex_or_black(color))
            })
            .collect();
        if stops.is_empty() {
            return None;
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));

        Some(Self {
            kind: gradient.kind,
            angle_rad: gradient.angle.to_radians(),
            stops,
        })
    }

    /// Scalar position of a pixel along the gradient, clamped to [0, 1]
    pub fn position(&self, x: f32, y: f32, cx: f32, cy: f32, radius: f32) -> f32 {
        let dx = x - cx;
        let dy = y - cy;
        let radius = radius.max(f32::EPSILON);

        let position = match self.kind {
            GradientKind::Linear => {
                let projected = dx * self.angle_rad.cos() + dy * self.angle_rad.sin();
                (projected + radius) / (2.0 * radius)
            }
            GradientKind::Radial => (dx * dx + dy * dy).sqrt() / radius,
            GradientKind::Angular => {
                let angle = dy.atan2(dx) - self.angle_rad;
                angle.rem_euclid(2.0 * PI) / (2.0 * PI)
            }
            GradientKind::Diamond => (dx.abs() + dy.abs()) / radius,
        };

        if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Colour at a scalar gradient position
    pub fn color_at(&self, position: f32) -> Rgb {
        let (first_pos, first) = self.stops[0];
        let (last_pos, last) = self.stops[self.stops.len() - 1];

        if self.stops.len() == 1 || position <= first_pos {
            return first;
        }
        if position >= last_pos {
            return last;
        }

        for pair in self.stops.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if position >= p0 && position <= p1 {
                let span = p1 - p0;
                if span <= f32::EPSILON {
                    return c1;
                }
                return c0.lerp(c1, (position - p0) / span);
            }
        }

        last
    }

    pub fn sample(&self, x: f32, y: f32, cx: f32, cy: f32, radius: f32) -> Rgb {
        self.color_at(self.position(x, y, cx, cy, radius))
    }
}

/// Per-pixel colour source for shape synthesis
#[derive(Debug, Clone)]
pub enum ColorSource {
    Solid(Rgb),
    Gradient(ResolvedGradient),
}

impl ColorSource {
    pub fn from_settings(settings: &BrushSettings) -> Self {
        match settings.gradient.as_ref().and_then(ResolvedGradient::new) {
            Some(gradient) => Self::Gradient(gradient),
            None => Self::Solid(Rgb::from_hex_or_black(&settings.color)),
        }
    }

    #[inline]
    pub fn at(&self, x: f32, y: f32, cx: f32, cy: f32, radius: f32) -> Rgb {
        match self {
            Self::Solid(rgb) => *rgb,
            Self::Gradient(gradient) => gradient.sample(x, y, cx, cy, radius),
        }
    }
}

/// Colour to paint at pixel (x, y) of a stamp centred at (cx, cy)
pub fn resolve_color(settings: &BrushSettings, x: f32, y: f32, cx: f32, cy: f32, radius: f32) -> Rgb {
    ColorSource::from_settings(settings).at(x, y, cx, cy, radius)
}

/// Same as [`resolve_color`], formatted as `#rrggbb`
pub fn resolve_color_hex(
    settings: &BrushSettings,
    x: f32,
    y: f32,
    cx: f32,
    cy: f32,
    radius: f32,
) -> String {
    if settings.gradient.is_none() {
        return settings.color.clone();
    }
    resolve_color(settings, x, y, cx, cy, radius).to_hex()
}
