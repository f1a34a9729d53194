//! Brush engine module - stamp synthesis, caching and stroke rendering

mod blend;
mod cache;
mod color;
mod custom;
mod dynamics;
mod engine;
mod filters;
mod images;
mod interpolation;
mod library;
mod settings;
mod shapes;
mod stamp;

#[cfg(test)]
mod tests;

pub use blend::{blend_rgb, composite_pixel, draw_image, sample_bilinear};
pub use cache::{stamp_cache_key, stamp_seed, StampCache};
pub use color::{resolve_color, resolve_color_hex, ColorSource, ResolvedGradient, Rgb};
pub use custom::{
    adjust_brightness_contrast, apply_colorization, frame_index, render_custom_image, CustomRender,
};
pub use dynamics::{calculate_dynamics, PressureCurve, StampDynamics};
pub use engine::{BrushEngine, SharedBrushEngine, TextureListener};
pub use filters::{apply_filter, box_blur, edge_detect, sharpen};
pub use images::{ImageEntry, ImageStore};
pub use interpolation::{
    interpolate, interpolate_catmull_rom, interpolate_linear, path_length, segment_points,
    InterpolationMode,
};
pub use library::{
    BrushPreset, PresetCategory, PresetImportResult, PresetLibrary, SavedCustomBrush,
};
pub use settings::{
    normalize_degrees, BrushSettings, BrushShape, ColorizationMode, CustomBrushLayer,
    CustomBrushSettings, DynamicsSettings, FilterKind, GradientKind, GradientSettings,
    GradientStop, TextureOverlay, TextureSettings,
};
pub use shapes::{synthesize, synthesizer, ShapeContext, Synthesizer};
pub(crate) use shapes::smoothstep;
pub use stamp::{Stamp, StampBuilder, StampSource};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A single sampled input event of a stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushPoint {
    /// X coordinate in target-surface pixels
    pub x: f32,
    /// Y coordinate in target-surface pixels
    pub y: f32,
    /// Pen pressure (0.0 - 1.0)
    pub pressure: f32,
    pub tilt_x: f32,
    pub tilt_y: f32,
    /// Normalized pointer speed
    pub velocity: f32,
    /// Milliseconds
    pub timestamp: f64,
    /// Distance from the previous point in pixels
    pub distance: f32,
    /// Texture coordinate, when the point was projected onto a mesh
    pub uv: Option<Vec2>,
    /// World-space hit position
    pub world: Option<Vec3>,
}

impl Default for BrushPoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            pressure: 1.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            velocity: 0.0,
            timestamp: 0.0,
            distance: 0.0,
            uv: None,
            world: None,
        }
    }
}

impl BrushPoint {
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self {
            x,
            y,
            pressure,
            ..Default::default()
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Compositing operators for stamps and custom-brush layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    #[serde(rename = "source-over", alias = "normal")]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    /// Paint only where the destination is already opaque
    SourceAtop,
    /// Eraser
    DestinationOut,
    /// Hue and saturation of the source, luminance of the destination
    Color,
}
