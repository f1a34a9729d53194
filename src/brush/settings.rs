//! Brush configuration model.
//!
//! `BrushSettings` is plain data: it is what presets persist and what every
//! stage of the engine reads. Field names serialize in camelCase so saved
//! descriptors stay compatible with the web front end.

use serde::{Deserialize, Serialize};

use super::{BlendMode, PressureCurve};

/// Procedural brush shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BrushShape {
    #[default]
    Round,
    Square,
    Diamond,
    Triangle,
    Airbrush,
    Spray,
    Texture,
    Watercolor,
    Oil,
    Acrylic,
    Gouache,
    Ink,
    Pencil,
    Charcoal,
    Pastel,
    Chalk,
    Marker,
    Highlighter,
    Calligraphy,
    Stencil,
    Stamp,
    Blur,
    Smudge,
}

impl BrushShape {
    pub const ALL: [BrushShape; 23] = [
        Self::Round,
        Self::Square,
        Self::Diamond,
        Self::Triangle,
        Self::Airbrush,
        Self::Spray,
        Self::Texture,
        Self::Watercolor,
        Self::Oil,
        Self::Acrylic,
        Self::Gouache,
        Self::Ink,
        Self::Pencil,
        Self::Charcoal,
        Self::Pastel,
        Self::Chalk,
        Self::Marker,
        Self::Highlighter,
        Self::Calligraphy,
        Self::Stencil,
        Self::Stamp,
        Self::Blur,
        Self::Smudge,
    ];

    /// Shapes whose synthesis draws from a (seeded) random source
    pub fn is_stochastic(self) -> bool {
        matches!(
            self,
            Self::Airbrush | Self::Spray | Self::Charcoal | Self::Chalk
        )
    }
}

/// Which stamp parameters respond to pen input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicsSettings {
    pub size_pressure: bool,
    pub opacity_pressure: bool,
    pub angle_pressure: bool,
    pub spacing_pressure: bool,
    pub velocity_size: bool,
    pub velocity_opacity: bool,
    pub velocity_rotation: bool,
    pub velocity_scale: bool,
    /// Degrees of rotation per unit of velocity
    pub rotation_amount: f32,
    /// Size reduction per unit of velocity
    pub scale_amount: f32,
    pub pressure_curve: PressureCurve,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self {
            size_pressure: false,
            opacity_pressure: false,
            angle_pressure: false,
            spacing_pressure: false,
            velocity_size: false,
            velocity_opacity: false,
            velocity_rotation: false,
            velocity_scale: false,
            rotation_amount: 90.0,
            scale_amount: 0.5,
            pressure_curve: PressureCurve::Linear,
        }
    }
}

/// Pattern texture applied to procedural stamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextureSettings {
    pub enabled: bool,
    /// Image id of the pattern in the image store
    pub pattern_id: Option<String>,
    pub scale: f32,
    /// How strongly the pattern modulates alpha (0-1)
    pub depth: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub invert: bool,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern_id: None,
            scale: 1.0,
            depth: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            invert: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Angular,
    Diamond,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientStop {
    /// Position along the gradient, 0-100
    pub position: f32,
    /// Hex colour (`#rrggbb`)
    pub color: String,
}

impl GradientStop {
    pub fn new(position: f32, color: impl Into<String>) -> Self {
        Self {
            position,
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GradientSettings {
    #[serde(rename = "type")]
    pub kind: GradientKind,
    pub stops: Vec<GradientStop>,
    /// Direction of linear gradients in degrees
    pub angle: f32,
}

/// How a flat brush colour is applied to a custom image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ColorizationMode {
    Tint,
    Multiply,
    Overlay,
    Colorize,
    #[default]
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    #[default]
    None,
    Blur,
    Sharpen,
    Edge,
}

/// One image of a multi-layer custom brush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBrushLayer {
    /// Image id in the image store
    pub image: String,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub enabled: bool,
}

impl CustomBrushLayer {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            enabled: true,
        }
    }
}

/// Tiled pattern blended over a custom brush image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextureOverlay {
    pub image: String,
    pub scale: f32,
    pub opacity: f32,
    pub blend_mode: BlendMode,
}

impl Default for TextureOverlay {
    fn default() -> Self {
        Self {
            image: String::new(),
            scale: 1.0,
            opacity: 1.0,
            blend_mode: BlendMode::Multiply,
        }
    }
}

/// Image-based brush configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomBrushSettings {
    /// Single source image id
    pub image: Option<String>,
    /// Layered images, composited bottom to top
    pub layers: Vec<CustomBrushLayer>,
    /// Animation frames, selected by `animation_frame`
    pub frames: Vec<String>,
    pub animation_frame: f32,
    /// Rotation in degrees
    pub rotation: f32,
    pub scale: f32,
    pub flip_x: bool,
    pub flip_y: bool,
    pub colorization: ColorizationMode,
    /// 0-100
    pub alpha_threshold: f32,
    /// -100..100
    pub brightness: f32,
    /// -100..100
    pub contrast: f32,
    pub filter: FilterKind,
    /// 0-100
    pub filter_amount: f32,
    pub texture_overlay: Option<TextureOverlay>,
    /// Per-stamp rotation/scale jitter, 0-100 %
    pub randomization: f32,
    pub pressure_size: Option<bool>,
    pub pressure_opacity: Option<bool>,
}

impl Default for CustomBrushSettings {
    fn default() -> Self {
        Self {
            image: None,
            layers: Vec::new(),
            frames: Vec::new(),
            animation_frame: 0.0,
            rotation: 0.0,
            scale: 1.0,
            flip_x: false,
            flip_y: false,
            colorization: ColorizationMode::Preserve,
            alpha_threshold: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            filter: FilterKind::None,
            filter_amount: 0.0,
            texture_overlay: None,
            randomization: 0.0,
            pressure_size: None,
            pressure_opacity: None,
        }
    }
}

impl CustomBrushSettings {
    pub fn has_enabled_layers(&self) -> bool {
        self.layers.iter().any(|layer| layer.enabled)
    }

    /// True when any image source is configured
    pub fn has_image(&self) -> bool {
        self.image.is_some() || self.has_enabled_layers() || !self.frames.is_empty()
    }

    /// Every image id this brush reads, in resolution order
    pub fn image_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .layers
            .iter()
            .filter(|layer| layer.enabled)
            .map(|layer| layer.image.as_str())
            .collect();
        ids.extend(self.frames.iter().map(String::as_str));
        ids.extend(self.image.as_deref());
        ids.extend(self.texture_overlay.as_ref().map(|o| o.image.as_str()));
        ids
    }
}

/// Complete brush configuration for one stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushSettings {
    /// Diameter in pixels
    pub size: f32,
    pub opacity: f32,
    /// Fraction of the radius drawn at full strength
    pub hardness: f32,
    /// Paint deposited per stamp, applied when compositing
    pub flow: f32,
    /// Distance between stamps as a fraction of size
    pub spacing: f32,
    /// Degrees
    pub angle: f32,
    pub roundness: f32,
    pub color: String,
    pub shape: BrushShape,
    pub blend_mode: BlendMode,
    pub dynamics: DynamicsSettings,
    pub texture: TextureSettings,
    pub gradient: Option<GradientSettings>,
    pub custom: Option<CustomBrushSettings>,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            opacity: 1.0,
            hardness: 1.0,
            flow: 1.0,
            spacing: 0.25,
            angle: 0.0,
            roundness: 1.0,
            color: "#000000".to_string(),
            shape: BrushShape::Round,
            blend_mode: BlendMode::Normal,
            dynamics: DynamicsSettings::default(),
            texture: TextureSettings::default(),
            gradient: None,
            custom: None,
        }
    }
}

impl BrushSettings {
    /// Angle wrapped into [0, 360)
    pub fn normalized_angle(&self) -> f32 {
        normalize_degrees(self.angle)
    }

    /// The custom brush block, if it references at least one image
    pub fn custom_image(&self) -> Option<&CustomBrushSettings> {
        self.custom.as_ref().filter(|custom| custom.has_image())
    }
}

pub fn normalize_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
