//! Drawing surfaces and the collaborator contracts around them
//!
//! The engine never owns the layer system or the 3D scene. It draws into
//! whatever `TargetSurface` a `LayerSink` hands it, asks a `ScreenProjector`
//! for texture coordinates, and reports `TextureChange`s so the host can
//! re-upload textures.

use glam::{Affine2, Vec2, Vec3};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::brush::{draw_image, BlendMode};
use crate::core::{EngineError, EngineResult};

/// Side used when a surface is requested with a zero dimension
pub const DEFAULT_SURFACE_SIZE: u32 = 1024;

/// Neutral displacement value
pub const NEUTRAL_DISPLACEMENT: u8 = 128;

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DirtyRect {
    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        DirtyRect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    /// Merge into an optional accumulator
    pub fn merge(acc: Option<DirtyRect>, rect: Option<DirtyRect>) -> Option<DirtyRect> {
        match (acc, rect) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }
}

/// How one stamp is laid onto a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampPlacement {
    /// Centre in surface pixels
    pub x: f32,
    pub y: f32,
    /// Degrees, applied about the stamp centre
    pub rotation: f32,
    pub scale: f32,
    /// Global alpha (flow)
    pub alpha: f32,
    pub mode: BlendMode,
}

impl StampPlacement {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            rotation: 0.0,
            scale: 1.0,
            alpha: 1.0,
            mode: BlendMode::Normal,
        }
    }

    fn transform(&self, stamp: &RgbaImage) -> Affine2 {
        let half = Vec2::new(stamp.width() as f32, stamp.height() as f32) / 2.0;
        Affine2::from_translation(Vec2::new(self.x, self.y))
            * Affine2::from_angle(self.rotation.to_radians())
            * Affine2::from_scale(Vec2::splat(self.scale))
            * Affine2::from_translation(-half)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.alpha.is_finite()
    }
}

/// 2D raster surface the engine can draw into
pub trait TargetSurface {
    fn image(&self) -> &RgbaImage;

    fn image_mut(&mut self) -> &mut RgbaImage;

    fn dimensions(&self) -> (u32, u32) {
        self.image().dimensions()
    }

    /// Composite `stamp` centred at the placement; returns the touched area
    fn draw_stamp(
        &mut self,
        stamp: &RgbaImage,
        placement: &StampPlacement,
    ) -> EngineResult<Option<DirtyRect>> {
        if !placement.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "non-finite stamp placement {:?}",
                placement
            )));
        }
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(EngineError::SurfaceUnavailable(format!(
                "{}x{} target",
                width, height
            )));
        }
        if placement.scale <= 0.0 {
            return Ok(None);
        }
        let transform = placement.transform(stamp);
        Ok(draw_image(
            self.image_mut(),
            stamp,
            transform,
            placement.alpha.clamp(0.0, 1.0),
            placement.mode,
        ))
    }
}

/// In-memory RGBA surface
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    /// Transparent surface; zero dimensions fall back to the default size
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba([0, 0, 0, 0]))
    }

    /// Displacement surface initialised to neutral grey
    pub fn displacement(width: u32, height: u32) -> Self {
        let n = NEUTRAL_DISPLACEMENT;
        Self::filled(width, height, Rgba([n, n, n, 255]))
    }

    fn filled(width: u32, height: u32, pixel: Rgba<u8>) -> Self {
        let (width, height) = if width == 0 || height == 0 {
            tracing::warn!(
                "Surface {}x{} unavailable, using {}x{}",
                width,
                height,
                DEFAULT_SURFACE_SIZE,
                DEFAULT_SURFACE_SIZE
            );
            (DEFAULT_SURFACE_SIZE, DEFAULT_SURFACE_SIZE)
        } else {
            (width, height)
        };
        Self {
            image: RgbaImage::from_pixel(width, height, pixel),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl TargetSurface for RasterSurface {
    fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

/// Access to the active layer, owned by the host's layer system
pub trait LayerSink {
    /// Surface of the active layer, if one can be drawn into
    fn target_surface(&mut self) -> Option<&mut dyn TargetSurface>;

    /// Recompose layers after the target changed
    fn composite(&mut self);
}

/// Result of projecting a screen position onto the garment mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UvHit {
    pub uv: Vec2,
    pub mesh: String,
    pub world: Option<Vec3>,
}

/// Screen-to-texture raycasting, provided by the 3D scene
pub trait ScreenProjector {
    fn screen_to_uv(&self, screen_x: f32, screen_y: f32) -> Option<UvHit>;
}

/// Texture-affecting change, reported after each mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TextureChange {
    Paint { dirty: DirtyRect },
    Displacement { dirty: DirtyRect },
}

/// UV to pixel coordinates. v = 0 is the bottom row.
pub fn uv_to_pixel(uv: Vec2, width: u32, height: u32) -> Vec2 {
    Vec2::new(uv.x * width as f32, (1.0 - uv.y) * height as f32)
}

/// Inverse of [`uv_to_pixel`]
pub fn pixel_to_uv(pixel: Vec2, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Vec2::new(pixel.x / w, 1.0 - pixel.y / h)
}
