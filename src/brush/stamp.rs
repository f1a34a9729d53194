//! Stamp builder
//!
//! `create_brush_stamp` never fails: invalid settings and internal errors
//! produce a small solid circle, and unloaded custom images fall back to the
//! procedural shape. Only stamps built from fully loaded inputs are cached, so
//! a fallback never shadows the real stamp once its images arrive.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use super::cache::{stamp_cache_key, stamp_seed, StampCache};
use super::color::Rgb;
use super::custom::render_custom_image;
use super::images::ImageStore;
use super::settings::{BrushSettings, TextureSettings};
use super::shapes::{synthesize, ShapeContext};
use crate::config::EngineConfig;
use crate::core::{EngineError, EngineResult};
use crate::perf::PerformanceGovernor;

/// Where a stamp's pixels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampSource {
    Cache,
    Procedural,
    Custom,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Stamp {
    pub image: Arc<RgbaImage>,
    pub source: StampSource,
}

impl Stamp {
    pub fn side(&self) -> u32 {
        self.image.width()
    }
}

#[derive(Debug)]
pub struct StampBuilder {
    cache: StampCache,
    max_stamp_size: f32,
    fallback_size: u32,
}

impl StampBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cache: StampCache::new(config.cache.clone()),
            max_stamp_size: config.max_stamp_size.max(1.0),
            fallback_size: config.fallback_stamp_size.max(1),
        }
    }

    pub fn cache(&self) -> &StampCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut StampCache {
        &mut self.cache
    }

    /// Stamp bitmap for `settings`, from cache when possible
    pub fn create_brush_stamp(
        &mut self,
        settings: &BrushSettings,
        images: &ImageStore,
        governor: &mut PerformanceGovernor,
    ) -> Stamp {
        let key = stamp_cache_key(settings, images);
        if let Some(image) = self.cache.get(&key) {
            governor.record_cache_hit();
            return Stamp {
                image,
                source: StampSource::Cache,
            };
        }
        governor.record_cache_miss();

        match self.build(settings, images, &key) {
            Ok((image, source, cacheable)) => {
                let image = Arc::new(image);
                if cacheable {
                    self.cache.insert(key, Arc::clone(&image));
                }
                Stamp { image, source }
            }
            Err(err) => {
                tracing::warn!("Stamp synthesis failed, using fallback: {}", err);
                self.fallback_stamp(settings)
            }
        }
    }

    /// Working diameter and buffer side for `size`
    pub fn stamp_geometry(&self, size: f32) -> (f32, u32) {
        let optimized = size.min(self.max_stamp_size);
        let side = (optimized * 2.0).ceil().max(1.0) as u32;
        (optimized, side)
    }

    fn build(
        &self,
        settings: &BrushSettings,
        images: &ImageStore,
        key: &str,
    ) -> EngineResult<(RgbaImage, StampSource, bool)> {
        validate(settings)?;
        let (optimized, side) = self.stamp_geometry(settings.size);

        if let Some(custom) = settings.custom_image() {
            match render_custom_image(settings, custom, optimized, side, images) {
                Ok(render) => return Ok((render.image, StampSource::Custom, render.complete)),
                Err(err @ (EngineError::ImageNotReady(_) | EngineError::ImageDecode(_))) => {
                    tracing::warn!("Custom brush image unavailable, drawing procedural shape: {}", err);
                    let (image, _) = self.procedural(settings, images, optimized, side, key);
                    return Ok((image, StampSource::Procedural, false));
                }
                Err(err) => return Err(err),
            }
        }

        let (image, complete) = self.procedural(settings, images, optimized, side, key);
        Ok((image, StampSource::Procedural, complete))
    }

    fn procedural(
        &self,
        settings: &BrushSettings,
        images: &ImageStore,
        optimized: f32,
        side: u32,
        key: &str,
    ) -> (RgbaImage, bool) {
        let mut buffer = RgbaImage::new(side, side);
        let ctx = ShapeContext::new(settings, side, optimized / 2.0, stamp_seed(key));
        synthesize(settings.shape, &mut buffer, &ctx);

        let mut complete = true;
        if settings.texture.enabled {
            match settings.texture.pattern_id.as_deref().map(|id| images.resolve(id)) {
                Some(Ok(pattern)) => apply_pattern_texture(&mut buffer, &pattern, &settings.texture),
                Some(Err(err)) => {
                    tracing::debug!("Brush texture not applied: {}", err);
                    complete = false;
                }
                None => {}
            }
        }
        (buffer, complete)
    }

    /// Solid circle of the brush colour, fixed size
    pub fn fallback_stamp(&self, settings: &BrushSettings) -> Stamp {
        let side = self.fallback_size;
        let rgb = Rgb::from_hex_or_black(&settings.color);
        let center = side as f32 / 2.0;
        let image = RgbaImage::from_fn(side, side, |x, y| {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            if (dx * dx + dy * dy).sqrt() <= center {
                Rgba([rgb.r, rgb.g, rgb.b, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        Stamp {
            image: Arc::new(image),
            source: StampSource::Fallback,
        }
    }
}

fn validate(settings: &BrushSettings) -> EngineResult<()> {
    if !(settings.size.is_finite() && settings.size > 0.0) {
        return Err(EngineError::InvalidSettings(format!(
            "brush size must be positive, got {}",
            settings.size
        )));
    }
    Ok(())
}

/// Modulate stamp alpha by the tiled pattern's luminance
fn apply_pattern_texture(buffer: &mut RgbaImage, pattern: &RgbaImage, texture: &TextureSettings) {
    let (pw, ph) = pattern.dimensions();
    if pw == 0 || ph == 0 {
        return;
    }
    let scale = texture.scale.max(0.01);
    let depth = texture.depth.clamp(0.0, 1.0);

    for (x, y, px) in buffer.enumerate_pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        let tx = (((x as f32 + texture.offset_x) / scale).floor() as i64).rem_euclid(pw as i64) as u32;
        let ty = (((y as f32 + texture.offset_y) / scale).floor() as i64).rem_euclid(ph as i64) as u32;
        let tp = pattern.get_pixel(tx, ty);
        let luma = (0.299 * tp[0] as f32 + 0.587 * tp[1] as f32 + 0.114 * tp[2] as f32) / 255.0;
        let mut value = luma * tp[3] as f32 / 255.0;
        if texture.invert {
            value = 1.0 - value;
        }
        let factor = 1.0 - depth * (1.0 - value);
        px[3] = (px[3] as f32 * factor).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::settings::{BrushShape, CustomBrushSettings};

    fn builder() -> (StampBuilder, ImageStore, PerformanceGovernor) {
        let config = EngineConfig::default();
        (
            StampBuilder::new(&config),
            ImageStore::new(),
            PerformanceGovernor::new(config.governor.clone()),
        )
    }

    #[test]
    fn second_request_hits_cache() {
        let (mut builder, images, mut governor) = builder();
        let settings = BrushSettings::default();
        let first = builder.create_brush_stamp(&settings, &images, &mut governor);
        let second = builder.create_brush_stamp(&settings, &images, &mut governor);
        assert_eq!(first.source, StampSource::Procedural);
        assert_eq!(second.source, StampSource::Cache);
        assert!(Arc::ptr_eq(&first.image, &second.image));
        assert_eq!(governor.cache_hits(), 1);
        assert_eq!(governor.cache_misses(), 1);
    }

    #[test]
    fn side_is_twice_the_clamped_size() {
        let (mut builder, images, mut governor) = builder();
        let small = BrushSettings {
            size: 10.3,
            ..Default::default()
        };
        let huge = BrushSettings {
            size: 900.0,
            ..Default::default()
        };
        assert_eq!(builder.create_brush_stamp(&small, &images, &mut governor).side(), 21);
        assert_eq!(builder.create_brush_stamp(&huge, &images, &mut governor).side(), 400);
    }

    #[test]
    fn non_positive_size_gets_fallback() {
        let (mut builder, images, mut governor) = builder();
        for size in [0.0, -5.0, f32::NAN] {
            let settings = BrushSettings {
                size,
                color: "#ff0000".to_string(),
                ..Default::default()
            };
            let stamp = builder.create_brush_stamp(&settings, &images, &mut governor);
            assert_eq!(stamp.source, StampSource::Fallback);
            assert_eq!(stamp.side(), 20);
            assert_eq!(stamp.image.get_pixel(10, 10).0, [255, 0, 0, 255]);
            assert_eq!(stamp.image.get_pixel(0, 0)[3], 0);
        }
        assert!(builder.cache().is_empty());
    }

    #[test]
    fn pending_custom_image_falls_back_uncached_then_resolves() {
        let (mut builder, mut images, mut governor) = builder();
        images.insert_pending("tip");
        let settings = BrushSettings {
            custom: Some(CustomBrushSettings {
                image: Some("tip".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let early = builder.create_brush_stamp(&settings, &images, &mut governor);
        assert_eq!(early.source, StampSource::Procedural);
        assert!(builder.cache().is_empty());

        images.insert_image("tip", RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])));
        let late = builder.create_brush_stamp(&settings, &images, &mut governor);
        assert_eq!(late.source, StampSource::Custom);
        assert_eq!(late.image.get_pixel(20, 20).0, [0, 255, 0, 255]);
        assert_eq!(builder.cache().len(), 1);
    }

    #[test]
    fn texture_pattern_modulates_alpha() {
        let (mut builder, mut images, mut governor) = builder();
        // Black/white columns
        let pattern = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        images.insert_image("paper", pattern);
        let settings = BrushSettings {
            size: 20.0,
            shape: BrushShape::Round,
            texture: TextureSettings {
                enabled: true,
                pattern_id: Some("paper".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let stamp = builder.create_brush_stamp(&settings, &images, &mut governor);
        assert_eq!(stamp.image.get_pixel(20, 20)[3], 0);
        assert_eq!(stamp.image.get_pixel(21, 20)[3], 255);
    }

    #[test]
    fn missing_texture_pattern_is_not_cached() {
        let (mut builder, images, mut governor) = builder();
        let settings = BrushSettings {
            texture: TextureSettings {
                enabled: true,
                pattern_id: Some("later".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let stamp = builder.create_brush_stamp(&settings, &images, &mut governor);
        assert_eq!(stamp.source, StampSource::Procedural);
        assert_eq!(stamp.image.get_pixel(20, 20)[3], 255);
        assert!(builder.cache().is_empty());
    }
}
