//! Image-based (custom) brush stamps
//!
//! Source selection follows a fixed priority: enabled layers, then animation
//! frames, then the single source image. Every source is drawn centred through
//! the same transform (rotate, flip, scale about the stamp centre) so the three
//! paths agree on orientation. Post-processing runs in this order:
//! brightness/contrast, filter, texture overlay, alpha threshold, colorization.

use std::sync::Arc;

use glam::{Affine2, Vec2};
use image::RgbaImage;

use super::blend::{blend_rgb, composite_pixel, draw_image};
use super::color::ColorSource;
use super::filters::apply_filter;
use super::images::ImageStore;
use super::settings::{BrushSettings, ColorizationMode, CustomBrushSettings, TextureOverlay};
use super::BlendMode;
use crate::core::{EngineError, EngineResult};

/// Rendered custom stamp
#[derive(Debug)]
pub struct CustomRender {
    pub image: RgbaImage,
    /// False when an optional input (texture overlay) was not loaded yet;
    /// incomplete stamps must not be cached
    pub complete: bool,
}

/// Build the custom-image stamp for `settings` into a `side`x`side` buffer.
/// `brush_size` is the working diameter the source is fitted to.
pub fn render_custom_image(
    settings: &BrushSettings,
    custom: &CustomBrushSettings,
    brush_size: f32,
    side: u32,
    images: &ImageStore,
) -> EngineResult<CustomRender> {
    let mut buffer = RgbaImage::new(side, side);
    // Brush angle (with its pressure and velocity response) turns the tip
    // on top of the image's own rotation
    let rotation = custom.rotation + settings.normalized_angle();

    if custom.has_enabled_layers() {
        let layers = custom
            .layers
            .iter()
            .filter(|layer| layer.enabled)
            .map(|layer| Ok((images.resolve(&layer.image)?, layer.opacity, layer.blend_mode)))
            .collect::<EngineResult<Vec<_>>>()?;
        // One scale for every layer so they stay registered with each other
        let max_dim = layers
            .iter()
            .map(|(image, _, _)| image.width().max(image.height()))
            .max()
            .unwrap_or(1);
        let scale = fit_scale(brush_size, max_dim, custom.scale);
        for (image, opacity, mode) in &layers {
            let transform = centered_transform(&buffer, image, scale, rotation, custom);
            draw_image(&mut buffer, image, transform, opacity.clamp(0.0, 1.0), *mode);
        }
    } else if !custom.frames.is_empty() {
        let index = frame_index(custom.animation_frame, custom.frames.len());
        let image = images.resolve(&custom.frames[index])?;
        draw_single(&mut buffer, &image, brush_size, rotation, custom);
    } else if let Some(id) = custom.image.as_deref() {
        let image = images.resolve(id)?;
        draw_single(&mut buffer, &image, brush_size, rotation, custom);
    } else {
        return Err(EngineError::InvalidSettings(
            "Custom brush has no image source".to_string(),
        ));
    }

    let complete = post_process(&mut buffer, settings, custom, images);
    Ok(CustomRender {
        image: buffer,
        complete,
    })
}

/// Frame for a (possibly fractional or negative) animation position
pub fn frame_index(animation_frame: f32, count: usize) -> usize {
    if count == 0 || !animation_frame.is_finite() {
        return 0;
    }
    (animation_frame.floor() as i64).rem_euclid(count as i64) as usize
}

fn fit_scale(brush_size: f32, max_dim: u32, custom_scale: f32) -> f32 {
    brush_size / max_dim.max(1) as f32 * custom_scale.max(0.01)
}

fn draw_single(
    buffer: &mut RgbaImage,
    image: &RgbaImage,
    brush_size: f32,
    rotation: f32,
    custom: &CustomBrushSettings,
) {
    let scale = fit_scale(brush_size, image.width().max(image.height()), custom.scale);
    let transform = centered_transform(buffer, image, scale, rotation, custom);
    draw_image(buffer, image, transform, 1.0, BlendMode::Normal);
}

/// translate(centre) * rotate * scale(+-s) * translate(-image centre)
fn centered_transform(
    buffer: &RgbaImage,
    image: &RgbaImage,
    scale: f32,
    rotation: f32,
    custom: &CustomBrushSettings,
) -> Affine2 {
    let center = Vec2::new(buffer.width() as f32, buffer.height() as f32) / 2.0;
    let image_center = Vec2::new(image.width() as f32, image.height() as f32) / 2.0;
    let flip = Vec2::new(
        if custom.flip_x { -1.0 } else { 1.0 },
        if custom.flip_y { -1.0 } else { 1.0 },
    );
    Affine2::from_translation(center)
        * Affine2::from_angle(rotation.to_radians())
        * Affine2::from_scale(flip * scale)
        * Affine2::from_translation(-image_center)
}

/// Returns false when the texture overlay could not be applied yet
fn post_process(
    buffer: &mut RgbaImage,
    settings: &BrushSettings,
    custom: &CustomBrushSettings,
    images: &ImageStore,
) -> bool {
    adjust_brightness_contrast(buffer, custom.brightness, custom.contrast);

    if custom.filter_amount > 0.0 {
        *buffer = apply_filter(buffer, custom.filter, custom.filter_amount);
    }

    let mut complete = true;
    if let Some(overlay) = custom.texture_overlay.as_ref().filter(|o| !o.image.is_empty()) {
        match images.resolve(&overlay.image) {
            Ok(pattern) => apply_texture_overlay(buffer, &pattern, overlay),
            Err(err) => {
                tracing::debug!("Skipping texture overlay: {}", err);
                complete = false;
            }
        }
    }

    apply_alpha_threshold(buffer, custom.alpha_threshold);

    let radius = buffer.width() as f32 / 4.0;
    apply_colorization(buffer, custom.colorization, &ColorSource::from_settings(settings), radius);
    complete
}

/// `brightness` shifts channels by up to +-255; `contrast` scales around mid-grey
pub fn adjust_brightness_contrast(image: &mut RgbaImage, brightness: f32, contrast: f32) {
    let brightness = brightness.clamp(-100.0, 100.0);
    let contrast = contrast.clamp(-100.0, 100.0);
    if brightness == 0.0 && contrast == 0.0 {
        return;
    }

    let offset = brightness / 100.0 * 255.0;
    let factor = 259.0 * (contrast + 255.0) / (255.0 * (259.0 - contrast));
    for px in image.pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        for c in 0..3 {
            let v = px[c] as f32 + offset;
            px[c] = (factor * (v - 128.0) + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn apply_texture_overlay(image: &mut RgbaImage, pattern: &Arc<RgbaImage>, overlay: &TextureOverlay) {
    let (pw, ph) = pattern.dimensions();
    if pw == 0 || ph == 0 {
        return;
    }
    let scale = overlay.scale.max(0.01);
    let opacity = overlay.opacity.clamp(0.0, 1.0);

    for (x, y, px) in image.enumerate_pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        let tx = ((x as f32 / scale) as i64).rem_euclid(pw as i64) as u32;
        let ty = ((y as f32 / scale) as i64).rem_euclid(ph as i64) as u32;
        let tp = pattern.get_pixel(tx, ty);
        let strength = opacity * tp[3] as f32 / 255.0;
        if strength <= 0.0 {
            continue;
        }
        let cb = [px[0] as f32 / 255.0, px[1] as f32 / 255.0, px[2] as f32 / 255.0];
        let cs = [tp[0] as f32 / 255.0, tp[1] as f32 / 255.0, tp[2] as f32 / 255.0];
        let blended = blend_rgb(overlay.blend_mode, cb, cs);
        for c in 0..3 {
            let v = cb[c] + (blended[c] - cb[c]) * strength;
            px[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Clear pixels whose alpha is below `threshold` percent
fn apply_alpha_threshold(image: &mut RgbaImage, threshold: f32) {
    if threshold <= 0.0 {
        return;
    }
    let cutoff = threshold.min(100.0) / 100.0 * 255.0;
    for px in image.pixels_mut() {
        if (px[3] as f32) < cutoff {
            px.0 = [0, 0, 0, 0];
        }
    }
}

/// Recolour the image with the brush colour, keeping its alpha mask
pub fn apply_colorization(image: &mut RgbaImage, mode: ColorizationMode, color: &ColorSource, radius: f32) {
    let blend = match mode {
        ColorizationMode::Preserve => return,
        ColorizationMode::Tint => BlendMode::SourceAtop,
        ColorizationMode::Multiply => BlendMode::Multiply,
        ColorizationMode::Overlay => BlendMode::Overlay,
        ColorizationMode::Colorize => BlendMode::Color,
    };
    let cx = image.width() as f32 / 2.0;
    let cy = image.height() as f32 / 2.0;

    for (x, y, px) in image.enumerate_pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        let rgb = color.at(x as f32, y as f32, cx, cy, radius);
        if blend == BlendMode::SourceAtop {
            px.0 = composite_pixel(px.0, [rgb.r, rgb.g, rgb.b, 255], 1.0, blend);
            continue;
        }
        let cb = [px[0] as f32 / 255.0, px[1] as f32 / 255.0, px[2] as f32 / 255.0];
        let cs = [rgb.r as f32 / 255.0, rgb.g as f32 / 255.0, rgb.b as f32 / 255.0];
        let out = blend_rgb(blend, cb, cs);
        for c in 0..3 {
            px[c] = (out[c] * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}
