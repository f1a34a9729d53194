//! Compositing operators for brush rendering
//!
//! All functions work with straight (non-premultiplied) alpha, matching the
//! RGBA8 buffers stamps and surfaces are stored in. Separable modes follow the
//! W3C compositing model: blend the colours, then source-over the result.

use glam::{Affine2, Vec2};
use image::RgbaImage;

use super::BlendMode;
use crate::surface::DirtyRect;

/// Separable blend of a single channel, both inputs in [0, 1]
#[inline]
pub fn blend_channel(mode: BlendMode, cb: f32, cs: f32) -> f32 {
    match mode {
        BlendMode::Normal | BlendMode::SourceAtop | BlendMode::DestinationOut => cs,
        BlendMode::Multiply => cb * cs,
        BlendMode::Screen => cb + cs - cb * cs,
        BlendMode::Overlay => hard_light(cs, cb),
        BlendMode::Darken => cb.min(cs),
        BlendMode::Lighten => cb.max(cs),
        BlendMode::ColorDodge => {
            if cb <= 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cb / (1.0 - cs)).min(1.0)
            }
        }
        BlendMode::ColorBurn => {
            if cb >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cb) / cs).min(1.0)
            }
        }
        BlendMode::HardLight => hard_light(cb, cs),
        BlendMode::SoftLight => {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let d = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (d - cb)
            }
        }
        BlendMode::Difference => (cb - cs).abs(),
        BlendMode::Exclusion => cb + cs - 2.0 * cb * cs,
        // Non-separable; handled in blend_rgb
        BlendMode::Color => cs,
    }
}

#[inline]
fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        let s = 2.0 * cs - 1.0;
        cb + s - cb * s
    }
}

#[inline]
pub fn luminance(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = luminance(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 && (l - n).abs() > f32::EPSILON {
        for ch in out.iter_mut() {
            *ch = l + (*ch - l) * l / (l - n);
        }
    }
    if x > 1.0 && (x - l).abs() > f32::EPSILON {
        for ch in out.iter_mut() {
            *ch = l + (*ch - l) * (1.0 - l) / (x - l);
        }
    }
    out
}

/// Replace the luminosity of `c` with `l`, keeping hue and saturation
pub fn set_luminance(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - luminance(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

/// Blend backdrop and source colours (each channel in [0, 1])
pub fn blend_rgb(mode: BlendMode, cb: [f32; 3], cs: [f32; 3]) -> [f32; 3] {
    match mode {
        BlendMode::Color => set_luminance(cs, luminance(cb)),
        _ => [
            blend_channel(mode, cb[0], cs[0]),
            blend_channel(mode, cb[1], cs[1]),
            blend_channel(mode, cb[2], cs[2]),
        ],
    }
}

#[inline]
fn to_unit(px: [u8; 4]) -> ([f32; 3], f32) {
    (
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ],
        px[3] as f32 / 255.0,
    )
}

#[inline]
fn to_u8(c: f32) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Composite `src` over `dst` with `mode`, scaling the source alpha by `alpha`
pub fn composite_pixel(dst: [u8; 4], src: [u8; 4], alpha: f32, mode: BlendMode) -> [u8; 4] {
    let (cb, ab) = to_unit(dst);
    let (cs, as_raw) = to_unit(src);
    let a_s = (as_raw * alpha).clamp(0.0, 1.0);

    if a_s <= 0.0 {
        return dst;
    }

    match mode {
        BlendMode::DestinationOut => {
            let out_a = ab * (1.0 - a_s);
            if out_a <= 0.0 {
                return [0, 0, 0, 0];
            }
            [dst[0], dst[1], dst[2], to_u8(out_a)]
        }
        BlendMode::SourceAtop => {
            if ab <= 0.0 {
                return dst;
            }
            let mut out = [0u8; 4];
            for i in 0..3 {
                out[i] = to_u8(a_s * cs[i] + (1.0 - a_s) * cb[i]);
            }
            out[3] = dst[3];
            out
        }
        _ => {
            let blended = blend_rgb(mode, cb, cs);
            let out_a = a_s + ab * (1.0 - a_s);
            if out_a <= 0.0 {
                return [0, 0, 0, 0];
            }
            let mut out = [0u8; 4];
            for i in 0..3 {
                let mixed = (1.0 - ab) * cs[i] + ab * blended[i];
                out[i] = to_u8((a_s * mixed + ab * cb[i] * (1.0 - a_s)) / out_a);
            }
            out[3] = to_u8(out_a);
            out
        }
    }
}

/// Bilinear sample at continuous pixel coordinates (pixel centres on integers).
/// Taps outside the image count as transparent; interpolation is premultiplied.
pub fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Option<[u8; 4]> {
    let (w, h) = image.dimensions();
    if !(x > -1.0 && y > -1.0 && x < w as f32 && y < h as f32) {
        return None;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let mut acc = [0.0f32; 4];
    for (dx, dy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        if weight <= 0.0 {
            continue;
        }
        let px = x0 as i64 + dx;
        let py = y0 as i64 + dy;
        if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
            continue;
        }
        let p = image.get_pixel(px as u32, py as u32);
        let a = p[3] as f32 * weight;
        acc[0] += p[0] as f32 * a;
        acc[1] += p[1] as f32 * a;
        acc[2] += p[2] as f32 * a;
        acc[3] += a;
    }

    if acc[3] <= 0.0 {
        return None;
    }
    Some([
        (acc[0] / acc[3]).round().clamp(0.0, 255.0) as u8,
        (acc[1] / acc[3]).round().clamp(0.0, 255.0) as u8,
        (acc[2] / acc[3]).round().clamp(0.0, 255.0) as u8,
        acc[3].round().clamp(0.0, 255.0) as u8,
    ])
}

/// Composite `src` onto `dst` through `transform` (source pixels to destination
/// pixels). Returns the destination area touched, if any.
pub fn draw_image(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    transform: Affine2,
    alpha: f32,
    mode: BlendMode,
) -> Option<DirtyRect> {
    let (sw, sh) = src.dimensions();
    let (dw, dh) = dst.dimensions();
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 || alpha <= 0.0 {
        return None;
    }
    let det = transform.matrix2.determinant();
    if !det.is_finite() || det.abs() <= f32::EPSILON {
        return None;
    }

    let corners = [
        Vec2::ZERO,
        Vec2::new(sw as f32, 0.0),
        Vec2::new(0.0, sh as f32),
        Vec2::new(sw as f32, sh as f32),
    ]
    .map(|c| transform.transform_point2(c));
    let min = corners.iter().fold(Vec2::splat(f32::MAX), |m, c| m.min(*c));
    let max = corners.iter().fold(Vec2::splat(f32::MIN), |m, c| m.max(*c));

    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(dw);
    let y1 = (max.y.ceil().max(0.0) as u32).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let inverse = transform.inverse();
    for y in y0..y1 {
        for x in x0..x1 {
            let s = inverse.transform_point2(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
            if let Some(src_px) = sample_bilinear(src, s.x - 0.5, s.y - 0.5) {
                let dst_px = dst.get_pixel_mut(x, y);
                dst_px.0 = composite_pixel(dst_px.0, src_px, alpha, mode);
            }
        }
    }

    Some(DirtyRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}
