//! Filter kernels applied to custom brush images
//!
//! Row-parallel with rayon; every kernel clamps samples at the image border.

use image::RgbaImage;
use rayon::prelude::*;

use super::settings::FilterKind;

/// Apply `kind` at `amount` (0-100). Returns the input unchanged for `None` or a zero amount.
pub fn apply_filter(image: &RgbaImage, kind: FilterKind, amount: f32) -> RgbaImage {
    let amount = amount.clamp(0.0, 100.0);
    if amount <= 0.0 {
        return image.clone();
    }
    match kind {
        FilterKind::None => image.clone(),
        FilterKind::Blur => box_blur(image, (amount / 20.0).round().max(1.0) as usize),
        FilterKind::Sharpen => sharpen(image, amount / 100.0),
        FilterKind::Edge => edge_detect(image, amount / 100.0),
    }
}

/// Separable box blur on premultiplied colour so transparent pixels don't darken edges
pub fn box_blur(image: &RgbaImage, radius: usize) -> RgbaImage {
    let w = image.width() as usize;
    let h = image.height() as usize;
    if w == 0 || h == 0 || radius == 0 {
        return image.clone();
    }

    let kernel = radius * 2 + 1;
    let inv_k = 1.0 / kernel as f32;
    let src = image.as_raw();

    let premul: Vec<f32> = src
        .chunks_exact(4)
        .flat_map(|px| {
            let a = px[3] as f32 / 255.0;
            [px[0] as f32 * a, px[1] as f32 * a, px[2] as f32 * a, px[3] as f32]
        })
        .collect();

    // Horizontal pass
    let mut h_buf = vec![0.0f32; w * h * 4];
    h_buf
        .par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut sums = [0.0f32; 4];
                for k in 0..kernel {
                    let sx = (x as i64 + k as i64 - radius as i64).clamp(0, w as i64 - 1) as usize;
                    let si = (y * w + sx) * 4;
                    for c in 0..4 {
                        sums[c] += premul[si + c];
                    }
                }
                for c in 0..4 {
                    row_out[x * 4 + c] = sums[c] * inv_k;
                }
            }
        });

    // Vertical pass
    let mut out = vec![0u8; w * h * 4];
    out.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut sums = [0.0f32; 4];
                for k in 0..kernel {
                    let sy = (y as i64 + k as i64 - radius as i64).clamp(0, h as i64 - 1) as usize;
                    let si = (sy * w + x) * 4;
                    for c in 0..4 {
                        sums[c] += h_buf[si + c];
                    }
                }
                let a = sums[3] * inv_k;
                let oi = x * 4;
                if a > 0.0 {
                    let inv_a = 255.0 / a;
                    for c in 0..3 {
                        row_out[oi + c] = (sums[c] * inv_k * inv_a).round().clamp(0.0, 255.0) as u8;
                    }
                }
                row_out[oi + 3] = a.round().clamp(0.0, 255.0) as u8;
            }
        });

    RgbaImage::from_raw(image.width(), image.height(), out).unwrap_or_else(|| image.clone())
}

#[inline]
fn sample(src: &[u8], w: usize, h: usize, x: i64, y: i64) -> [u8; 4] {
    let sx = x.clamp(0, w as i64 - 1) as usize;
    let sy = y.clamp(0, h as i64 - 1) as usize;
    let i = (sy * w + sx) * 4;
    [src[i], src[i + 1], src[i + 2], src[i + 3]]
}

/// 3x3 sharpen kernel mixed with the original by `strength` (0-1)
pub fn sharpen(image: &RgbaImage, strength: f32) -> RgbaImage {
    const KERNEL: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];
    let strength = strength.clamp(0.0, 1.0);
    let w = image.width() as usize;
    let h = image.height() as usize;
    if w == 0 || h == 0 {
        return image.clone();
    }
    let src = image.as_raw();

    let mut out = vec![0u8; w * h * 4];
    out.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut acc = [0.0f32; 3];
                for (ky, row) in KERNEL.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        if *weight == 0.0 {
                            continue;
                        }
                        let px = sample(src, w, h, x as i64 + kx as i64 - 1, y as i64 + ky as i64 - 1);
                        for c in 0..3 {
                            acc[c] += px[c] as f32 * weight;
                        }
                    }
                }
                let si = (y * w + x) * 4;
                let oi = x * 4;
                for c in 0..3 {
                    let orig = src[si + c] as f32;
                    row_out[oi + c] = (orig + (acc[c] - orig) * strength).round().clamp(0.0, 255.0) as u8;
                }
                row_out[oi + 3] = src[si + 3];
            }
        });

    RgbaImage::from_raw(image.width(), image.height(), out).unwrap_or_else(|| image.clone())
}

/// Sobel edge magnitude on luminance, mixed with the original by `strength` (0-1)
pub fn edge_detect(image: &RgbaImage, strength: f32) -> RgbaImage {
    const GX: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    const GY: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
    let strength = strength.clamp(0.0, 1.0);
    let w = image.width() as usize;
    let h = image.height() as usize;
    if w == 0 || h == 0 {
        return image.clone();
    }
    let src = image.as_raw();
    let luma = |px: [u8; 4]| {
        (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32) * px[3] as f32 / 255.0
    };

    let mut out = vec![0u8; w * h * 4];
    out.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut gx = 0.0f32;
                let mut gy = 0.0f32;
                for ky in 0..3 {
                    for kx in 0..3 {
                        let l = luma(sample(src, w, h, x as i64 + kx as i64 - 1, y as i64 + ky as i64 - 1));
                        gx += l * GX[ky][kx];
                        gy += l * GY[ky][kx];
                    }
                }
                let magnitude = (gx * gx + gy * gy).sqrt().min(255.0);
                let si = (y * w + x) * 4;
                let oi = x * 4;
                for c in 0..3 {
                    let orig = src[si + c] as f32;
                    row_out[oi + c] = (orig + (magnitude - orig) * strength).round().clamp(0.0, 255.0) as u8;
                }
                row_out[oi + 3] = src[si + 3];
            }
        });

    RgbaImage::from_raw(image.width(), image.height(), out).unwrap_or_else(|| image.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn blur_averages_checkerboard() {
        let blurred = box_blur(&checker(9), 1);
        let center = blurred.get_pixel(4, 4);
        // 3x3 window over a checkerboard is 5/9 or 4/9 white
        assert!(center[0] > 90 && center[0] < 165);
        assert_eq!(center[3], 255);
    }

    #[test]
    fn blur_does_not_darken_transparent_edges() {
        let mut img = RgbaImage::new(5, 5);
        img.put_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let blurred = box_blur(&img, 1);
        let px = blurred.get_pixel(1, 2);
        assert_eq!(px[0], 255);
        assert!(px[3] > 0 && px[3] < 255);
    }

    #[test]
    fn sharpen_keeps_flat_regions() {
        let flat = RgbaImage::from_pixel(4, 4, Rgba([100, 100, 100, 255]));
        assert_eq!(sharpen(&flat, 1.0), flat);
    }

    #[test]
    fn edge_detect_flat_is_black() {
        let flat = RgbaImage::from_pixel(4, 4, Rgba([100, 100, 100, 255]));
        let edges = edge_detect(&flat, 1.0);
        assert_eq!(edges.get_pixel(2, 2)[0], 0);
        assert_eq!(edges.get_pixel(2, 2)[3], 255);
    }

    #[test]
    fn zero_amount_is_identity() {
        let img = checker(4);
        assert_eq!(apply_filter(&img, FilterKind::Edge, 0.0), img);
        assert_eq!(apply_filter(&img, FilterKind::None, 50.0), img);
    }
}
