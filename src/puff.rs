//! Puff displacement engine
//!
//! A puff is a raised dome of paint. Each placement writes two things: a
//! height contribution into the displacement surface (grey 128 is flat,
//! 255 is full height) and a shaded colour dome into the paint surface so
//! the 2D preview matches the 3D relief.

use std::f32::consts::FRAC_PI_2;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::brush::{composite_pixel, smoothstep, BlendMode, BrushPoint, ImageStore, Rgb};
use crate::config::PuffConfig;
use crate::surface::{DirtyRect, TargetSurface, TextureChange, NEUTRAL_DISPLACEMENT};

/// Physical height range (mm) mapped onto the displacement range
pub const MIN_HEIGHT_MM: f32 = 0.2;
pub const MAX_HEIGHT_MM: f32 = 1.0;

/// Per-placement puff parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PuffParameters {
    /// Millimetres, 0.2 - 1.0
    pub height: f32,
    /// 0 - 1, flattens the dome top
    pub softness: f32,
    pub color: String,
    pub opacity: f32,
    /// Diameter in pixels
    pub size: f32,
    pub flow: f32,
    /// Fraction of size between placements
    pub spacing: f32,
    /// Image id of a pattern modulating the colour dome
    pub pattern: Option<String>,
}

impl Default for PuffParameters {
    fn default() -> Self {
        Self {
            height: 0.6,
            softness: 0.5,
            color: "#ffffff".to_string(),
            opacity: 1.0,
            size: 30.0,
            flow: 1.0,
            spacing: 0.25,
            pattern: None,
        }
    }
}

/// Normalized dome height at `distance` (0 at centre, 1 at the rim)
pub fn calculate_dome_profile(distance: f32, softness: f32) -> f32 {
    if !(distance < 1.0) {
        return 0.0;
    }
    let d = distance.max(0.0);
    (d * FRAC_PI_2).cos().powf(1.0 / (softness.max(0.0) + 0.1))
}

/// Displacement byte for a pixel `distance` px from a puff centre, in [128, 255]
pub fn calculate_displacement_value(distance: f32, radius: f32, height: f32, softness: f32) -> u8 {
    if !(radius > 0.0) || !(distance < radius) {
        return NEUTRAL_DISPLACEMENT;
    }
    let normalized_height =
        ((height - MIN_HEIGHT_MM) / (MAX_HEIGHT_MM - MIN_HEIGHT_MM)).clamp(0.0, 1.0);
    // Square root keeps low heights distinguishable
    let value = normalized_height.sqrt() * calculate_dome_profile(distance / radius, softness);
    let value = if value.is_finite() { value } else { 0.0 };
    (128.0 + value * 127.0).floor().clamp(128.0, 255.0) as u8
}

/// Pixel bounds of a circle, clipped to the surface
fn circle_bounds(cx: f32, cy: f32, radius: f32, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if !(cx.is_finite() && cy.is_finite() && radius > 0.0) {
        return None;
    }
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil().max(0.0) as u32).min(width);
    let y1 = ((cy + radius).ceil().max(0.0) as u32).min(height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Paint the radial displacement gradient of one puff. Pixels inside the
/// radius are replaced, the rim lands exactly on 128.
pub fn generate_puff_displacement(
    surface: &mut dyn TargetSurface,
    cx: f32,
    cy: f32,
    radius: f32,
    height: f32,
    softness: f32,
    stops: usize,
) -> Option<DirtyRect> {
    paint_displacement(surface, cx, cy, radius, height, softness, stops, false)
}

/// With `keep_higher`, existing relief under the footprint is only raised,
/// so overlapping puffs of one stroke merge into a ridge.
#[allow(clippy::too_many_arguments)]
fn paint_displacement(
    surface: &mut dyn TargetSurface,
    cx: f32,
    cy: f32,
    radius: f32,
    height: f32,
    softness: f32,
    stops: usize,
    keep_higher: bool,
) -> Option<DirtyRect> {
    let (w, h) = surface.dimensions();
    let (x0, y0, x1, y1) = circle_bounds(cx, cy, radius, w, h)?;

    let stops = stops.max(2);
    let mut values: Vec<f32> = (0..stops)
        .map(|i| {
            let t = i as f32 / (stops - 1) as f32;
            calculate_displacement_value(t * radius, radius, height, softness) as f32
        })
        .collect();
    if let Some(rim) = values.last_mut() {
        *rim = NEUTRAL_DISPLACEMENT as f32;
    }

    let image = surface.image_mut();
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let t = (dx * dx + dy * dy).sqrt() / radius;
            if t >= 1.0 {
                continue;
            }
            let pos = t * (stops - 1) as f32;
            let i = (pos.floor() as usize).min(stops - 2);
            let frac = pos - i as f32;
            let v = values[i] + (values[i + 1] - values[i]) * frac;
            let mut v = v.round().clamp(NEUTRAL_DISPLACEMENT as f32, 255.0) as u8;
            if keep_higher {
                v = v.max(image.get_pixel(x, y)[0]);
            }
            image.put_pixel(x, y, image::Rgba([v, v, v, 255]));
        }
    }

    Some(DirtyRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Paint the shaded colour dome of one puff over the paint surface
pub fn draw_puff_dome(
    surface: &mut dyn TargetSurface,
    cx: f32,
    cy: f32,
    params: &PuffParameters,
    pattern: Option<&image::RgbaImage>,
    noise_amplitude: f32,
) -> Option<DirtyRect> {
    let radius = params.size / 2.0;
    let (w, h) = surface.dimensions();
    let (x0, y0, x1, y1) = circle_bounds(cx, cy, radius, w, h)?;

    let base = Rgb::from_hex_or_black(&params.color);
    let strength = (params.opacity * params.flow).clamp(0.0, 1.0);
    let seed = ((cx.to_bits() as u64) << 32) | cy.to_bits() as u64;
    let mut rng = StdRng::seed_from_u64(seed);

    let image = surface.image_mut();
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt() / radius;
            if d >= 1.0 {
                continue;
            }

            let mut alpha = strength * calculate_dome_profile(d, params.softness);
            if let Some(pattern) = pattern.filter(|p| p.width() > 0 && p.height() > 0) {
                let p = pattern.get_pixel(x % pattern.width(), y % pattern.height());
                alpha *= (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) / 255.0;
            }
            if alpha <= 0.0 {
                continue;
            }

            // Centre highlight, rim shadow, slight grain
            let highlight = 0.15 * (1.0 - d).powi(2);
            let shadow = 0.25 * smoothstep(0.6, 1.0, d);
            let noise = noise_amplitude * (rng.gen::<f32>() * 2.0 - 1.0);
            let shade = 1.0 + highlight - shadow + noise;
            let lit = base.scaled(shade);

            let src = [lit.r, lit.g, lit.b, 255];
            let dst = image.get_pixel_mut(x, y);
            dst.0 = composite_pixel(dst.0, src, alpha, BlendMode::Normal);
        }
    }

    Some(DirtyRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

#[derive(Debug, Clone, Default)]
pub struct PuffEngine {
    config: PuffConfig,
}

impl PuffEngine {
    pub fn new(config: PuffConfig) -> Self {
        Self { config }
    }

    /// Place one puff: displacement first, then the colour dome
    pub fn place_puff(
        &self,
        point: &BrushPoint,
        params: &PuffParameters,
        images: &ImageStore,
        paint: &mut dyn TargetSurface,
        displacement: &mut dyn TargetSurface,
    ) -> Vec<TextureChange> {
        self.place(point, params, images, paint, displacement, false)
    }

    fn place(
        &self,
        point: &BrushPoint,
        params: &PuffParameters,
        images: &ImageStore,
        paint: &mut dyn TargetSurface,
        displacement: &mut dyn TargetSurface,
        keep_higher: bool,
    ) -> Vec<TextureChange> {
        let radius = params.size / 2.0;
        let mut changes = Vec::with_capacity(2);

        if let Some(dirty) = paint_displacement(
            displacement,
            point.x,
            point.y,
            radius,
            params.height,
            params.softness,
            self.config.displacement_stops,
            keep_higher,
        ) {
            changes.push(TextureChange::Displacement { dirty });
        }

        let pattern = params.pattern.as_deref().and_then(|id| match images.resolve(id) {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::debug!("Puff pattern unavailable: {}", err);
                None
            }
        });
        if let Some(dirty) = draw_puff_dome(
            paint,
            point.x,
            point.y,
            params,
            pattern.as_deref(),
            self.config.noise_amplitude,
        ) {
            changes.push(TextureChange::Paint { dirty });
        }
        changes
    }

    /// Place puffs along `points` every `size * spacing` pixels. Overlapping
    /// puffs keep the higher relief instead of replacing each other.
    pub fn puff_stroke(
        &self,
        points: &[BrushPoint],
        params: &PuffParameters,
        images: &ImageStore,
        paint: &mut dyn TargetSurface,
        displacement: &mut dyn TargetSurface,
    ) -> Vec<TextureChange> {
        let placements = spaced_positions(points, (params.size * params.spacing).max(1.0));
        tracing::debug!("Puff stroke: {} placements", placements.len());

        let mut paint_dirty = None;
        let mut displacement_dirty = None;
        for point in &placements {
            for change in self.place(point, params, images, paint, displacement, true) {
                match change {
                    TextureChange::Paint { dirty } => {
                        paint_dirty = DirtyRect::merge(paint_dirty, Some(dirty))
                    }
                    TextureChange::Displacement { dirty } => {
                        displacement_dirty = DirtyRect::merge(displacement_dirty, Some(dirty))
                    }
                }
            }
        }

        displacement_dirty
            .map(|dirty| TextureChange::Displacement { dirty })
            .into_iter()
            .chain(paint_dirty.map(|dirty| TextureChange::Paint { dirty }))
            .collect()
    }
}

/// Walk the polyline and emit a point every `step` pixels, starting at the first point
fn spaced_positions(points: &[BrushPoint], step: f32) -> Vec<BrushPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![*first];
    let mut carried = 0.0f32;

    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let length = (dx * dx + dy * dy).sqrt();
        if !(length > 0.0) {
            continue;
        }
        let mut along = step - carried;
        while along <= length {
            let t = along / length;
            out.push(BrushPoint {
                x: a.x + dx * t,
                y: a.y + dy * t,
                pressure: a.pressure + (b.pressure - a.pressure) * t,
                ..*a
            });
            along += step;
        }
        carried = length - (along - step);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RasterSurface;

    #[test]
    fn dome_profile_edges() {
        assert_eq!(calculate_dome_profile(0.0, 0.5), 1.0);
        assert_eq!(calculate_dome_profile(1.0, 0.5), 0.0);
        assert_eq!(calculate_dome_profile(1.5, 0.5), 0.0);
        let soft = calculate_dome_profile(0.5, 0.9);
        let sharp = calculate_dome_profile(0.5, 0.0);
        assert!(soft > sharp);
    }

    #[test]
    fn displacement_scenarios() {
        assert_eq!(calculate_displacement_value(0.0, 50.0, 1.0, 0.5), 255);
        assert_eq!(calculate_displacement_value(60.0, 50.0, 1.0, 0.5), 128);
        assert_eq!(calculate_displacement_value(50.0, 50.0, 1.0, 0.5), 128);
        assert_eq!(calculate_displacement_value(0.0, 50.0, 0.2, 0.5), 128);
        assert_eq!(calculate_displacement_value(0.0, 0.0, 1.0, 0.5), 128);
    }

    #[test]
    fn displacement_outside_radius_is_neutral() {
        for distance in [50.0, 50.001, 75.0, 1e6] {
            for height in [0.2, 0.5, 1.0, 3.0] {
                assert_eq!(calculate_displacement_value(distance, 50.0, height, 0.3), 128);
            }
        }
    }

    #[test]
    fn centre_displacement_grows_with_height() {
        let mut last = 0u8;
        for i in 0..=80 {
            let height = 0.2 + i as f32 * 0.01;
            let value = calculate_displacement_value(0.0, 40.0, height, 0.5);
            assert!(value >= last, "height {} gave {} after {}", height, value, last);
            assert!(value >= 128);
            last = value;
        }
        assert_eq!(last, 255);
    }

    #[test]
    fn generated_gradient_replaces_and_pins_rim() {
        let mut surface = RasterSurface::displacement(100, 100);
        surface.image_mut().put_pixel(50, 50, image::Rgba([250, 250, 250, 255]));
        let dirty = generate_puff_displacement(&mut surface, 50.0, 50.0, 20.0, 0.4, 0.5, 16);
        assert!(dirty.is_some());

        let center = surface.image().get_pixel(50, 50)[0];
        let expected = calculate_displacement_value(0.0, 20.0, 0.4, 0.5);
        assert!((center as i32 - expected as i32).abs() <= 2);
        assert!(center < 250);

        // Just inside the rim and outside it
        assert!(surface.image().get_pixel(69, 50)[0] <= 135);
        assert_eq!(surface.image().get_pixel(75, 50)[0], 128);
        assert_eq!(surface.image().get_pixel(0, 0)[0], 128);
    }

    #[test]
    fn dome_is_lit_at_centre_and_shaded_at_rim() {
        let mut paint = RasterSurface::new(40, 40);
        let params = PuffParameters {
            size: 40.0,
            color: "#808080".to_string(),
            ..Default::default()
        };
        assert!(draw_puff_dome(&mut paint, 20.0, 20.0, &params, None, 0.0).is_some());

        let centre = paint.image().get_pixel(20, 20);
        let rim = paint.image().get_pixel(37, 20);
        assert!(centre[0] > 140, "centre {:?}", centre);
        assert!(rim[3] > 0);
        assert!(rim[0] < 115, "rim {:?}", rim);
        assert_eq!(paint.image().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn puff_stroke_reports_both_surfaces() {
        let engine = PuffEngine::default();
        let images = ImageStore::new();
        let mut paint = RasterSurface::new(120, 60);
        let mut displacement = RasterSurface::displacement(120, 60);
        let points = vec![BrushPoint::new(20.0, 30.0, 1.0), BrushPoint::new(100.0, 30.0, 1.0)];
        let params = PuffParameters {
            height: 1.0,
            color: "#ff0000".to_string(),
            ..Default::default()
        };

        let changes = engine.puff_stroke(&points, &params, &images, &mut paint, &mut displacement);
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], TextureChange::Displacement { .. }));
        assert!(matches!(changes[1], TextureChange::Paint { .. }));

        let middle = paint.image().get_pixel(60, 30);
        assert!(middle[3] > 200);
        assert!(middle[0] > middle[1]);
        assert!(displacement.image().get_pixel(60, 30)[0] > 200);
        assert_eq!(displacement.image().get_pixel(60, 5)[0], 128);
    }

    #[test]
    fn spacing_walks_the_path() {
        let points = vec![
            BrushPoint::new(0.0, 0.0, 1.0),
            BrushPoint::new(5.0, 0.0, 1.0),
            BrushPoint::new(10.0, 0.0, 1.0),
        ];
        let xs: Vec<f32> = spaced_positions(&points, 4.0).iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 4.0, 8.0]);
    }
}
