//! Per-stamp dynamics: pressure and velocity response

use serde::{Deserialize, Serialize};

use super::settings::{normalize_degrees, BrushSettings};
use super::BrushPoint;

pub const MIN_SIZE: f32 = 0.5;
pub const MAX_SIZE: f32 = 500.0;
pub const MIN_SPACING: f32 = 0.01;
pub const MAX_SPACING: f32 = 1.0;

/// Pressure curve types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PressureCurve {
    /// Linear mapping (1:1)
    #[default]
    Linear,
    /// Soft curve (more sensitive at low pressure)
    Soft,
    /// Hard curve (less sensitive at low pressure)
    Hard,
}

impl PressureCurve {
    /// Apply the pressure curve to a raw pressure value. The curve shapes
    /// the [0, 1] range; anything outside passes through linearly and is
    /// left for the output clamps.
    pub fn apply(&self, pressure: f32) -> f32 {
        if !pressure.is_finite() {
            return 0.0;
        }
        let p = pressure.clamp(0.0, 1.0);
        let excess = pressure - p;

        let shaped = match self {
            PressureCurve::Linear => p,
            PressureCurve::Soft => {
                // Ease-out: more sensitive at low pressure
                1.0 - (1.0 - p).powi(2)
            }
            PressureCurve::Hard => {
                // Ease-in: less sensitive at low pressure
                p.powi(2)
            }
        };
        shaped + excess
    }
}

/// Resolved parameters for one stamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampDynamics {
    pub size: f32,
    pub opacity: f32,
    /// Degrees in [0, 360)
    pub angle: f32,
    /// Fraction of size
    pub spacing: f32,
}

/// Resolve size, opacity, angle and spacing for one point of a stroke.
/// Every point, the first included, responds the same way.
pub fn calculate_dynamics(point: &BrushPoint, settings: &BrushSettings, _index: usize) -> StampDynamics {
    let dynamics = &settings.dynamics;
    let pressure = dynamics.pressure_curve.apply(point.pressure);
    let velocity = if point.velocity.is_finite() {
        point.velocity.max(0.0)
    } else {
        0.0
    };

    // Custom brushes can override the pressure flags
    let custom = settings.custom_image();
    let size_pressure = custom
        .and_then(|c| c.pressure_size)
        .unwrap_or(dynamics.size_pressure);
    let opacity_pressure = custom
        .and_then(|c| c.pressure_opacity)
        .unwrap_or(dynamics.opacity_pressure);

    let mut size = settings.size;
    let mut opacity = settings.opacity;
    let mut angle = settings.angle;
    let mut spacing = settings.spacing;

    if size_pressure {
        size *= pressure;
    }
    if opacity_pressure {
        opacity *= pressure;
    }
    if dynamics.angle_pressure {
        angle += (pressure - 1.0) * 45.0;
    }
    if dynamics.spacing_pressure {
        // Lighter strokes lay stamps closer together
        spacing *= 0.5 + 0.5 * pressure;
    }

    if dynamics.velocity_size {
        size *= (1.0 - velocity * 0.01).max(0.1);
    }
    if dynamics.velocity_opacity {
        opacity *= (1.0 - velocity * 0.3).max(0.2);
    }
    if dynamics.velocity_rotation {
        angle += (velocity * dynamics.rotation_amount) % 360.0;
    }
    if dynamics.velocity_scale {
        size *= (1.0 - velocity * dynamics.scale_amount).max(0.1);
    }

    StampDynamics {
        size: clamp_or(size, MIN_SIZE, MAX_SIZE, settings.size),
        opacity: clamp_or(opacity, 0.0, 1.0, settings.opacity),
        angle: normalize_degrees(angle),
        spacing: clamp_or(spacing, MIN_SPACING, MAX_SPACING, settings.spacing),
    }
}

/// Clamp to [min, max]; non-finite values are replaced by `fallback` (itself clamped)
fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else if fallback.is_finite() {
        fallback.clamp(min, max)
    } else {
        min
    }
}
