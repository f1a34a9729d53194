//! Engine configuration.
//!
//! All fields have defaults, so a partial JSON document (or none at all) is a
//! valid configuration.

use serde::{Deserialize, Serialize};

use crate::core::EngineResult;

/// Stamp cache sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Maximum number of cached stamps
    pub max_entries: usize,
    /// Number of oldest stamps dropped when the cache is full
    pub evict_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            evict_batch: 20,
        }
    }
}

/// Performance governor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GovernorConfig {
    /// Number of frame deltas in the rolling FPS window
    pub window_frames: usize,
    /// Below this FPS the stamp cache is shrunk to `low_retain`
    pub low_fps: f32,
    /// Below this FPS the cache is shrunk to `critical_retain` and stroke points are dropped
    pub critical_fps: f32,
    /// Consecutive slow frames required before acting
    pub sustained_frames: usize,
    pub low_retain: usize,
    pub critical_retain: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            window_frames: 60,
            low_fps: 30.0,
            critical_fps: 15.0,
            sustained_frames: 30,
            low_retain: 50,
            critical_retain: 20,
        }
    }
}

/// Puff rendering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PuffConfig {
    /// Interpolation stops of the displacement gradient
    pub displacement_stops: usize,
    /// Amplitude of the procedural noise on the colour dome
    pub noise_amplitude: f32,
}

impl Default for PuffConfig {
    fn default() -> Self {
        Self {
            displacement_stops: 16,
            noise_amplitude: 0.05,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub governor: GovernorConfig,
    pub puff: PuffConfig,
    /// Upper bound for the working stamp size in pixels
    pub max_stamp_size: f32,
    /// Side of the fallback stamp in pixels
    pub fallback_stamp_size: u32,
    /// Seed for draw-time stamp randomization; entropy when unset
    pub jitter_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            governor: GovernorConfig::default(),
            puff: PuffConfig::default(),
            max_stamp_size: 200.0,
            fallback_stamp_size: 20,
            jitter_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"cache":{"maxEntries":10}}"#).unwrap();
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.cache.evict_batch, 20);
        assert_eq!(config.max_stamp_size, 200.0);
        assert_eq!(config.governor.window_frames, 60);
    }

    #[test]
    fn json_roundtrip() {
        let config = EngineConfig {
            jitter_seed: Some(7),
            ..Default::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }
}
