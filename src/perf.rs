//! Performance governor
//!
//! Advisory only: it watches frame times and cache statistics reported by the
//! host and recommends shrinking the stamp cache. It never blocks or fails a
//! rendering call.

use std::collections::VecDeque;

use crate::config::GovernorConfig;

/// What the engine should do after a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorAction {
    Keep,
    /// Drop all but the `retain` most recent stamps
    ShrinkCache { retain: usize },
    /// Shrink the cache and drop cached stroke points
    ReleaseMemory { retain: usize },
}

#[derive(Debug)]
pub struct PerformanceGovernor {
    config: GovernorConfig,
    frame_deltas: VecDeque<f32>,
    slow_frames: usize,
    critical_frames: usize,
    cache_hits: u64,
    cache_misses: u64,
}

impl PerformanceGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            frame_deltas: VecDeque::with_capacity(config.window_frames),
            config,
            slow_frames: 0,
            critical_frames: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Record a frame time in milliseconds
    pub fn record_frame(&mut self, delta_ms: f32) -> GovernorAction {
        if !(delta_ms.is_finite() && delta_ms > 0.0) {
            return GovernorAction::Keep;
        }
        if self.frame_deltas.len() >= self.config.window_frames.max(1) {
            self.frame_deltas.pop_front();
        }
        self.frame_deltas.push_back(delta_ms);

        let Some(fps) = self.fps() else {
            return GovernorAction::Keep;
        };

        if fps < self.config.critical_fps {
            self.critical_frames += 1;
            self.slow_frames += 1;
        } else if fps < self.config.low_fps {
            self.critical_frames = 0;
            self.slow_frames += 1;
        } else {
            self.critical_frames = 0;
            self.slow_frames = 0;
        }

        let sustained = self.config.sustained_frames.max(1);
        if self.critical_frames >= sustained {
            self.critical_frames = 0;
            self.slow_frames = 0;
            tracing::info!("Sustained {:.1} fps, shrinking stamp cache", fps);
            GovernorAction::ShrinkCache {
                retain: self.config.critical_retain,
            }
        } else if self.slow_frames >= sustained {
            self.slow_frames = 0;
            tracing::debug!("Sustained {:.1} fps, trimming stamp cache", fps);
            GovernorAction::ShrinkCache {
                retain: self.config.low_retain,
            }
        } else {
            GovernorAction::Keep
        }
    }

    /// Host reported memory pressure
    pub fn report_memory_pressure(&mut self) -> GovernorAction {
        tracing::info!("Memory pressure reported, releasing caches");
        GovernorAction::ReleaseMemory {
            retain: self.config.critical_retain,
        }
    }

    /// Rolling average FPS over the frame window
    pub fn fps(&self) -> Option<f32> {
        if self.frame_deltas.is_empty() {
            return None;
        }
        let mean = self.frame_deltas.iter().sum::<f32>() / self.frame_deltas.len() as f32;
        Some(1000.0 / mean)
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses
    }

    pub fn cache_hit_rate(&self) -> f32 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f32 / total as f32
        }
    }

    pub fn reset(&mut self) {
        self.frame_deltas.clear();
        self.slow_frames = 0;
        self.critical_frames = 0;
        self.cache_hits = 0;
        self.cache_misses = 0;
    }
}

impl Default for PerformanceGovernor {
    fn default() -> Self {
        Self::new(GovernorConfig::default())
    }
}
