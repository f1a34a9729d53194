//! Brush engine - renders strokes into target surfaces

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::dynamics::{calculate_dynamics, StampDynamics};
use super::images::ImageStore;
use super::interpolation::{segment_points, InterpolationMode};
use super::settings::BrushSettings;
use super::stamp::{Stamp, StampBuilder};
use super::BrushPoint;
use crate::config::EngineConfig;
use crate::perf::{GovernorAction, PerformanceGovernor};
use crate::puff::{PuffEngine, PuffParameters};
use crate::surface::{
    uv_to_pixel, DirtyRect, LayerSink, ScreenProjector, StampPlacement, TargetSurface,
    TextureChange,
};

/// Callback fired after every texture-affecting change
pub type TextureListener = Box<dyn FnMut(&TextureChange) + Send>;

/// Engine shared between threads; every surface write happens under the lock
pub type SharedBrushEngine = Arc<Mutex<BrushEngine>>;

/// Points of the active stroke, kept for gap filling
#[derive(Debug, Default)]
struct StrokeSession {
    /// Last two rendered input points, oldest first
    recent: Vec<BrushPoint>,
    /// Dynamics index of the next stamp
    index: usize,
}

impl StrokeSession {
    fn push(&mut self, point: BrushPoint) {
        if self.recent.len() == 2 {
            self.recent.remove(0);
        }
        self.recent.push(point);
    }
}

/// The main brush engine that renders strokes
pub struct BrushEngine {
    config: EngineConfig,
    stamps: StampBuilder,
    images: ImageStore,
    governor: PerformanceGovernor,
    puff: PuffEngine,
    jitter: StdRng,
    interpolation: InterpolationMode,
    session: Option<StrokeSession>,
    listeners: Vec<TextureListener>,
}

impl std::fmt::Debug for BrushEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrushEngine")
            .field("cached_stamps", &self.stamps.cache().len())
            .field("images", &self.images.len())
            .field("interpolation", &self.interpolation)
            .field("stroke_active", &self.session.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl BrushEngine {
    pub fn new(config: EngineConfig) -> Self {
        let jitter = match config.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            stamps: StampBuilder::new(&config),
            images: ImageStore::new(),
            governor: PerformanceGovernor::new(config.governor.clone()),
            puff: PuffEngine::new(config.puff.clone()),
            jitter,
            interpolation: InterpolationMode::default(),
            session: None,
            listeners: Vec::new(),
            config,
        }
    }

    pub fn into_shared(self) -> SharedBrushEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut ImageStore {
        &mut self.images
    }

    pub fn governor(&self) -> &PerformanceGovernor {
        &self.governor
    }

    pub fn cached_stamps(&self) -> usize {
        self.stamps.cache().len()
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, mode: InterpolationMode) {
        self.interpolation = mode;
    }

    /// Stamp bitmap for `settings`, from cache when possible
    pub fn create_brush_stamp(&mut self, settings: &BrushSettings) -> Stamp {
        self.stamps
            .create_brush_stamp(settings, &self.images, &mut self.governor)
    }

    /// Register a listener for texture changes
    pub fn on_texture_change<F>(&mut self, listener: F)
    where
        F: FnMut(&TextureChange) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn notify(&mut self, change: TextureChange) {
        for listener in self.listeners.iter_mut() {
            listener(&change);
        }
    }

    /// Draw one stamp per point, in order. Returns the touched area.
    pub fn render_brush_stroke(
        &mut self,
        points: &[BrushPoint],
        settings: &BrushSettings,
        surface: &mut dyn TargetSurface,
    ) -> Option<DirtyRect> {
        let dirty = self.draw_points(points, settings, surface, 0);
        if let Some(dirty) = dirty {
            self.notify(TextureChange::Paint { dirty });
        }
        dirty
    }

    /// Render into the active layer, recompose, then notify
    pub fn render_stroke_to_layer(
        &mut self,
        points: &[BrushPoint],
        settings: &BrushSettings,
        layers: &mut dyn LayerSink,
    ) -> Option<DirtyRect> {
        if points.is_empty() {
            return None;
        }
        let dirty = match layers.target_surface() {
            Some(surface) => self.draw_points(points, settings, surface, 0),
            None => {
                tracing::warn!("No active layer surface, dropping {} points", points.len());
                return None;
            }
        };
        layers.composite();
        if let Some(dirty) = dirty {
            self.notify(TextureChange::Paint { dirty });
        }
        dirty
    }

    /// Start a stroke session; any previous session is discarded
    pub fn begin_stroke(&mut self) {
        if self.session.is_some() {
            tracing::debug!("Stroke restarted before end_stroke");
        }
        self.session = Some(StrokeSession::default());
    }

    /// Render newly sampled points, filling gaps from the last rendered point
    /// at `size * spacing` pixels
    pub fn continue_stroke(
        &mut self,
        points: &[BrushPoint],
        settings: &BrushSettings,
        surface: &mut dyn TargetSurface,
    ) -> Option<DirtyRect> {
        let mut session = self.session.take().unwrap_or_default();
        let mut dirty = None;

        for point in points {
            let filled = match session.recent.as_slice() {
                [] => vec![*point],
                recent => {
                    let p1 = recent[recent.len() - 1];
                    let p0 = if recent.len() > 1 { recent[0] } else { p1 };
                    let step = calculate_dynamics(&p1, settings, session.index);
                    segment_points(
                        self.interpolation,
                        &p0,
                        &p1,
                        point,
                        point,
                        step.size * step.spacing,
                    )
                }
            };
            let drawn = self.draw_points(&filled, settings, surface, session.index);
            dirty = DirtyRect::merge(dirty, drawn);
            session.index += filled.len();
            session.push(*point);
        }

        self.session = Some(session);
        if let Some(dirty) = dirty {
            self.notify(TextureChange::Paint { dirty });
        }
        dirty
    }

    pub fn end_stroke(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!("Stroke ended after {} stamps", session.index);
        }
    }

    pub fn stroke_active(&self) -> bool {
        self.session.is_some()
    }

    /// Map screen-space points onto the texture, dropping misses
    pub fn project_stroke(
        &self,
        projector: &dyn ScreenProjector,
        points: &[BrushPoint],
        width: u32,
        height: u32,
    ) -> Vec<BrushPoint> {
        let projected: Vec<BrushPoint> = points
            .iter()
            .filter_map(|point| {
                let hit = projector.screen_to_uv(point.x, point.y)?;
                let pixel = uv_to_pixel(hit.uv, width, height);
                Some(BrushPoint {
                    x: pixel.x,
                    y: pixel.y,
                    uv: Some(hit.uv),
                    world: hit.world,
                    ..*point
                })
            })
            .collect();
        if projected.len() < points.len() {
            tracing::debug!(
                "{} of {} points missed the mesh",
                points.len() - projected.len(),
                points.len()
            );
        }
        projected
    }

    /// Place a single puff on both surfaces
    pub fn place_puff(
        &mut self,
        point: &BrushPoint,
        params: &PuffParameters,
        paint: &mut dyn TargetSurface,
        displacement: &mut dyn TargetSurface,
    ) {
        let changes = self
            .puff
            .place_puff(point, params, &self.images, paint, displacement);
        for change in changes {
            self.notify(change);
        }
    }

    pub fn puff_stroke(
        &mut self,
        points: &[BrushPoint],
        params: &PuffParameters,
        paint: &mut dyn TargetSurface,
        displacement: &mut dyn TargetSurface,
    ) {
        let changes = self
            .puff
            .puff_stroke(points, params, &self.images, paint, displacement);
        for change in changes {
            self.notify(change);
        }
    }

    /// Host-reported frame time in milliseconds
    pub fn report_frame(&mut self, delta_ms: f32) -> GovernorAction {
        let action = self.governor.record_frame(delta_ms);
        self.apply_governor_action(action);
        action
    }

    pub fn report_memory_pressure(&mut self) -> GovernorAction {
        let action = self.governor.report_memory_pressure();
        self.apply_governor_action(action);
        action
    }

    fn apply_governor_action(&mut self, action: GovernorAction) {
        match action {
            GovernorAction::Keep => {}
            GovernorAction::ShrinkCache { retain } => {
                let evicted = self.stamps.cache_mut().retain_most_recent(retain);
                tracing::debug!("Governor evicted {} stamps", evicted);
            }
            GovernorAction::ReleaseMemory { retain } => {
                let evicted = self.stamps.cache_mut().retain_most_recent(retain);
                if let Some(session) = self.session.as_mut() {
                    session.recent.clear();
                }
                tracing::debug!("Governor evicted {} stamps, cleared stroke points", evicted);
            }
        }
    }

    fn draw_points(
        &mut self,
        points: &[BrushPoint],
        settings: &BrushSettings,
        surface: &mut dyn TargetSurface,
        first_index: usize,
    ) -> Option<DirtyRect> {
        if points.is_empty() {
            return None;
        }

        let randomization = settings
            .custom_image()
            .map(|custom| custom.randomization.clamp(0.0, 100.0) / 100.0)
            .unwrap_or(0.0);
        let mut stamp_settings = settings.clone();
        let mut dirty = None;

        for (offset, point) in points.iter().enumerate() {
            let dynamics = calculate_dynamics(point, settings, first_index + offset);
            apply_dynamics(&mut stamp_settings, &dynamics);
            let stamp = self.create_brush_stamp(&stamp_settings);

            // Oversized brushes are synthesized at the cap and scaled up
            let (optimized, _) = self.stamps.stamp_geometry(dynamics.size);
            let mut placement = StampPlacement {
                scale: if optimized > 0.0 {
                    dynamics.size / optimized
                } else {
                    1.0
                },
                alpha: settings.flow,
                mode: settings.blend_mode,
                ..StampPlacement::at(point.x, point.y)
            };
            if randomization > 0.0 {
                placement.rotation += self.jitter.gen_range(-1.0f32..=1.0) * randomization * 360.0;
                placement.scale *= (1.0 + self.jitter.gen_range(-1.0f32..=1.0) * randomization).max(0.01);
            }

            match surface.draw_stamp(&stamp.image, &placement) {
                Ok(drawn) => dirty = DirtyRect::merge(dirty, drawn),
                Err(err) => tracing::warn!("Skipping stamp {}: {}", first_index + offset, err),
            }
        }

        dirty
    }
}

impl Default for BrushEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn apply_dynamics(settings: &mut BrushSettings, dynamics: &StampDynamics) {
    settings.size = dynamics.size;
    settings.opacity = dynamics.opacity;
    settings.angle = dynamics.angle;
}
