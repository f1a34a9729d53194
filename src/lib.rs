//! Puffbrush - brush stamping and puff displacement for garment texture painting
//!
//! This is the main library crate. The host owns the layer system and the 3D
//! scene; the engine draws stamps into the surfaces it is handed.

pub mod brush;
pub mod config;
pub mod core;
pub mod perf;
pub mod puff;
pub mod surface;

pub use brush::{BrushEngine, BrushPoint, BrushSettings, PresetLibrary, SharedBrushEngine};
pub use config::EngineConfig;
pub use self::core::{EngineError, EngineResult};
pub use puff::{PuffEngine, PuffParameters};
pub use surface::{LayerSink, RasterSurface, ScreenProjector, TargetSurface, TextureChange};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging; safe to call more than once
pub fn init_logging() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "puffbrush_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Puffbrush {} initialized", env!("CARGO_PKG_VERSION"));
    }
}
