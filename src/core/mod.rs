//! Shared error taxonomy for the brush engine.
//!
//! Every stage below the stamp builder and stroke renderer boundaries reports
//! failures through [`EngineError`]; the boundaries turn them into fallbacks.

pub mod errors;

pub use errors::{EngineError, EngineResult};
