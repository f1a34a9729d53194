use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid brush settings: {0}")]
    InvalidSettings(String),

    #[error("Image not ready: {0}")]
    ImageNotReady(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<image::ImageError> for EngineError {
    fn from(value: image::ImageError) -> Self {
        Self::ImageDecode(value.to_string())
    }
}

impl From<base64::DecodeError> for EngineError {
    fn from(value: base64::DecodeError) -> Self {
        Self::ImageDecode(value.to_string())
    }
}

impl From<EngineError> for String {
    fn from(err: EngineError) -> Self {
        err.to_string()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
