//! Decoded custom-brush images
//!
//! Images arrive from the host asynchronously (data URLs, raw files). Until an
//! image is decoded its id is registered as `Pending`; the stamp builder treats
//! that as "not ready" and falls back to the procedural stamp without caching,
//! so the next stamp request picks the image up once it lands.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, RgbaImage};
use sha2::{Digest, Sha256};

use crate::core::{EngineError, EngineResult};

/// Hex digits of the content hash kept in stamp cache keys
const HASH_LEN: usize = 16;

#[derive(Debug, Clone)]
pub enum ImageEntry {
    Pending,
    Ready { image: Arc<RgbaImage>, hash: String },
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ImageStore {
    entries: HashMap<String, ImageEntry>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an id whose pixels are still being fetched
    pub fn insert_pending(&mut self, id: impl Into<String>) {
        self.entries.insert(id.into(), ImageEntry::Pending);
    }

    /// Store decoded pixels, returning the content hash
    pub fn insert_image(&mut self, id: impl Into<String>, image: RgbaImage) -> String {
        let hash = content_hash(&image);
        self.entries.insert(
            id.into(),
            ImageEntry::Ready {
                image: Arc::new(image),
                hash: hash.clone(),
            },
        );
        hash
    }

    /// Decode encoded image bytes (PNG, JPEG, WebP, ...)
    pub fn load_bytes(&mut self, id: impl Into<String>, bytes: &[u8]) -> EngineResult<String> {
        let id = id.into();
        match image::load_from_memory(bytes) {
            Ok(decoded) => Ok(self.insert_image(id, decoded.to_rgba8())),
            Err(err) => {
                tracing::warn!("Failed to decode brush image {}: {}", id, err);
                self.entries.insert(id, ImageEntry::Failed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Decode a `data:image/...;base64,` URL or a bare base64 payload
    pub fn load_data_url(&mut self, id: impl Into<String>, data: &str) -> EngineResult<String> {
        let id = id.into();
        let payload = if data.starts_with("data:") {
            data.split_once(',').map(|(_, rest)| rest).unwrap_or(data)
        } else {
            data
        };

        match BASE64.decode(payload.trim()) {
            Ok(bytes) => self.load_bytes(id, &bytes),
            Err(err) => {
                tracing::warn!("Invalid base64 payload for brush image {}: {}", id, err);
                self.entries.insert(id, ImageEntry::Failed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Pixels for `id`, or why they are unavailable
    pub fn resolve(&self, id: &str) -> EngineResult<Arc<RgbaImage>> {
        match self.entries.get(id) {
            Some(ImageEntry::Ready { image, .. }) => Ok(Arc::clone(image)),
            Some(ImageEntry::Failed(reason)) => {
                Err(EngineError::ImageDecode(format!("{}: {}", id, reason)))
            }
            Some(ImageEntry::Pending) | None => Err(EngineError::ImageNotReady(id.to_string())),
        }
    }

    pub fn is_ready(&self, id: &str) -> bool {
        matches!(self.entries.get(id), Some(ImageEntry::Ready { .. }))
    }

    pub fn content_hash(&self, id: &str) -> Option<&str> {
        match self.entries.get(id) {
            Some(ImageEntry::Ready { hash, .. }) => Some(hash.as_str()),
            _ => None,
        }
    }

    /// Re-encode a loaded image as a PNG data URL
    pub fn export_data_url(&self, id: &str) -> EngineResult<String> {
        let image = self.resolve(id)?;
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(format!(
            "data:image/png;base64,{}",
            BASE64.encode(buf.into_inner())
        ))
    }

    pub fn remove(&mut self, id: &str) -> Option<ImageEntry> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Truncated SHA-256 of the image dimensions and pixels
pub fn content_hash(image: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(HASH_LEN);
    hash
}
