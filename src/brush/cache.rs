//! Stamp cache
//!
//! Stamps are memoized by a canonical key built from every setting that
//! changes stamp pixels. Spacing and flow only affect how stamps are laid down
//! along a stroke, so they are left out of the key. Custom images contribute
//! their content hash, so replacing an image's pixels under the same id
//! invalidates the stamp.
//!
//! Eviction is by insertion order, not recency: once the cache is full the
//! oldest batch is dropped before the new stamp goes in.

use std::sync::Arc;

use image::RgbaImage;
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::images::ImageStore;
use super::settings::{BrushSettings, BrushShape, CustomBrushSettings, GradientSettings, TextureSettings};
use super::BlendMode;
use crate::config::CacheConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StampKey<'a> {
    size: f32,
    opacity: f32,
    hardness: f32,
    color: &'a str,
    blend_mode: BlendMode,
    shape: BrushShape,
    angle: f32,
    roundness: f32,
    gradient: Option<&'a GradientSettings>,
    texture: Option<TextureKey<'a>>,
    custom: Option<&'a CustomBrushSettings>,
    /// (image id, content hash) for every image the stamp reads
    images: Vec<(&'a str, Option<&'a str>)>,
}

#[derive(Serialize)]
struct TextureKey<'a> {
    settings: &'a TextureSettings,
    hash: Option<&'a str>,
}

/// Canonical cache key for the stamp `settings` produces
pub fn stamp_cache_key(settings: &BrushSettings, images: &ImageStore) -> String {
    let custom = settings.custom_image();
    let image_ids = custom.map(CustomBrushSettings::image_ids).unwrap_or_default();
    let texture = settings.texture.enabled.then(|| TextureKey {
        settings: &settings.texture,
        hash: settings
            .texture
            .pattern_id
            .as_deref()
            .and_then(|id| images.content_hash(id)),
    });

    let key = StampKey {
        size: settings.size,
        opacity: settings.opacity,
        hardness: settings.hardness,
        color: &settings.color,
        blend_mode: settings.blend_mode,
        shape: settings.shape,
        angle: settings.normalized_angle(),
        roundness: settings.roundness,
        gradient: settings.gradient.as_ref(),
        texture,
        custom,
        images: image_ids
            .into_iter()
            .map(|id| (id, images.content_hash(id)))
            .collect(),
    };

    // Plain data with string keys; serialization cannot fail
    serde_json::to_string(&key).unwrap_or_default()
}

/// Deterministic seed for stochastic shapes, derived from the cache key
pub fn stamp_seed(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[derive(Debug)]
pub struct StampCache {
    config: CacheConfig,
    stamps: IndexMap<String, Arc<RgbaImage>>,
}

impl StampCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            stamps: IndexMap::with_capacity(config.max_entries),
            config,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<RgbaImage>> {
        self.stamps.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }

    /// Insert a stamp, evicting the oldest batch first when full
    pub fn insert(&mut self, key: String, stamp: Arc<RgbaImage>) {
        if self.stamps.contains_key(&key) {
            self.stamps.insert(key, stamp);
            return;
        }
        if self.stamps.len() >= self.config.max_entries.max(1) {
            let batch = self.config.evict_batch.clamp(1, self.stamps.len());
            self.stamps.drain(..batch);
            tracing::debug!("Stamp cache full, evicted {} oldest stamps", batch);
        }
        self.stamps.insert(key, stamp);
    }

    /// Keep only the `keep` most recently inserted stamps
    pub fn retain_most_recent(&mut self, keep: usize) -> usize {
        let excess = self.stamps.len().saturating_sub(keep);
        if excess > 0 {
            self.stamps.drain(..excess);
        }
        excess
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Keys from oldest to newest
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.stamps.keys().map(String::as_str)
    }

    /// Total pixel bytes held
    pub fn total_bytes(&self) -> usize {
        self.stamps.values().map(|s| s.as_raw().len()).sum()
    }
}

impl Default for StampCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::settings::CustomBrushLayer;
    use image::Rgba;

    fn stamp() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(1, 1))
    }

    #[test]
    fn eviction_never_exceeds_capacity() {
        let mut cache = StampCache::default();
        for i in 0..150 {
            cache.insert(format!("k{}", i), stamp());
            assert!(cache.len() <= 100);
        }
        // 100 inserts fill it, the 101st evicts k0..k19, the 121st k20..k39,
        // the 141st k40..k59
        assert_eq!(cache.len(), 90);
        assert!(!cache.contains("k59"));
        assert!(cache.contains("k60"));
        assert!(cache.contains("k149"));
        assert_eq!(cache.keys().next(), Some("k60"));
    }

    #[test]
    fn reinserting_an_existing_key_does_not_evict() {
        let mut cache = StampCache::new(CacheConfig {
            max_entries: 2,
            evict_batch: 1,
        });
        cache.insert("a".into(), stamp());
        cache.insert("b".into(), stamp());
        cache.insert("a".into(), stamp());
        assert_eq!(cache.len(), 2);
        cache.insert("c".into(), stamp());
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn retain_most_recent_drops_oldest() {
        let mut cache = StampCache::default();
        for i in 0..10 {
            cache.insert(format!("k{}", i), stamp());
        }
        assert_eq!(cache.retain_most_recent(4), 6);
        assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["k6", "k7", "k8", "k9"]);
        assert_eq!(cache.retain_most_recent(10), 0);
    }

    #[test]
    fn key_ignores_spacing_and_flow() {
        let images = ImageStore::new();
        let a = BrushSettings::default();
        let b = BrushSettings {
            spacing: 0.9,
            flow: 0.1,
            ..Default::default()
        };
        let c = BrushSettings {
            hardness: 0.5,
            ..Default::default()
        };
        assert_eq!(stamp_cache_key(&a, &images), stamp_cache_key(&b, &images));
        assert_ne!(stamp_cache_key(&a, &images), stamp_cache_key(&c, &images));
    }

    #[test]
    fn key_normalizes_angle() {
        let images = ImageStore::new();
        let a = BrushSettings {
            angle: 30.0,
            ..Default::default()
        };
        let b = BrushSettings {
            angle: 390.0,
            ..Default::default()
        };
        assert_eq!(stamp_cache_key(&a, &images), stamp_cache_key(&b, &images));
    }

    #[test]
    fn key_tracks_image_content() {
        let mut images = ImageStore::new();
        let settings = BrushSettings {
            custom: Some(CustomBrushSettings {
                layers: vec![CustomBrushLayer::new("tip")],
                ..Default::default()
            }),
            ..Default::default()
        };
        images.insert_pending("tip");
        let pending = stamp_cache_key(&settings, &images);

        images.insert_image("tip", RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let first = stamp_cache_key(&settings, &images);
        images.insert_image("tip", RgbaImage::from_pixel(2, 2, Rgba([9, 0, 0, 255])));
        let second = stamp_cache_key(&settings, &images);

        assert_ne!(pending, first);
        assert_ne!(first, second);
    }

    #[test]
    fn seed_is_stable_per_key() {
        assert_eq!(stamp_seed("abc"), stamp_seed("abc"));
        assert_ne!(stamp_seed("abc"), stamp_seed("abd"));
    }
}
