//! Brush preset library
//!
//! Presets are plain data (settings plus metadata) so the host can persist
//! the JSON produced by [`PresetLibrary::to_json`] wherever it likes. Saved
//! custom brushes carry their images inline as PNG data URLs.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::images::ImageStore;
use super::settings::{BrushSettings, BrushShape, DynamicsSettings};
use super::BlendMode;
use crate::core::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PresetCategory {
    #[default]
    Basic,
    Artistic,
    Textured,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushPreset {
    pub id: String,
    pub name: String,
    pub category: PresetCategory,
    pub description: String,
    pub settings: BrushSettings,
    pub tags: Vec<String>,
    pub built_in: bool,
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
    pub modified_at: u64,
}

impl Default for BrushPreset {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            category: PresetCategory::Custom,
            description: String::new(),
            settings: BrushSettings::default(),
            tags: Vec::new(),
            built_in: false,
            created_at: 0,
            modified_at: 0,
        }
    }
}

/// A custom brush with its images embedded as data URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedCustomBrush {
    pub id: String,
    pub name: String,
    pub settings: BrushSettings,
    /// Image id -> PNG data URL
    pub images: BTreeMap<String, String>,
    pub created_at: u64,
}

impl SavedCustomBrush {
    /// Capture `settings` and every image it references from `store`
    pub fn capture(
        name: impl Into<String>,
        settings: BrushSettings,
        store: &ImageStore,
    ) -> EngineResult<Self> {
        let mut ids: Vec<String> = settings
            .custom
            .as_ref()
            .map(|custom| custom.image_ids().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        if settings.texture.enabled {
            ids.extend(settings.texture.pattern_id.clone());
        }

        let mut images = BTreeMap::new();
        for id in ids {
            if !images.contains_key(&id) {
                let data_url = store.export_data_url(&id)?;
                images.insert(id, data_url);
            }
        }

        Ok(Self {
            id: unique_id_token(),
            name: name.into(),
            settings,
            images,
            created_at: now_millis(),
        })
    }

    /// Decode the embedded images into `store` under their original ids
    pub fn register_images(&self, store: &mut ImageStore) -> EngineResult<()> {
        for (id, data_url) in &self.images {
            store.load_data_url(id.as_str(), data_url)?;
        }
        tracing::debug!(
            "Registered {} images for custom brush {}",
            self.images.len(),
            self.id
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetImportResult {
    pub imported: usize,
    pub skipped: usize,
}

/// Persisted shape of a library; built-ins are not stored
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LibrarySnapshot {
    presets: Vec<BrushPreset>,
    custom_brushes: Vec<SavedCustomBrush>,
}

#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: IndexMap<String, BrushPreset>,
    custom_brushes: IndexMap<String, SavedCustomBrush>,
}

impl PresetLibrary {
    /// Library holding only the built-in presets
    pub fn new() -> Self {
        let presets = built_in_presets()
            .into_iter()
            .map(|preset| (preset.id.clone(), preset))
            .collect();
        Self {
            presets,
            custom_brushes: IndexMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&BrushPreset> {
        self.presets.get(id)
    }

    /// Presets in insertion order, optionally filtered by category
    pub fn list(&self, category: Option<PresetCategory>) -> Vec<&BrushPreset> {
        self.presets
            .values()
            .filter(|preset| category.map_or(true, |c| preset.category == c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Overwrite an existing user preset
    pub fn save_preset(&mut self, preset: BrushPreset) -> EngineResult<BrushPreset> {
        let existing = self
            .presets
            .get(&preset.id)
            .ok_or_else(|| EngineError::PresetNotFound(preset.id.clone()))?;
        if existing.built_in {
            return Err(EngineError::InvalidInput(format!(
                "Built-in preset {} is read-only",
                preset.id
            )));
        }

        let name = validate_name(&preset.name)?;
        let updated = BrushPreset {
            name,
            built_in: false,
            created_at: existing.created_at,
            modified_at: now_millis(),
            ..preset
        };
        self.presets.insert(updated.id.clone(), updated.clone());
        tracing::debug!("Saved preset {}", updated.id);
        Ok(updated)
    }

    /// Store a copy of `preset` under a fresh id
    pub fn save_preset_as(
        &mut self,
        preset: BrushPreset,
        new_name: &str,
        category: Option<PresetCategory>,
    ) -> EngineResult<BrushPreset> {
        let name = validate_name(new_name)?;
        let base_id = if preset.id.trim().is_empty() {
            unique_id_token()
        } else {
            format!("{}-copy", preset.id.trim())
        };
        let id = ensure_unique_id(&base_id, |candidate| self.presets.contains_key(candidate));

        let now = now_millis();
        let created = BrushPreset {
            id: id.clone(),
            name,
            category: category.unwrap_or(PresetCategory::Custom),
            built_in: false,
            created_at: now,
            modified_at: now,
            ..preset
        };
        self.presets.insert(id, created.clone());
        tracing::debug!("Created preset {}", created.id);
        Ok(created)
    }

    pub fn rename_preset(&mut self, id: &str, new_name: &str) -> EngineResult<()> {
        let name = validate_name(new_name)?;
        let preset = self
            .presets
            .get_mut(id)
            .ok_or_else(|| EngineError::PresetNotFound(id.to_string()))?;
        if preset.built_in {
            return Err(EngineError::InvalidInput(format!(
                "Built-in preset {} cannot be renamed",
                id
            )));
        }
        preset.name = name;
        preset.modified_at = now_millis();
        Ok(())
    }

    pub fn delete_preset(&mut self, id: &str) -> EngineResult<BrushPreset> {
        match self.presets.get(id) {
            None => return Err(EngineError::PresetNotFound(id.to_string())),
            Some(preset) if preset.built_in => {
                return Err(EngineError::InvalidInput(format!(
                    "Built-in preset {} cannot be deleted",
                    id
                )))
            }
            Some(_) => {}
        }
        self.presets
            .shift_remove(id)
            .ok_or_else(|| EngineError::PresetNotFound(id.to_string()))
    }

    /// Add presets, skipping any whose content already exists in the library
    pub fn import_presets(&mut self, presets: Vec<BrushPreset>) -> PresetImportResult {
        let mut result = PresetImportResult::default();
        let mut known: Vec<String> = self.presets.values().map(hash_preset).collect();

        for preset in presets {
            let hash = hash_preset(&preset);
            if known.contains(&hash) {
                result.skipped += 1;
                continue;
            }
            let id = ensure_unique_id(&preset.id, |candidate| self.presets.contains_key(candidate));
            let now = now_millis();
            let imported = BrushPreset {
                id: id.clone(),
                name: if preset.name.trim().is_empty() {
                    id.clone()
                } else {
                    preset.name.trim().to_string()
                },
                built_in: false,
                created_at: if preset.created_at == 0 {
                    now
                } else {
                    preset.created_at
                },
                modified_at: now,
                ..preset
            };
            self.presets.insert(id, imported);
            known.push(hash);
            result.imported += 1;
        }

        tracing::info!(
            "Imported {} presets, skipped {} duplicates",
            result.imported,
            result.skipped
        );
        result
    }

    pub fn save_custom_brush(&mut self, brush: SavedCustomBrush) -> String {
        let id = if self.custom_brushes.contains_key(&brush.id) {
            brush.id.clone()
        } else {
            ensure_unique_id(&brush.id, |candidate| self.custom_brushes.contains_key(candidate))
        };
        self.custom_brushes
            .insert(id.clone(), SavedCustomBrush { id: id.clone(), ..brush });
        id
    }

    pub fn custom_brush(&self, id: &str) -> Option<&SavedCustomBrush> {
        self.custom_brushes.get(id)
    }

    pub fn custom_brushes(&self) -> impl Iterator<Item = &SavedCustomBrush> {
        self.custom_brushes.values()
    }

    pub fn delete_custom_brush(&mut self, id: &str) -> EngineResult<SavedCustomBrush> {
        self.custom_brushes
            .shift_remove(id)
            .ok_or_else(|| EngineError::PresetNotFound(id.to_string()))
    }

    /// Serialize user presets and saved custom brushes
    pub fn to_json(&self) -> EngineResult<String> {
        let snapshot = LibrarySnapshot {
            presets: self
                .presets
                .values()
                .filter(|preset| !preset.built_in)
                .cloned()
                .collect(),
            custom_brushes: self.custom_brushes.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Built-ins plus everything stored in `json`
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let snapshot: LibrarySnapshot = serde_json::from_str(json)?;
        let mut library = Self::new();

        for preset in snapshot.presets {
            if library.presets.get(&preset.id).is_some_and(|p| p.built_in) {
                tracing::warn!("Ignoring stored preset shadowing built-in {}", preset.id);
                continue;
            }
            let id = ensure_unique_id(&preset.id, |candidate| library.presets.contains_key(candidate));
            library.presets.insert(
                id.clone(),
                BrushPreset {
                    id,
                    built_in: false,
                    ..preset
                },
            );
        }
        for brush in snapshot.custom_brushes {
            library.save_custom_brush(brush);
        }

        tracing::debug!(
            "Loaded preset library: {} presets, {} custom brushes",
            library.presets.len(),
            library.custom_brushes.len()
        );
        Ok(library)
    }
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn built_in_presets() -> Vec<BrushPreset> {
    let preset = |id: &str, name: &str, category, description: &str, settings, tags: &[&str]| {
        BrushPreset {
            id: id.to_string(),
            name: name.to_string(),
            category,
            description: description.to_string(),
            settings,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            built_in: true,
            created_at: 0,
            modified_at: 0,
        }
    };

    vec![
        preset(
            "hard-round",
            "Hard Round",
            PresetCategory::Basic,
            "Solid round brush with pressure-controlled size",
            BrushSettings {
                size: 12.0,
                hardness: 1.0,
                dynamics: DynamicsSettings {
                    size_pressure: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            &["basic", "round"],
        ),
        preset(
            "watercolor-flat",
            "Watercolor Flat",
            PresetCategory::Artistic,
            "Translucent wash with soft blooming edges",
            BrushSettings {
                size: 40.0,
                opacity: 0.6,
                hardness: 0.3,
                flow: 0.5,
                spacing: 0.15,
                shape: BrushShape::Watercolor,
                blend_mode: BlendMode::Multiply,
                color: "#2a6fdb".to_string(),
                dynamics: DynamicsSettings {
                    opacity_pressure: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            &["paint", "wet"],
        ),
        preset(
            "soft-charcoal",
            "Soft Charcoal",
            PresetCategory::Textured,
            "Grainy dry media that follows pen speed",
            BrushSettings {
                size: 24.0,
                opacity: 0.85,
                hardness: 0.5,
                spacing: 0.1,
                shape: BrushShape::Charcoal,
                color: "#333333".to_string(),
                dynamics: DynamicsSettings {
                    size_pressure: true,
                    opacity_pressure: true,
                    velocity_opacity: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            &["dry", "sketch"],
        ),
    ]
}

fn validate_name(name: &str) -> EngineResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(
            "Preset name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn ensure_unique_id<F>(preferred: &str, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let trimmed = preferred.trim();
    let base = if trimmed.is_empty() {
        unique_id_token()
    } else {
        trimmed.to_string()
    };

    if !exists(&base) {
        return base;
    }

    let mut suffix: usize = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !exists(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Content hash ignoring identity and bookkeeping fields
fn hash_preset(preset: &BrushPreset) -> String {
    hash_serde(&("preset", preset.category, &preset.settings, &preset.tags))
}

fn hash_serde<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn unique_id_token() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:x}{:x}", now.as_secs(), now.subsec_nanos())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::CustomBrushSettings;
    use image::{Rgba, RgbaImage};

    fn user_preset(library: &mut PresetLibrary) -> BrushPreset {
        let base = library.get("hard-round").cloned().unwrap();
        library
            .save_preset_as(base, "My Round", None)
            .unwrap()
    }

    #[test]
    fn ships_built_ins() {
        let library = PresetLibrary::new();
        assert_eq!(library.len(), 3);
        assert_eq!(library.get("watercolor-flat").unwrap().settings.shape, BrushShape::Watercolor);
        let textured = library.list(Some(PresetCategory::Textured));
        assert_eq!(textured.len(), 1);
        assert_eq!(textured[0].id, "soft-charcoal");
        assert_eq!(library.list(None).len(), 3);
    }

    #[test]
    fn save_as_creates_unique_copies() {
        let mut library = PresetLibrary::new();
        let first = user_preset(&mut library);
        let second = user_preset(&mut library);
        assert_eq!(first.id, "hard-round-copy");
        assert_eq!(second.id, "hard-round-copy-1");
        assert_eq!(first.category, PresetCategory::Custom);
        assert!(!first.built_in);
        assert!(first.created_at > 0);
    }

    #[test]
    fn save_updates_user_presets_only() {
        let mut library = PresetLibrary::new();
        let mut preset = user_preset(&mut library);
        preset.settings.size = 64.0;
        preset.name = "  Big Round ".to_string();
        let saved = library.save_preset(preset.clone()).unwrap();
        assert_eq!(saved.name, "Big Round");
        assert_eq!(library.get(&saved.id).unwrap().settings.size, 64.0);
        assert!(saved.modified_at >= saved.created_at);

        let built_in = library.get("hard-round").cloned().unwrap();
        assert!(matches!(
            library.save_preset(built_in),
            Err(EngineError::InvalidInput(_))
        ));

        preset.id = "missing".to_string();
        assert!(matches!(
            library.save_preset(preset),
            Err(EngineError::PresetNotFound(_))
        ));
    }

    #[test]
    fn rename_and_delete() {
        let mut library = PresetLibrary::new();
        let preset = user_preset(&mut library);
        library.rename_preset(&preset.id, "Renamed").unwrap();
        assert_eq!(library.get(&preset.id).unwrap().name, "Renamed");
        assert!(library.rename_preset(&preset.id, "   ").is_err());

        assert!(library.delete_preset("soft-charcoal").is_err());
        assert!(library.get("soft-charcoal").is_some());

        library.delete_preset(&preset.id).unwrap();
        assert!(matches!(
            library.delete_preset(&preset.id),
            Err(EngineError::PresetNotFound(_))
        ));
    }

    #[test]
    fn import_skips_duplicate_content() {
        let mut library = PresetLibrary::new();
        let mut same_as_built_in = library.get("hard-round").cloned().unwrap();
        same_as_built_in.id = "other-id".to_string();
        same_as_built_in.name = "Different name".to_string();

        let fresh = BrushPreset {
            id: "hard-round".to_string(),
            name: "Pencil".to_string(),
            settings: BrushSettings {
                shape: BrushShape::Pencil,
                ..Default::default()
            },
            ..Default::default()
        };

        let result = library.import_presets(vec![same_as_built_in, fresh.clone(), fresh]);
        assert_eq!(result, PresetImportResult { imported: 1, skipped: 2 });
        let imported = library.get("hard-round-1").unwrap();
        assert_eq!(imported.settings.shape, BrushShape::Pencil);
        assert!(library.get("hard-round").unwrap().built_in);
    }

    #[test]
    fn json_round_trip_keeps_user_data() {
        let mut library = PresetLibrary::new();
        let preset = user_preset(&mut library);
        library.save_custom_brush(SavedCustomBrush {
            id: "stamp-1".to_string(),
            name: "Leaf".to_string(),
            ..Default::default()
        });

        let json = library.to_json().unwrap();
        assert!(!json.contains("\"watercolor-flat\""));

        let restored = PresetLibrary::from_json(&json).unwrap();
        assert_eq!(restored.len(), 4);
        assert_eq!(restored.get(&preset.id), Some(&preset));
        assert_eq!(restored.custom_brush("stamp-1").unwrap().name, "Leaf");
    }

    #[test]
    fn stored_presets_cannot_shadow_built_ins() {
        let json = r#"{"presets": [{"id": "hard-round", "name": "Hijack", "builtIn": true}]}"#;
        let library = PresetLibrary::from_json(json).unwrap();
        assert_eq!(library.get("hard-round").unwrap().name, "Hard Round");
        assert_eq!(library.len(), 3);
    }

    #[test]
    fn custom_brush_images_travel_with_the_brush() {
        let mut store = ImageStore::new();
        let tip = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 200]));
        let hash = store.insert_image("tip", tip);

        let settings = BrushSettings {
            custom: Some(CustomBrushSettings {
                image: Some("tip".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let saved = SavedCustomBrush::capture("Tip", settings, &store).unwrap();
        assert!(saved.images["tip"].starts_with("data:image/png;base64,"));

        let mut other = ImageStore::new();
        saved.register_images(&mut other).unwrap();
        assert_eq!(other.content_hash("tip"), Some(hash.as_str()));
    }

    #[test]
    fn capture_requires_loaded_images() {
        let mut store = ImageStore::new();
        store.insert_pending("tip");
        let settings = BrushSettings {
            custom: Some(CustomBrushSettings {
                image: Some("tip".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            SavedCustomBrush::capture("Tip", settings, &store),
            Err(EngineError::ImageNotReady(_))
        ));
    }
}
