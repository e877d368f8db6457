//! Layers - positioned, filterable media items within a scene document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::current_timestamp_ms;
use crate::filters::LayerFilters;

/// Unique identifier for a layer, stable for the layer's lifetime.
///
/// Freshly created layers get a UUID, but the id is carried as an opaque
/// string so documents produced by other writers (short ids, legacy
/// counters) round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Create a fresh unique layer id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of media a layer displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A still image.
    #[default]
    Image,
    /// An animated GIF.
    Gif,
    /// A video.
    Video,
}

/// One positioned, filterable media item within a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique identifier, stable for the layer's lifetime.
    #[serde(default)]
    pub id: LayerId,
    /// Display name.
    #[serde(default = "Layer::default_name")]
    pub name: String,
    /// Media kind.
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    /// Media source URL.
    #[serde(default)]
    pub source: String,
    /// Draw order key; higher paints on top.
    #[serde(default)]
    pub z_index: u32,
    /// Creation timestamp (ms since the Unix epoch).
    #[serde(default = "current_timestamp_ms")]
    pub created_at: u64,
    /// Last update timestamp (ms since the Unix epoch).
    #[serde(default = "current_timestamp_ms")]
    pub updated_at: u64,
    /// The layer's complete filter stack.
    #[serde(default)]
    pub filters: LayerFilters,
    /// Unrecognized fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Layer {
    /// Create a new layer with default filters and fresh timestamps.
    #[must_use]
    pub fn new(name: impl Into<String>, media_type: MediaType, source: impl Into<String>, z_index: u32) -> Self {
        let now = current_timestamp_ms();
        Self {
            id: LayerId::generate(),
            name: name.into(),
            media_type,
            source: source.into(),
            z_index,
            created_at: now,
            updated_at: now,
            filters: LayerFilters::default(),
            extra: serde_json::Map::new(),
        }
    }

    fn default_name() -> String {
        "Layer".to_string()
    }
}

/// A partial layer update, merged field-by-field.
///
/// Filters change through their own operation and are not part of this
/// patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
    /// New display name, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New media kind, if changed.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    /// New media source URL, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// New draw order key, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<u32>,
}

impl LayerPatch {
    /// Merge this patch into a layer. Does not stamp timestamps; the
    /// document operation owns those.
    pub fn apply_to(&self, layer: &mut Layer) {
        if let Some(ref v) = self.name {
            layer.name.clone_from(v);
        }
        if let Some(v) = self.media_type {
            layer.media_type = v;
        }
        if let Some(ref v) = self.source {
            layer.source.clone_from(v);
        }
        if let Some(v) = self.z_index {
            layer.z_index = v;
        }
    }
}
