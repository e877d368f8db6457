//! The canonical scene document: canvas settings plus an ordered,
//! filterable layer list.
//!
//! Mutation operations are pure: each takes `&self` and returns a new
//! snapshot, so external observers always see either the old or the
//! fully-updated document, never a partial one. [`crate::DocumentStore`]
//! wraps these operations with shared state and change notification.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};
use crate::filters::{FilterGroup, FilterPatch};
use crate::layer::{Layer, LayerId, LayerPatch, MediaType};

/// Current document schema version string.
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// Default document name.
pub const DEFAULT_DOCUMENT_NAME: &str = "Untitled Scene";

/// Default canvas background color.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#000000";

/// Get the current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}

/// Canvas dimensions in canvas-space pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
}

impl CanvasSize {
    /// Create a canvas size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// The complete editable scene.
///
/// Layers are kept in insertion order; the *displayed* order is derived
/// from [`Layer::z_index`] via [`SceneDocument::layers_by_z`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    /// Project name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Canvas dimensions.
    #[serde(default)]
    pub canvas_size: CanvasSize,
    /// Canvas background color string.
    #[serde(default = "default_background")]
    pub background_color: String,
    /// Whether the scene is publicly viewable through its share link.
    #[serde(default)]
    pub is_public: bool,
    /// Document schema version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Last modification timestamp (ms since the Unix epoch).
    #[serde(default = "current_timestamp_ms")]
    pub last_modified: u64,
    /// Layers in insertion order.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Unrecognized fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_name() -> String {
    DEFAULT_DOCUMENT_NAME.to_string()
}

fn default_background() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            name: default_name(),
            canvas_size: CanvasSize::default(),
            background_color: default_background(),
            is_public: false,
            version: default_version(),
            last_modified: current_timestamp_ms(),
            layers: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl SceneDocument {
    /// Get a layer by id.
    #[must_use]
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == *id)
    }

    /// The highest `z_index` in the document, or 0 when empty.
    #[must_use]
    pub fn max_z_index(&self) -> u32 {
        self.layers.iter().map(|l| l.z_index).max().unwrap_or(0)
    }

    /// Layers in draw order (ascending `z_index`; higher paints on top).
    #[must_use]
    pub fn layers_by_z(&self) -> Vec<&Layer> {
        let mut sorted: Vec<&Layer> = self.layers.iter().collect();
        sorted.sort_by_key(|l| l.z_index);
        sorted
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Check whether the document has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn touched(mut self) -> Self {
        self.last_modified = current_timestamp_ms();
        self
    }

    /// Append a new layer with default filters and `z_index = max + 1`
    /// (1 on an empty document). Returns the new snapshot and the layer.
    #[must_use]
    pub fn add_layer(
        &self,
        name: impl Into<String>,
        media_type: MediaType,
        source: impl Into<String>,
    ) -> (Self, Layer) {
        let layer = Layer::new(name, media_type, source, self.max_z_index() + 1);
        let mut next = self.clone();
        next.layers.push(layer.clone());
        (next.touched(), layer)
    }

    /// Remove a layer by id. No-op when the id is absent.
    #[must_use]
    pub fn remove_layer(&self, id: &LayerId) -> Self {
        let mut next = self.clone();
        next.layers.retain(|l| l.id != *id);
        next.touched()
    }

    /// Merge a partial field update into the matching layer, stamping its
    /// `updated_at`. No-op when the id is absent.
    #[must_use]
    pub fn update_layer(&self, id: &LayerId, patch: &LayerPatch) -> Self {
        self.map_layer(id, |layer| patch.apply_to(layer))
    }

    /// Merge a partial filter update into the matching layer, stamping
    /// its `updated_at`. No-op when the id is absent.
    #[must_use]
    pub fn update_layer_filters(&self, id: &LayerId, patch: &FilterPatch) -> Self {
        self.map_layer(id, |layer| patch.apply_to(&mut layer.filters))
    }

    /// Move the layer at `from` (insertion-order position) to `to`, then
    /// reassign `z_index = position + 1` across the whole list so the
    /// sequence is dense 1..N in the new order.
    ///
    /// Indices are positions in the insertion-order list; callers working
    /// from a z-sorted projection must translate back. Out-of-range
    /// indices are a no-op.
    #[must_use]
    pub fn reorder_layers(&self, from: usize, to: usize) -> Self {
        if from >= self.layers.len() || to >= self.layers.len() {
            return self.clone();
        }
        let mut next = self.clone();
        let moved = next.layers.remove(from);
        next.layers.insert(to, moved);
        for (position, layer) in next.layers.iter_mut().enumerate() {
            // Layer counts stay far below u32::MAX
            #[allow(clippy::cast_possible_truncation)]
            {
                layer.z_index = position as u32 + 1;
            }
        }
        next.touched()
    }

    /// Clone the matching layer with a fresh id, a `" (copy)"` name
    /// suffix, deep-copied filters and `z_index = max + 1`. Returns the
    /// new snapshot and the clone; no-op (and `None`) when the id is
    /// absent.
    #[must_use]
    pub fn duplicate_layer(&self, id: &LayerId) -> (Self, Option<Layer>) {
        let Some(original) = self.layer(id) else {
            return (self.clone(), None);
        };
        let now = current_timestamp_ms();
        let mut copy = original.clone();
        copy.id = LayerId::generate();
        copy.name = format!("{} (copy)", original.name);
        copy.z_index = self.max_z_index() + 1;
        copy.created_at = now;
        copy.updated_at = now;

        let mut next = self.clone();
        next.layers.push(copy.clone());
        (next.touched(), Some(copy))
    }

    /// Replace the canvas size.
    #[must_use]
    pub fn with_canvas_size(&self, size: CanvasSize) -> Self {
        let mut next = self.clone();
        next.canvas_size = size;
        next.touched()
    }

    /// Replace the background color.
    #[must_use]
    pub fn with_background_color(&self, color: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.background_color = color.into();
        next.touched()
    }

    /// Replace the project name.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.name = name.into();
        next.touched()
    }

    /// Replace the visibility flag.
    #[must_use]
    pub fn with_visibility(&self, is_public: bool) -> Self {
        let mut next = self.clone();
        next.is_public = is_public;
        next.touched()
    }

    /// Attach a filter group to the matching layer.
    #[must_use]
    pub fn attach_filter_group(&self, id: &LayerId, group: FilterGroup) -> Self {
        self.map_layer(id, |layer| layer.filters.attach_group(group.clone()))
    }

    /// Detach a filter group from the matching layer, removing it from
    /// both the active and the disabled lists.
    #[must_use]
    pub fn detach_filter_group(&self, id: &LayerId, group: &FilterGroup) -> Self {
        self.map_layer(id, |layer| layer.filters.detach_group(group))
    }

    /// Suppress or re-enable an attached filter group without detaching.
    #[must_use]
    pub fn set_filter_group_enabled(&self, id: &LayerId, group: FilterGroup, enabled: bool) -> Self {
        self.map_layer(id, |layer| layer.filters.set_group_enabled(group.clone(), enabled))
    }

    fn map_layer(&self, id: &LayerId, f: impl Fn(&mut Layer)) -> Self {
        let mut next = self.clone();
        let now = current_timestamp_ms();
        for layer in &mut next.layers {
            if layer.id == *id {
                f(layer);
                layer.updated_at = now;
            }
        }
        next.touched()
    }

    /// Drop filter-group ids this build does not recognize from every
    /// layer. Part of load normalization.
    pub fn strip_unknown_filter_groups(&mut self) {
        for layer in &mut self.layers {
            layer.filters.strip_unknown_groups();
        }
    }

    /// Validate the top-level shape of an imported document.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Validation`] when `canvasSize` is missing or
    /// `layers` is missing or not an array. Callers must reject the
    /// import before replacing the live document.
    pub fn validate_import(value: &serde_json::Value) -> SceneResult<()> {
        let Some(object) = value.as_object() else {
            return Err(SceneError::Validation("document must be a JSON object".into()));
        };
        if !object.contains_key("canvasSize") {
            return Err(SceneError::Validation("missing required field: canvasSize".into()));
        }
        match object.get("layers") {
            Some(layers) if layers.is_array() => Ok(()),
            Some(_) => Err(SceneError::Validation("layers must be an array".into())),
            None => Err(SceneError::Validation("missing required field: layers".into())),
        }
    }

    /// Serialize the document to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string_pretty(self).map_err(SceneError::Serialization)
    }
}
