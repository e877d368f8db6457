//! Shared document storage for multi-component access.
//!
//! [`DocumentStore`] owns the live [`SceneDocument`] behind a lock,
//! applies the pure snapshot-to-snapshot operations from
//! [`crate::document`], and fires a registered change listener after
//! every mutation. Snapshots are swapped wholesale, so observers always
//! see either the old or the fully-updated document.
//!
//! The store performs no persistence itself; callers subscribe via
//! [`DocumentStore::set_on_change`] and trigger saves from there.

use std::sync::{Arc, RwLock};

use crate::codec;
use crate::document::{current_timestamp_ms, CanvasSize, SceneDocument};
use crate::error::SceneResult;
use crate::filters::{FilterGroup, FilterPatch};
use crate::layer::{Layer, LayerId, LayerPatch, MediaType};

type ChangeListener = Box<dyn Fn(&SceneDocument) + Send + Sync>;

#[derive(Debug, Default)]
struct StoreState {
    document: SceneDocument,
    selected: Option<LayerId>,
}

/// Thread-safe holder of the live scene document plus the current layer
/// selection.
#[derive(Clone, Default)]
pub struct DocumentStore {
    state: Arc<RwLock<StoreState>>,
    listener: Arc<RwLock<Option<ChangeListener>>>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("document", &self.snapshot().name)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Create a store holding the default document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing document.
    #[must_use]
    pub fn with_document(document: SceneDocument) -> Self {
        let store = Self::default();
        {
            let mut state = store.write();
            state.document = document;
        }
        store
    }

    /// Register the listener invoked with the new snapshot after every
    /// mutation. Replaces any previous listener.
    pub fn set_on_change(&self, listener: impl Fn(&SceneDocument) + Send + Sync + 'static) {
        let mut slot = self
            .listener
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(Box::new(listener));
    }

    /// Clone of the current document snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SceneDocument {
        self.read().document.clone()
    }

    /// Id of the currently selected layer, if any.
    #[must_use]
    pub fn selected_layer_id(&self) -> Option<LayerId> {
        self.read().selected.clone()
    }

    /// Clone of the currently selected layer, if any.
    #[must_use]
    pub fn selected_layer(&self) -> Option<Layer> {
        let state = self.read();
        state
            .selected
            .as_ref()
            .and_then(|id| state.document.layer(id).cloned())
    }

    /// Change the selection. `None` clears it. Selection changes do not
    /// touch the document and fire no change notification.
    pub fn select_layer(&self, id: Option<LayerId>) {
        self.write().selected = id;
    }

    /// Append a new layer (default filters, `z_index = max + 1`) and
    /// select it. Returns the created layer.
    pub fn add_layer(
        &self,
        name: impl Into<String>,
        media_type: MediaType,
        source: impl Into<String>,
    ) -> Layer {
        self.mutate(|state| {
            let (next, layer) = state.document.add_layer(name, media_type, source);
            state.document = next;
            state.selected = Some(layer.id.clone());
            layer
        })
    }

    /// Remove a layer; clears the selection if it pointed at the removed
    /// layer. No-op when the id is absent.
    pub fn remove_layer(&self, id: &LayerId) {
        self.mutate(|state| {
            state.document = state.document.remove_layer(id);
            if state.selected.as_ref() == Some(id) {
                state.selected = None;
            }
        });
    }

    /// Merge a partial field update into the matching layer.
    pub fn update_layer(&self, id: &LayerId, patch: &LayerPatch) {
        self.mutate(|state| {
            state.document = state.document.update_layer(id, patch);
        });
    }

    /// Merge a partial filter update into the matching layer. This is the
    /// sink for the transform engine's live updates.
    pub fn update_layer_filters(&self, id: &LayerId, patch: &FilterPatch) {
        self.mutate(|state| {
            state.document = state.document.update_layer_filters(id, patch);
        });
    }

    /// Move a layer between insertion-order positions and reassign dense
    /// `z_index` values 1..N.
    pub fn reorder_layers(&self, from: usize, to: usize) {
        self.mutate(|state| {
            state.document = state.document.reorder_layers(from, to);
        });
    }

    /// Duplicate a layer and select the clone. Returns the clone, or
    /// `None` when the id is absent.
    pub fn duplicate_layer(&self, id: &LayerId) -> Option<Layer> {
        self.mutate(|state| {
            let (next, copy) = state.document.duplicate_layer(id);
            state.document = next;
            if let Some(ref layer) = copy {
                state.selected = Some(layer.id.clone());
            }
            copy
        })
    }

    /// Replace the canvas size.
    pub fn set_canvas_size(&self, size: CanvasSize) {
        self.mutate(|state| {
            state.document = state.document.with_canvas_size(size);
        });
    }

    /// Replace the background color.
    pub fn set_background_color(&self, color: impl Into<String>) {
        self.mutate(|state| {
            state.document = state.document.with_background_color(color);
        });
    }

    /// Replace the project name.
    pub fn set_project_name(&self, name: impl Into<String>) {
        self.mutate(|state| {
            state.document = state.document.with_name(name);
        });
    }

    /// Attach a filter group to the matching layer.
    pub fn attach_filter_group(&self, id: &LayerId, group: FilterGroup) {
        self.mutate(|state| {
            state.document = state.document.attach_filter_group(id, group);
        });
    }

    /// Detach a filter group from the matching layer.
    pub fn detach_filter_group(&self, id: &LayerId, group: &FilterGroup) {
        self.mutate(|state| {
            state.document = state.document.detach_filter_group(id, group);
        });
    }

    /// Suppress or re-enable an attached filter group.
    pub fn set_filter_group_enabled(&self, id: &LayerId, group: FilterGroup, enabled: bool) {
        self.mutate(|state| {
            state.document = state.document.set_filter_group_enabled(id, group, enabled);
        });
    }

    /// Replace the whole document (load seeding). Clears the selection
    /// when the selected layer is gone from the new document.
    pub fn replace(&self, document: SceneDocument) {
        self.mutate(|state| {
            if let Some(ref selected) = state.selected {
                if document.layer(selected).is_none() {
                    state.selected = None;
                }
            }
            state.document = document;
        });
    }

    /// Restore the default document and clear the selection. Purging the
    /// local persistent cache is the persistence layer's half of a
    /// reset.
    pub fn reset(&self) {
        self.mutate(|state| {
            state.document = SceneDocument::default();
            state.selected = None;
        });
    }

    /// Serialize the current document to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> SceneResult<String> {
        self.snapshot().to_json()
    }

    /// Validate and import a document from JSON, replacing the live
    /// document on success.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SceneError::Serialization`] when the input is not
    /// valid JSON and [`crate::SceneError::Validation`] when required
    /// top-level fields are missing; the live document is untouched in
    /// both cases.
    pub fn import_json(&self, json: &str) -> SceneResult<SceneDocument> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        SceneDocument::validate_import(&value)?;

        let mut document = codec::expand(&value);
        document.last_modified = current_timestamp_ms();
        self.replace(document.clone());
        Ok(document)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Apply a mutation and notify the change listener with the new
    /// snapshot (outside the lock).
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.write();
            let result = f(&mut state);
            (result, state.document.clone())
        };
        let listener = self
            .listener
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(ref listener) = *listener {
            listener(&snapshot);
        }
        result
    }
}
