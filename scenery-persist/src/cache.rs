//! Local persistent cache: the last full document written on this
//! device, plus the last known scene id.
//!
//! This tier is authoritative for "last known good": saves write here
//! first and synchronously. A cache that fails to parse is logged and
//! treated as absent, never fatal.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use scenery_core::SceneDocument;

use crate::error::CacheError;

/// File holding the last full document.
const DOCUMENT_FILE: &str = "scene.json";

/// File holding the last known scene id.
const ID_FILE: &str = "scene.id";

/// File-based cache directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Open (and create if needed) a cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The cache directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILE)
    }

    fn id_path(&self) -> PathBuf {
        self.dir.join(ID_FILE)
    }

    /// Read the cached document, if any. Unreadable or unparseable
    /// content is logged and reported as absence.
    #[must_use]
    pub fn load_document(&self) -> Option<Value> {
        let path = self.document_path();
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("cached document at {} is not valid JSON, ignoring: {e}", path.display());
                None
            }
        }
    }

    /// Write the full document to the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when serialization or the write fails.
    pub fn store_document(&self, document: &SceneDocument) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(self.document_path(), json)?;
        Ok(())
    }

    /// Read the last known scene id, if any.
    #[must_use]
    pub fn load_scene_id(&self) -> Option<String> {
        let id = std::fs::read_to_string(self.id_path()).ok()?;
        let id = id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    /// Remember a scene id.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the write fails.
    pub fn store_scene_id(&self, id: &str) -> Result<(), CacheError> {
        std::fs::write(self.id_path(), id)?;
        Ok(())
    }

    /// Purge the cached document and id. Part of the explicit document
    /// reset; failures are logged, not surfaced.
    pub fn clear(&self) {
        for path in [self.document_path(), self.id_path()] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("failed to clear cache file {}: {e}", path.display());
                }
            }
        }
    }
}
