//! Multi-tier load/save orchestration.
//!
//! Load priority (first success wins): remote scene row store, local dev
//! companion server (loopback hosts only), local persistent cache,
//! default document. Every loaded document is normalized through
//! [`scenery_core::codec::expand`], so partial and legacy records always
//! enter the engine fully populated.
//!
//! Saves are best-effort and never surface an error: the local cache is
//! written first (authoritative for "last known good"), then the remote
//! row when a scene id is known, then the companion mirror. Overlapping
//! saves are not serialized against each other; each one writes the full
//! snapshot captured at call time, so the newest write wins per tier.

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use scenery_core::{codec, DocumentStore, SceneDocument};

use crate::cache::LocalCache;
use crate::companion::CompanionClient;
use crate::remote::{log_remote_failure, RemoteStore};

/// Orchestrates the persistence tiers around one scene document.
pub struct PersistenceCoordinator {
    remote: Option<RemoteStore>,
    companion: Option<CompanionClient>,
    cache: LocalCache,
    scene_id: RwLock<Option<String>>,
}

impl std::fmt::Debug for PersistenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceCoordinator")
            .field("remote", &self.remote.is_some())
            .field("companion", &self.companion.is_some())
            .field("scene_id", &self.scene_id())
            .finish_non_exhaustive()
    }
}

impl PersistenceCoordinator {
    /// Create a coordinator with only the cache and default tiers.
    #[must_use]
    pub fn new(cache: LocalCache) -> Self {
        Self {
            remote: None,
            companion: None,
            cache,
            scene_id: RwLock::new(None),
        }
    }

    /// Attach the remote scene row store tier.
    #[must_use]
    pub fn with_remote(mut self, remote: RemoteStore) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Attach a companion server client. It only participates when its
    /// URL points at a loopback host.
    #[must_use]
    pub fn with_companion(mut self, companion: CompanionClient) -> Self {
        self.companion = Some(companion);
        self
    }

    /// The attached remote store, if any.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    /// The currently remembered scene id, if any.
    #[must_use]
    pub fn scene_id(&self) -> Option<String> {
        self.scene_id
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Remember a scene id for future saves.
    pub fn set_scene_id(&self, id: impl Into<String>) {
        let mut slot = self
            .scene_id
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(id.into());
    }

    fn dev_companion(&self) -> Option<&CompanionClient> {
        self.companion.as_ref().filter(|c| c.is_dev_host())
    }

    /// Load the document from the highest-priority available tier.
    ///
    /// `target_id` takes precedence over the remembered id, which takes
    /// precedence over the id persisted in the cache. A remote hit
    /// remembers the id for future saves. Tiers that fail fall through
    /// with a log line; this call itself cannot fail.
    pub async fn load(&self, target_id: Option<&str>) -> SceneDocument {
        let id_to_load = target_id
            .map(str::to_string)
            .or_else(|| self.scene_id())
            .or_else(|| self.cache.load_scene_id());

        if let (Some(remote), Some(id)) = (self.remote.as_ref(), id_to_load.as_deref()) {
            match remote.fetch(id).await {
                Ok(Some(row)) => {
                    let mut document = codec::expand(&row.config);
                    if let Some(is_public) = row.is_public {
                        document.is_public = is_public;
                    }
                    self.set_scene_id(id);
                    debug!("loaded scene {id} from remote store");
                    return document;
                }
                Ok(None) => debug!("no remote row for scene {id}"),
                Err(e) => warn!("remote load failed, falling through: {e}"),
            }
        }

        if let Some(companion) = self.dev_companion() {
            match companion.fetch().await {
                Ok(Some(value)) => {
                    debug!("loaded scene from companion server");
                    return codec::expand(&value);
                }
                Ok(None) => {}
                Err(e) => debug!("companion load failed, falling through: {e}"),
            }
        }

        if let Some(value) = self.cache.load_document() {
            debug!("loaded scene from local cache");
            return codec::expand(&value);
        }

        debug!("no persisted scene found, starting from defaults");
        SceneDocument::default()
    }

    /// Persist the full document snapshot to every available tier.
    ///
    /// Best-effort: failures are logged and swallowed, and the caller is
    /// never blocked on an error. The cache tier is written first.
    pub async fn save(&self, document: &SceneDocument) {
        self.write_cache(document);

        if let (Some(remote), Some(id)) = (self.remote.as_ref(), self.scene_id()) {
            match serde_json::to_value(codec::compact(document)) {
                Ok(config) => {
                    if let Err(e) = remote
                        .update(&id, &config, &config, document.is_public)
                        .await
                    {
                        log_remote_failure("save", &e);
                    }
                }
                Err(e) => warn!("could not encode document for remote save: {e}"),
            }
        }

        self.mirror_to_companion(document).await;
    }

    /// Fire-and-forget [`Self::save`]: the edit that triggered it is
    /// visible to the caller immediately, before the save settles.
    pub fn save_detached(self: &Arc<Self>, document: SceneDocument) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.save(&document).await;
        });
    }

    /// Write the document to the cache and mirror it to the companion,
    /// without touching the remote tier. Used by flows that have already
    /// written the remote row themselves.
    pub async fn cache_and_mirror(&self, document: &SceneDocument) {
        self.write_cache(document);
        self.mirror_to_companion(document).await;
    }

    fn write_cache(&self, document: &SceneDocument) {
        if let Err(e) = self.cache.store_document(document) {
            warn!("local cache write failed: {e}");
        }
        if let Some(id) = self.scene_id() {
            if let Err(e) = self.cache.store_scene_id(&id) {
                warn!("local cache id write failed: {e}");
            }
        }
    }

    async fn mirror_to_companion(&self, document: &SceneDocument) {
        if let Some(companion) = self.dev_companion() {
            if let Err(e) = companion.push(document).await {
                debug!("companion mirror failed: {e}");
            }
        }
    }

    /// Purge the local cache and forget the remembered id. The document
    /// half of a reset lives in [`DocumentStore::reset`].
    pub fn reset(&self) {
        self.cache.clear();
        let mut slot = self
            .scene_id
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
    }
}

/// Wire a store's change notifications to fire-and-forget saves.
///
/// Every mutation enqueues its snapshot; the bridge task drains the
/// queue and always saves the newest snapshot it has, so rapid edit
/// bursts coalesce into "last write wins" per tier.
pub fn spawn_autosave(
    store: &DocumentStore,
    coordinator: Arc<PersistenceCoordinator>,
) -> tokio::task::JoinHandle<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SceneDocument>();
    store.set_on_change(move |document| {
        // A closed channel just means the bridge is gone.
        let _ = tx.send(document.clone());
    });

    tokio::spawn(async move {
        while let Some(mut document) = rx.recv().await {
            while let Ok(newer) = rx.try_recv() {
                document = newer;
            }
            coordinator.save(&document).await;
        }
        debug!("autosave bridge stopped");
    })
}
