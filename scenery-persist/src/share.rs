//! Share links: visibility toggling and scene id assignment.
//!
//! Sharing needs three external collaborators, consumed as seams:
//! [`IdentityResolver`] (who owns the scene), [`ShareIdGenerator`]
//! (fresh collision-resistant short ids) and, for media flows,
//! [`MediaUploader`]. All three live outside this crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use scenery_core::{codec, SceneDocument};

use crate::coordinator::PersistenceCoordinator;
use crate::error::{MediaUploadError, ShareError};

/// Identity of the signed-in owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an owner id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves the current owner identity, or nothing when signed out.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// The signed-in owner, if any.
    async fn current_owner(&self) -> Option<OwnerId>;
}

/// Produces fresh collision-resistant short identifiers for scenes.
pub trait ShareIdGenerator: Send + Sync {
    /// Generate a fresh identifier.
    fn generate(&self) -> String;
}

/// Uploads a media file and returns its source URL. Media ingestion and
/// conversion happen outside this crate; layers only carry the resulting
/// URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload a file, returning the URL to use as a layer source.
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Url, MediaUploadError>;
}

/// The outcome of a successful share.
#[derive(Debug, Clone)]
pub struct ShareLink {
    /// The shareable URL embedding the scene id.
    pub url: Url,
    /// The scene id the link embeds.
    pub scene_id: String,
    /// Whether the id was assigned by this call. Hosts update their
    /// addressable location when this is set; the observable URL is the
    /// same either way.
    pub newly_assigned: bool,
    /// The updated document as written.
    pub document: SceneDocument,
}

/// Build the shareable URL for a scene id: the base application URL with
/// the id carried in a query-style fragment parameter.
#[must_use]
pub fn share_url(base: &Url, scene_id: &str) -> Url {
    let mut url = base.clone();
    url.set_fragment(Some(&format!("/?id={scene_id}")));
    url
}

/// Visibility toggling and id assignment for the current scene.
pub struct ShareLinkService {
    coordinator: Arc<PersistenceCoordinator>,
    identity: Arc<dyn IdentityResolver>,
    ids: Arc<dyn ShareIdGenerator>,
    base_url: Url,
}

impl std::fmt::Debug for ShareLinkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLinkService")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ShareLinkService {
    /// Create the service around a coordinator and the external seams.
    #[must_use]
    pub fn new(
        coordinator: Arc<PersistenceCoordinator>,
        identity: Arc<dyn IdentityResolver>,
        ids: Arc<dyn ShareIdGenerator>,
        base_url: Url,
    ) -> Self {
        Self {
            coordinator,
            identity,
            ids,
            base_url,
        }
    }

    /// Set the scene's visibility and return its share link, assigning a
    /// fresh id on first share.
    ///
    /// Identity is resolved before anything else; no partial writes
    /// occur when it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::AuthRequired`] when no owner is signed in
    /// and [`ShareError::Failed`] when the remote write fails.
    pub async fn set_visibility(
        &self,
        document: &SceneDocument,
        is_public: bool,
    ) -> Result<ShareLink, ShareError> {
        let Some(owner) = self.identity.current_owner().await else {
            return Err(ShareError::AuthRequired);
        };

        let updated = document.with_visibility(is_public);
        let config = serde_json::to_value(codec::compact(&updated))
            .map_err(|e| ShareError::Failed(e.to_string()))?;
        let legacy_config = with_owner_folded_in(&config, &owner);

        let remote = self
            .coordinator
            .remote()
            .ok_or_else(|| ShareError::Failed("no remote store configured".to_string()))?;

        if let Some(id) = self.coordinator.scene_id() {
            remote
                .update(&id, &config, &legacy_config, is_public)
                .await
                .map_err(|e| ShareError::Failed(e.to_string()))?;
            self.coordinator.cache_and_mirror(&updated).await;

            return Ok(ShareLink {
                url: share_url(&self.base_url, &id),
                scene_id: id,
                newly_assigned: false,
                document: updated,
            });
        }

        let id = self.ids.generate();
        remote
            .insert(&id, owner.as_str(), &config, &legacy_config, is_public)
            .await
            .map_err(|e| ShareError::Failed(e.to_string()))?;
        self.coordinator.set_scene_id(&id);
        self.coordinator.cache_and_mirror(&updated).await;

        Ok(ShareLink {
            url: share_url(&self.base_url, &id),
            scene_id: id,
            newly_assigned: true,
            document: updated,
        })
    }
}

/// The legacy write shape keeps ownership inside the config payload,
/// since the row has no `owner_id` column to carry it.
fn with_owner_folded_in(config: &Value, owner: &OwnerId) -> Value {
    let mut legacy = config.clone();
    if let Some(object) = legacy.as_object_mut() {
        object.insert("ownerId".to_string(), Value::String(owner.as_str().to_string()));
    }
    legacy
}
