//! # Scenery Persist
//!
//! Tiered persistence and sharing for the Scenery scene document
//! engine.
//!
//! Documents survive across sessions and devices through four tiers,
//! consulted in priority order on load and written best-effort on save:
//!
//! 1. the remote scene row store ([`RemoteStore`]),
//! 2. the local development companion server ([`CompanionClient`],
//!    loopback hosts only),
//! 3. the local persistent cache ([`LocalCache`]),
//! 4. the default document.
//!
//! [`PersistenceCoordinator`] orchestrates the tiers and never surfaces
//! a persistence failure to the editing flow; [`ShareLinkService`]
//! assigns scene ids and toggles visibility through the same remote
//! store.

pub mod cache;
pub mod companion;
pub mod coordinator;
pub mod error;
pub mod remote;
pub mod share;

pub use cache::LocalCache;
pub use companion::{is_loopback_host, CompanionClient};
pub use coordinator::{spawn_autosave, PersistenceCoordinator};
pub use error::{CacheError, CompanionError, MediaUploadError, RemoteError, ShareError};
pub use remote::{RemoteStore, SceneRow};
pub use share::{
    share_url, IdentityResolver, MediaUploader, OwnerId, ShareIdGenerator, ShareLink,
    ShareLinkService,
};

/// Scenery persist version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
