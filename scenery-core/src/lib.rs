//! # Scenery Core
//!
//! Core logic of the Scenery scene document engine: the canonical
//! document model, the interactive transform engine, and the compact
//! wire codec.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                scenery-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Document Model   │  Transform Engine       │
//! │  - SceneDocument  │  - Move with snapping   │
//! │  - Layers         │  - Corner resize        │
//! │  - Filter stacks  │  - Snap guides          │
//! ├─────────────────────────────────────────────┤
//! │  Document Store   │  Compaction Codec       │
//! │  - Snapshot swap  │  - Short-key wire form  │
//! │  - Change events  │  - Default-fill expand  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Persistence tiers and sharing live in `scenery-persist`; the local
//! development companion server lives in `scenery-companion`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod document;
pub mod error;
pub mod filters;
pub mod layer;
pub mod store;
pub mod transform;

pub use codec::{compact, expand, CompactDocument, CompactFilters, CompactLayer, COMPACT_SCHEMA_VERSION};
pub use document::{current_timestamp_ms, CanvasSize, SceneDocument, DOCUMENT_VERSION};
pub use error::{SceneError, SceneResult};
pub use filters::{FilterGroup, FilterPatch, FilterStyleResolver, LayerFilters};
pub use layer::{Layer, LayerId, LayerPatch, MediaType};
pub use store::DocumentStore;
pub use transform::{
    Axis, Corner, DragState, PointerPoint, SnapGuide, SnapLine, TransformEngine,
    TransformSnapshot, MAX_SCALE, MIN_SCALE, SNAP_THRESHOLD,
};

/// Scenery core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
