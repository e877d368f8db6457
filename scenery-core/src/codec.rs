//! Compact wire codec: a lossless, versioned mapping between the full
//! document schema and a short-keyed storage shape.
//!
//! [`compact`] projects every document field onto the short keys used on
//! the wire; [`expand`] accepts either the full or the compact shape and
//! returns a fully normalized [`SceneDocument`], filling every missing
//! field - including every filter field - with its documented default.
//! Expansion is idempotent and pure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{current_timestamp_ms, CanvasSize, SceneDocument, DOCUMENT_VERSION};
use crate::filters::{FilterGroup, LayerFilters};
use crate::layer::{Layer, LayerId, MediaType};

/// Version tag stamped on every compacted document.
pub const COMPACT_SCHEMA_VERSION: u32 = 1;

/// Compacted filter record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactFilters {
    /// opacity
    #[serde(default = "d_opacity")]
    pub op: f64,
    /// offsetX
    #[serde(default)]
    pub ox: f64,
    /// offsetY
    #[serde(default)]
    pub oy: f64,
    /// scale
    #[serde(default = "d_scale")]
    pub s: f64,
    /// rotation
    #[serde(default)]
    pub r: f64,
    /// hueRotate
    #[serde(default)]
    pub h: f64,
    /// brightness
    #[serde(default = "d_percent")]
    pub b: f64,
    /// contrast
    #[serde(default = "d_percent")]
    pub c: f64,
    /// saturate
    #[serde(default = "d_percent")]
    pub sa: f64,
    /// blur
    #[serde(default)]
    pub bl: f64,
    /// flipX
    #[serde(default)]
    pub fx: bool,
    /// flipY
    #[serde(default)]
    pub fy: bool,
    /// uvScrollX
    #[serde(default)]
    pub ux: f64,
    /// uvScrollY
    #[serde(default)]
    pub uy: f64,
    /// visible
    #[serde(default = "d_visible")]
    pub v: bool,
    /// activeFilters
    #[serde(default)]
    pub af: Vec<FilterGroup>,
    /// disabledFilters
    #[serde(default)]
    pub df: Vec<FilterGroup>,
}

const fn d_opacity() -> f64 {
    100.0
}
const fn d_scale() -> f64 {
    1.0
}
const fn d_percent() -> f64 {
    100.0
}
const fn d_visible() -> bool {
    true
}

impl Default for CompactFilters {
    fn default() -> Self {
        Self::from(&LayerFilters::default())
    }
}

impl From<&LayerFilters> for CompactFilters {
    fn from(f: &LayerFilters) -> Self {
        Self {
            op: f.opacity,
            ox: f.offset_x,
            oy: f.offset_y,
            s: f.scale,
            r: f.rotation,
            h: f.hue_rotate,
            b: f.brightness,
            c: f.contrast,
            sa: f.saturate,
            bl: f.blur,
            fx: f.flip_x,
            fy: f.flip_y,
            ux: f.uv_scroll_x,
            uy: f.uv_scroll_y,
            v: f.visible,
            af: f.active_filters.clone(),
            df: f.disabled_filters.clone(),
        }
    }
}

impl From<CompactFilters> for LayerFilters {
    fn from(f: CompactFilters) -> Self {
        Self {
            visible: f.v,
            opacity: f.op,
            offset_x: f.ox,
            offset_y: f.oy,
            scale: f.s,
            rotation: f.r,
            flip_x: f.fx,
            flip_y: f.fy,
            hue_rotate: f.h,
            brightness: f.b,
            contrast: f.c,
            saturate: f.sa,
            blur: f.bl,
            uv_scroll_x: f.ux,
            uv_scroll_y: f.uy,
            active_filters: f.af,
            disabled_filters: f.df,
            extra: serde_json::Map::new(),
        }
    }
}

/// Compacted layer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactLayer {
    /// id
    #[serde(default)]
    pub i: LayerId,
    /// name
    #[serde(default = "d_layer_name")]
    pub n: String,
    /// type
    #[serde(default)]
    pub t: MediaType,
    /// source
    #[serde(default)]
    pub s: String,
    /// zIndex
    #[serde(default)]
    pub z: u32,
    /// createdAt
    #[serde(default = "current_timestamp_ms")]
    pub c: u64,
    /// updatedAt
    #[serde(default = "current_timestamp_ms")]
    pub u: u64,
    /// filters
    #[serde(default)]
    pub f: CompactFilters,
}

fn d_layer_name() -> String {
    "Layer".to_string()
}

/// Compacted canvas size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompactCanvasSize {
    /// width
    #[serde(default = "d_width")]
    pub w: u32,
    /// height
    #[serde(default = "d_height")]
    pub h: u32,
}

const fn d_width() -> u32 {
    1920
}
const fn d_height() -> u32 {
    1080
}

impl Default for CompactCanvasSize {
    fn default() -> Self {
        Self { w: 1920, h: 1080 }
    }
}

/// Compacted document record, the unit written to the remote row store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactDocument {
    /// name
    #[serde(default = "d_doc_name")]
    pub n: String,
    /// canvasSize
    #[serde(default)]
    pub s: CompactCanvasSize,
    /// backgroundColor
    #[serde(default = "d_background")]
    pub b: String,
    /// isPublic
    #[serde(default)]
    pub p: bool,
    /// layers
    #[serde(default)]
    pub l: Vec<CompactLayer>,
    /// lastModified
    #[serde(default = "current_timestamp_ms")]
    pub m: u64,
    /// schema version
    #[serde(default = "d_schema_version")]
    pub v: u32,
}

fn d_doc_name() -> String {
    crate::document::DEFAULT_DOCUMENT_NAME.to_string()
}

fn d_background() -> String {
    crate::document::DEFAULT_BACKGROUND_COLOR.to_string()
}

const fn d_schema_version() -> u32 {
    COMPACT_SCHEMA_VERSION
}

/// Project a document onto the compact wire shape.
///
/// The projection is total: every schema field has a short-key
/// counterpart, and the result is stamped with
/// [`COMPACT_SCHEMA_VERSION`]. Unrecognized extra fields are not part of
/// the versioned schema and are not carried.
#[must_use]
pub fn compact(document: &SceneDocument) -> CompactDocument {
    CompactDocument {
        n: document.name.clone(),
        s: CompactCanvasSize {
            w: document.canvas_size.width,
            h: document.canvas_size.height,
        },
        b: document.background_color.clone(),
        p: document.is_public,
        m: document.last_modified,
        v: COMPACT_SCHEMA_VERSION,
        l: document
            .layers
            .iter()
            .map(|layer| CompactLayer {
                i: layer.id.clone(),
                n: layer.name.clone(),
                t: layer.media_type,
                s: layer.source.clone(),
                z: layer.z_index,
                c: layer.created_at,
                u: layer.updated_at,
                f: CompactFilters::from(&layer.filters),
            })
            .collect(),
    }
}

/// Expand either wire shape into a fully normalized document.
///
/// The compact shape is detected by the short-key layer list `l` (a
/// document carrying a full `layers` array is treated as the full
/// shape). Every missing field is filled with its documented default, so
/// the result type-checks against the current schema regardless of
/// source vintage; unknown version tags are expanded best-effort with
/// the same default-fill rule. Unrecognized extra fields on the full
/// shape pass through unchanged. `expand` is idempotent.
#[must_use]
pub fn expand(value: &Value) -> SceneDocument {
    let is_full = value.get("layers").is_some() && value.get("l").is_none();
    let mut document = if is_full {
        expand_full(value)
    } else {
        expand_compact(value)
    };
    document.strip_unknown_filter_groups();
    document
}

fn expand_full(value: &Value) -> SceneDocument {
    // Layers are parsed individually so one malformed record does not
    // discard the rest of the document.
    let mut object = value.as_object().cloned().unwrap_or_default();
    let raw_layers = match object.remove("layers") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut document =
        match serde_json::from_value::<SceneDocument>(Value::Object(object)) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("unreadable document fields, falling back to defaults: {e}");
                SceneDocument::default()
            }
        };

    document.layers = raw_layers
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Layer>(raw) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!("skipping unreadable layer: {e}");
                None
            }
        })
        .collect();
    document
}

fn expand_compact(value: &Value) -> SceneDocument {
    let compacted = match serde_json::from_value::<CompactDocument>(value.clone()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("unreadable compact document, falling back to defaults: {e}");
            CompactDocument {
                n: d_doc_name(),
                s: CompactCanvasSize::default(),
                b: d_background(),
                p: false,
                l: Vec::new(),
                m: current_timestamp_ms(),
                v: COMPACT_SCHEMA_VERSION,
            }
        }
    };

    if compacted.v != COMPACT_SCHEMA_VERSION {
        tracing::debug!(
            "expanding compact document with unknown schema version {} best-effort",
            compacted.v
        );
    }

    SceneDocument {
        name: compacted.n,
        canvas_size: CanvasSize::new(compacted.s.w, compacted.s.h),
        background_color: compacted.b,
        is_public: compacted.p,
        version: DOCUMENT_VERSION.to_string(),
        last_modified: compacted.m,
        layers: compacted
            .l
            .into_iter()
            .map(|layer| Layer {
                id: layer.i,
                name: layer.n,
                media_type: layer.t,
                source: layer.s,
                z_index: layer.z,
                created_at: layer.c,
                updated_at: layer.u,
                filters: LayerFilters::from(layer.f),
                extra: serde_json::Map::new(),
            })
            .collect(),
        extra: serde_json::Map::new(),
    }
}
