//! Layer filter stacks - the complete set of geometric and visual
//! adjustments attached to a layer.
//!
//! A [`LayerFilters`] record is always fully populated: every load path
//! merges partial records over [`LayerFilters::default`] before they enter
//! a document. Partial updates travel as [`FilterPatch`].

use serde::{Deserialize, Serialize};

/// A recognized filter group that can be attached to a layer.
///
/// Groups bundle related filter fields in the editing UI: attaching a
/// group exposes its sliders, detaching hides them, and a group can be
/// temporarily suppressed without detaching (see
/// [`LayerFilters::disabled_filters`]).
///
/// Unrecognized ids from newer writers deserialize into
/// [`FilterGroup::Unknown`] and are dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterGroup {
    /// Hue rotation wheel.
    HueRotate,
    /// Brightness/contrast/saturation sliders.
    ColorAdjust,
    /// Gaussian blur radius.
    Blur,
    /// Texture-coordinate scrolling (animated backgrounds).
    UvScroll,
    /// A group id this build does not recognize.
    Unknown(String),
}

impl FilterGroup {
    /// All groups this build recognizes.
    pub const KNOWN: [Self; 4] = [Self::HueRotate, Self::ColorAdjust, Self::Blur, Self::UvScroll];

    /// Stable string id of this group.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::HueRotate => "hueRotate",
            Self::ColorAdjust => "colorAdjust",
            Self::Blur => "blur",
            Self::UvScroll => "uvScroll",
            Self::Unknown(id) => id,
        }
    }

    /// Whether this is a group the current schema recognizes.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for FilterGroup {
    fn from(id: String) -> Self {
        match id.as_str() {
            "hueRotate" => Self::HueRotate,
            "colorAdjust" => Self::ColorAdjust,
            "blur" => Self::Blur,
            "uvScroll" => Self::UvScroll,
            _ => Self::Unknown(id),
        }
    }
}

impl From<FilterGroup> for String {
    fn from(group: FilterGroup) -> Self {
        group.as_str().to_string()
    }
}

impl std::fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete filter stack of a layer.
///
/// Offsets are canvas-space units with the origin at the layer's
/// untransformed center. Percentage fields (`opacity`, `brightness`,
/// `contrast`, `saturate`) are expressed in `[0, 200]` (opacity
/// `[0, 100]`), angles in degrees `[0, 360)`, `blur` in pixels and
/// `uv_scroll_*` in units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerFilters {
    /// Whether the layer is rendered at all.
    #[serde(default = "defaults::visible")]
    pub visible: bool,
    /// Layer opacity in percent.
    #[serde(default = "defaults::opacity")]
    pub opacity: f64,
    /// Horizontal offset from the canvas center.
    #[serde(default)]
    pub offset_x: f64,
    /// Vertical offset from the canvas center.
    #[serde(default)]
    pub offset_y: f64,
    /// Uniform scale factor.
    #[serde(default = "defaults::scale")]
    pub scale: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Horizontal mirror.
    #[serde(default)]
    pub flip_x: bool,
    /// Vertical mirror.
    #[serde(default)]
    pub flip_y: bool,
    /// Hue rotation in degrees.
    #[serde(default)]
    pub hue_rotate: f64,
    /// Brightness in percent.
    #[serde(default = "defaults::percent")]
    pub brightness: f64,
    /// Contrast in percent.
    #[serde(default = "defaults::percent")]
    pub contrast: f64,
    /// Saturation in percent.
    #[serde(default = "defaults::percent")]
    pub saturate: f64,
    /// Blur radius in pixels.
    #[serde(default)]
    pub blur: f64,
    /// Horizontal texture scroll speed.
    #[serde(default)]
    pub uv_scroll_x: f64,
    /// Vertical texture scroll speed.
    #[serde(default)]
    pub uv_scroll_y: f64,
    /// Filter groups currently attached to the layer.
    #[serde(default)]
    pub active_filters: Vec<FilterGroup>,
    /// Attached groups temporarily suppressed without detaching.
    ///
    /// Not validated as a subset of [`Self::active_filters`]; detaching a
    /// group removes it from both lists.
    #[serde(default)]
    pub disabled_filters: Vec<FilterGroup>,
    /// Unrecognized fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

mod defaults {
    pub(super) const fn visible() -> bool {
        true
    }

    pub(super) const fn opacity() -> f64 {
        100.0
    }

    pub(super) const fn scale() -> f64 {
        1.0
    }

    pub(super) const fn percent() -> f64 {
        100.0
    }
}

impl Default for LayerFilters {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 100.0,
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            flip_x: false,
            flip_y: false,
            hue_rotate: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturate: 100.0,
            blur: 0.0,
            uv_scroll_x: 0.0,
            uv_scroll_y: 0.0,
            active_filters: Vec::new(),
            disabled_filters: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl LayerFilters {
    /// Attach a filter group, keeping the list duplicate-free.
    pub fn attach_group(&mut self, group: FilterGroup) {
        if !self.active_filters.contains(&group) {
            self.active_filters.push(group);
        }
    }

    /// Detach a filter group, removing it from both the active and the
    /// disabled lists.
    pub fn detach_group(&mut self, group: &FilterGroup) {
        self.active_filters.retain(|g| g != group);
        self.disabled_filters.retain(|g| g != group);
    }

    /// Suppress or re-enable an attached group without detaching it.
    pub fn set_group_enabled(&mut self, group: FilterGroup, enabled: bool) {
        if enabled {
            self.disabled_filters.retain(|g| *g != group);
        } else if !self.disabled_filters.contains(&group) {
            self.disabled_filters.push(group);
        }
    }

    /// Whether an attached group is currently contributing to the output.
    #[must_use]
    pub fn is_group_enabled(&self, group: &FilterGroup) -> bool {
        self.active_filters.contains(group) && !self.disabled_filters.contains(group)
    }

    /// Drop filter-group ids this build does not recognize.
    ///
    /// Called during document normalization so the lists only carry ids
    /// the schema knows how to render.
    pub fn strip_unknown_groups(&mut self) {
        let strip = |list: &mut Vec<FilterGroup>| {
            list.retain(|g| {
                if g.is_known() {
                    true
                } else {
                    tracing::debug!("dropping unrecognized filter group: {g}");
                    false
                }
            });
        };
        strip(&mut self.active_filters);
        strip(&mut self.disabled_filters);
    }
}

/// A partial filter update, merged field-by-field over a complete record.
///
/// This is both the delta emitted by the transform engine during a drag
/// and the lenient shape used to read legacy filter records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    /// New visibility, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// New opacity, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// New horizontal offset, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<f64>,
    /// New vertical offset, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<f64>,
    /// New scale, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// New rotation, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// New horizontal mirror flag, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip_x: Option<bool>,
    /// New vertical mirror flag, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip_y: Option<bool>,
    /// New hue rotation, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue_rotate: Option<f64>,
    /// New brightness, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    /// New contrast, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    /// New saturation, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturate: Option<f64>,
    /// New blur radius, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    /// New horizontal scroll speed, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_scroll_x: Option<f64>,
    /// New vertical scroll speed, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_scroll_y: Option<f64>,
    /// Replacement active-group list, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_filters: Option<Vec<FilterGroup>>,
    /// Replacement disabled-group list, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_filters: Option<Vec<FilterGroup>>,
}

impl FilterPatch {
    /// A patch that only moves the layer.
    #[must_use]
    pub fn offset(x: f64, y: f64) -> Self {
        Self {
            offset_x: Some(x),
            offset_y: Some(y),
            ..Self::default()
        }
    }

    /// A patch that only rescales the layer.
    #[must_use]
    pub fn scaled(scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..Self::default()
        }
    }

    /// Merge this patch into a complete filter record.
    pub fn apply_to(&self, filters: &mut LayerFilters) {
        if let Some(v) = self.visible {
            filters.visible = v;
        }
        if let Some(v) = self.opacity {
            filters.opacity = v;
        }
        if let Some(v) = self.offset_x {
            filters.offset_x = v;
        }
        if let Some(v) = self.offset_y {
            filters.offset_y = v;
        }
        if let Some(v) = self.scale {
            filters.scale = v;
        }
        if let Some(v) = self.rotation {
            filters.rotation = v;
        }
        if let Some(v) = self.flip_x {
            filters.flip_x = v;
        }
        if let Some(v) = self.flip_y {
            filters.flip_y = v;
        }
        if let Some(v) = self.hue_rotate {
            filters.hue_rotate = v;
        }
        if let Some(v) = self.brightness {
            filters.brightness = v;
        }
        if let Some(v) = self.contrast {
            filters.contrast = v;
        }
        if let Some(v) = self.saturate {
            filters.saturate = v;
        }
        if let Some(v) = self.blur {
            filters.blur = v;
        }
        if let Some(v) = self.uv_scroll_x {
            filters.uv_scroll_x = v;
        }
        if let Some(v) = self.uv_scroll_y {
            filters.uv_scroll_y = v;
        }
        if let Some(ref v) = self.active_filters {
            filters.active_filters = v.clone();
        }
        if let Some(ref v) = self.disabled_filters {
            filters.disabled_filters = v.clone();
        }
    }
}

/// Seam for the rendering host: turns a filter stack into an opaque
/// style/transform descriptor (e.g. a CSS filter string or a shader
/// uniform block). Pixel rendering itself lives outside this crate.
pub trait FilterStyleResolver {
    /// Compute the style descriptor for a complete filter record.
    fn resolve(&self, filters: &LayerFilters) -> String;
}
