//! Interactive move/resize transforms with edge and center snapping.
//!
//! [`TransformEngine`] is an explicit state machine driven by pointer
//! events, so it stays host-environment-agnostic and testable without a
//! real pointer device. It communicates outward solely through the
//! injected update callback, which receives a partial
//! [`FilterPatch`] on every live update.

use serde::{Deserialize, Serialize};

use crate::document::CanvasSize;
use crate::filters::FilterPatch;

/// Snap threshold in screen pixels. Divided by the canvas scale so the
/// pull feels the same at every zoom level.
pub const SNAP_THRESHOLD: f64 = 15.0;

/// Minimum layer scale.
pub const MIN_SCALE: f64 = 0.1;

/// Maximum layer scale.
pub const MAX_SCALE: f64 = 5.0;

/// Pointer-delta divisor that turns a corner drag into a scale delta.
const RESIZE_SENSITIVITY: f64 = 200.0;

/// A corner handle grabbed for resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    /// Top-left handle.
    NorthWest,
    /// Top-right handle.
    NorthEast,
    /// Bottom-left handle.
    SouthWest,
    /// Bottom-right handle.
    SouthEast,
}

impl Corner {
    /// Horizontal drag sign: `+1` for right-side corners, `-1` for left.
    #[must_use]
    pub const fn sign_x(self) -> f64 {
        match self {
            Self::NorthEast | Self::SouthEast => 1.0,
            Self::NorthWest | Self::SouthWest => -1.0,
        }
    }

    /// Vertical drag sign: `+1` for bottom corners, `-1` for top.
    #[must_use]
    pub const fn sign_y(self) -> f64 {
        match self {
            Self::SouthWest | Self::SouthEast => 1.0,
            Self::NorthWest | Self::NorthEast => -1.0,
        }
    }
}

/// A canvas axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal axis.
    X,
    /// Vertical axis.
    Y,
}

/// A canonical alignment line a moving layer can snap onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapLine {
    /// `-extent / 2`: the left or top canvas edge.
    NearEdge,
    /// `0`: the canvas center.
    Center,
    /// `+extent / 2`: the right or bottom canvas edge.
    FarEdge,
}

/// An active snap guide, reported while a move gesture is clamped onto a
/// canonical line. At most one guide per axis is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapGuide {
    /// The axis the guide constrains.
    pub axis: Axis,
    /// The line the offset is clamped to.
    pub line: SnapLine,
}

/// A pointer position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPoint {
    /// Horizontal screen coordinate.
    pub x: f64,
    /// Vertical screen coordinate.
    pub y: f64,
}

impl PointerPoint {
    /// Create a pointer position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The transform values captured at pointer-down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformSnapshot {
    /// Starting horizontal offset.
    pub offset_x: f64,
    /// Starting vertical offset.
    pub offset_y: f64,
    /// Starting scale.
    pub scale: f64,
}

/// The engine's current gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging the move surface.
    Moving,
    /// Dragging a corner handle.
    Resizing(Corner),
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    start: PointerPoint,
    snapshot: TransformSnapshot,
}

/// Interactive transform state machine.
///
/// Drive it with `begin_move`/`begin_resize`, `pointer_move` and
/// `pointer_up`. Updates are applied live on every move event through
/// the injected callback; pointer-up merely ends the gesture, leaving
/// the last applied offset/scale committed.
pub struct TransformEngine {
    canvas_size: CanvasSize,
    canvas_scale: f64,
    state: DragState,
    gesture: Option<Gesture>,
    guides: Vec<SnapGuide>,
    on_update: Box<dyn FnMut(FilterPatch) + Send>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("canvas_size", &self.canvas_size)
            .field("canvas_scale", &self.canvas_scale)
            .field("state", &self.state)
            .field("guides", &self.guides)
            .finish_non_exhaustive()
    }
}

impl TransformEngine {
    /// Create an engine for the given canvas, reporting live updates to
    /// `on_update`.
    ///
    /// `canvas_scale` is the current on-screen zoom factor; pointer
    /// deltas are divided by it so gestures feel resolution-independent.
    pub fn new(
        canvas_size: CanvasSize,
        canvas_scale: f64,
        on_update: impl FnMut(FilterPatch) + Send + 'static,
    ) -> Self {
        Self {
            canvas_size,
            canvas_scale: canvas_scale.max(f64::EPSILON),
            state: DragState::Idle,
            gesture: None,
            guides: Vec::new(),
            on_update: Box::new(on_update),
        }
    }

    /// Current gesture state.
    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Currently active snap guides (empty outside move gestures).
    #[must_use]
    pub fn guides(&self) -> &[SnapGuide] {
        &self.guides
    }

    /// Update the on-screen zoom factor mid-session.
    pub fn set_canvas_scale(&mut self, canvas_scale: f64) {
        self.canvas_scale = canvas_scale.max(f64::EPSILON);
    }

    /// Update the canvas dimensions mid-session.
    pub fn set_canvas_size(&mut self, canvas_size: CanvasSize) {
        self.canvas_size = canvas_size;
    }

    /// Begin a move gesture over the move surface, capturing the pointer
    /// position and the layer's current transform values. Starting a new
    /// gesture replaces any gesture in progress.
    pub fn begin_move(&mut self, at: PointerPoint, snapshot: TransformSnapshot) {
        self.state = DragState::Moving;
        self.gesture = Some(Gesture { start: at, snapshot });
        self.guides.clear();
    }

    /// Begin a resize gesture on a corner handle. Guides are cleared on
    /// entry and stay clear: there is no snapping during resize.
    pub fn begin_resize(&mut self, corner: Corner, at: PointerPoint, snapshot: TransformSnapshot) {
        self.state = DragState::Resizing(corner);
        self.gesture = Some(Gesture { start: at, snapshot });
        self.guides.clear();
    }

    /// Feed a pointer-move event. Ignored while idle.
    pub fn pointer_move(&mut self, at: PointerPoint) {
        let Some(gesture) = self.gesture else {
            return;
        };
        let delta_x = (at.x - gesture.start.x) / self.canvas_scale;
        let delta_y = (at.y - gesture.start.y) / self.canvas_scale;

        match self.state {
            DragState::Idle => {}
            DragState::Moving => self.apply_move(&gesture, delta_x, delta_y),
            DragState::Resizing(corner) => self.apply_resize(&gesture, corner, delta_x, delta_y),
        }
    }

    /// End the gesture on pointer-up: clears guides and discards the
    /// captured snapshot. The last applied offset/scale stays committed.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
        self.gesture = None;
        self.guides.clear();
    }

    /// Forced cancellation (e.g. host teardown). Identical to
    /// [`Self::pointer_up`]: live updates already applied are kept.
    pub fn cancel(&mut self) {
        self.pointer_up();
    }

    fn apply_move(&mut self, gesture: &Gesture, delta_x: f64, delta_y: f64) {
        let threshold = SNAP_THRESHOLD / self.canvas_scale;

        let (new_x, guide_x) = snap_axis(
            gesture.snapshot.offset_x + delta_x,
            f64::from(self.canvas_size.width),
            threshold,
        );
        let (new_y, guide_y) = snap_axis(
            gesture.snapshot.offset_y + delta_y,
            f64::from(self.canvas_size.height),
            threshold,
        );

        self.guides.clear();
        if let Some(line) = guide_x {
            self.guides.push(SnapGuide { axis: Axis::X, line });
        }
        if let Some(line) = guide_y {
            self.guides.push(SnapGuide { axis: Axis::Y, line });
        }

        (self.on_update)(FilterPatch::offset(new_x, new_y));
    }

    fn apply_resize(&mut self, gesture: &Gesture, corner: Corner, delta_x: f64, delta_y: f64) {
        self.guides.clear();

        let raw = (delta_x * corner.sign_x() + delta_y * corner.sign_y()) / RESIZE_SENSITIVITY;
        let scale = (gesture.snapshot.scale + raw).clamp(MIN_SCALE, MAX_SCALE);
        let rounded = (scale * 1000.0).round() / 1000.0;

        (self.on_update)(FilterPatch::scaled(rounded));
    }
}

/// Test a candidate offset against the axis' three canonical lines in
/// near-edge, far-edge, center priority order; the first line within the
/// threshold wins and the candidate is clamped onto it exactly.
fn snap_axis(candidate: f64, extent: f64, threshold: f64) -> (f64, Option<SnapLine>) {
    let half = extent / 2.0;
    if (candidate - (-half)).abs() < threshold {
        (-half, Some(SnapLine::NearEdge))
    } else if (candidate - half).abs() < threshold {
        (half, Some(SnapLine::FarEdge))
    } else if candidate.abs() < threshold {
        (0.0, Some(SnapLine::Center))
    } else {
        (candidate, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn engine_with_log(
        canvas_scale: f64,
    ) -> (TransformEngine, Arc<Mutex<Vec<FilterPatch>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let engine = TransformEngine::new(
            CanvasSize::new(1920, 1080),
            canvas_scale,
            move |patch| sink.lock().expect("lock").push(patch),
        );
        (engine, log)
    }

    fn last_patch(log: &Arc<Mutex<Vec<FilterPatch>>>) -> FilterPatch {
        log.lock().expect("lock").last().cloned().expect("patch emitted")
    }

    #[test]
    fn test_move_without_snap_tracks_pointer() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_move(PointerPoint::new(0.0, 0.0), TransformSnapshot::default());
        engine.pointer_move(PointerPoint::new(120.0, -40.0));

        let patch = last_patch(&log);
        assert_eq!(patch.offset_x, Some(120.0));
        assert_eq!(patch.offset_y, Some(-40.0));
        assert!(engine.guides().is_empty());
    }

    #[test]
    fn test_move_snaps_to_near_edge_with_guide() {
        // Canvas width 1920, scale 1: candidate -958 is within 15px of -960.
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_move(
            PointerPoint::new(0.0, 0.0),
            TransformSnapshot {
                offset_x: -900.0,
                offset_y: 0.0,
                scale: 1.0,
            },
        );
        engine.pointer_move(PointerPoint::new(-58.0, 0.0));

        let patch = last_patch(&log);
        assert_eq!(patch.offset_x, Some(-960.0));
        assert_eq!(
            engine.guides(),
            &[SnapGuide {
                axis: Axis::X,
                line: SnapLine::NearEdge
            }]
        );
    }

    #[test]
    fn test_move_snaps_center_and_far_edge_independently_per_axis() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_move(PointerPoint::new(0.0, 0.0), TransformSnapshot::default());
        // X lands near center (5), Y lands near the bottom edge (533 vs 540).
        engine.pointer_move(PointerPoint::new(5.0, 533.0));

        let patch = last_patch(&log);
        assert_eq!(patch.offset_x, Some(0.0));
        assert_eq!(patch.offset_y, Some(540.0));
        assert_eq!(engine.guides().len(), 2);
        assert!(engine.guides().contains(&SnapGuide {
            axis: Axis::X,
            line: SnapLine::Center
        }));
        assert!(engine.guides().contains(&SnapGuide {
            axis: Axis::Y,
            line: SnapLine::FarEdge
        }));
    }

    #[test]
    fn test_threshold_scales_with_zoom() {
        // At 2x zoom the canvas-space threshold is 7.5, so a candidate
        // 10 units from the line must not snap.
        let (mut engine, log) = engine_with_log(2.0);
        engine.begin_move(
            PointerPoint::new(0.0, 0.0),
            TransformSnapshot {
                offset_x: -950.0,
                offset_y: 0.0,
                scale: 1.0,
            },
        );
        engine.pointer_move(PointerPoint::new(0.0, 0.0));

        let patch = last_patch(&log);
        assert_eq!(patch.offset_x, Some(-950.0));
        assert!(engine.guides().is_empty());
    }

    #[test]
    fn test_guides_clear_when_leaving_threshold() {
        let (mut engine, _log) = engine_with_log(1.0);
        engine.begin_move(PointerPoint::new(0.0, 0.0), TransformSnapshot::default());
        engine.pointer_move(PointerPoint::new(5.0, 0.0));
        assert!(!engine.guides().is_empty());

        engine.pointer_move(PointerPoint::new(300.0, 0.0));
        assert!(engine.guides().is_empty());
    }

    #[test]
    fn test_resize_scales_and_rounds() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_resize(
            Corner::SouthEast,
            PointerPoint::new(0.0, 0.0),
            TransformSnapshot {
                offset_x: 0.0,
                offset_y: 0.0,
                scale: 1.0,
            },
        );
        engine.pointer_move(PointerPoint::new(50.0, 50.0));

        // (50 + 50) / 200 = 0.5
        let patch = last_patch(&log);
        assert_eq!(patch.scale, Some(1.5));
        assert!(engine.guides().is_empty());
    }

    #[test]
    fn test_resize_top_left_inverts_sign() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_resize(
            Corner::NorthWest,
            PointerPoint::new(0.0, 0.0),
            TransformSnapshot {
                offset_x: 0.0,
                offset_y: 0.0,
                scale: 2.0,
            },
        );
        // Dragging toward the top-left grows the layer from a NW handle.
        engine.pointer_move(PointerPoint::new(-100.0, -100.0));

        let patch = last_patch(&log);
        assert_eq!(patch.scale, Some(3.0));
    }

    #[test]
    fn test_resize_clamps_pathological_deltas() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_resize(
            Corner::SouthEast,
            PointerPoint::new(0.0, 0.0),
            TransformSnapshot {
                offset_x: 0.0,
                offset_y: 0.0,
                scale: 1.0,
            },
        );

        engine.pointer_move(PointerPoint::new(1.0e9, 1.0e9));
        assert_eq!(last_patch(&log).scale, Some(MAX_SCALE));

        engine.pointer_move(PointerPoint::new(-1.0e9, -1.0e9));
        assert_eq!(last_patch(&log).scale, Some(MIN_SCALE));
    }

    #[test]
    fn test_entering_resize_clears_move_guides() {
        let (mut engine, _log) = engine_with_log(1.0);
        engine.begin_move(PointerPoint::new(0.0, 0.0), TransformSnapshot::default());
        engine.pointer_move(PointerPoint::new(3.0, 0.0));
        assert!(!engine.guides().is_empty());

        engine.begin_resize(
            Corner::NorthEast,
            PointerPoint::new(0.0, 0.0),
            TransformSnapshot::default(),
        );
        assert!(engine.guides().is_empty());
        assert_eq!(engine.state(), DragState::Resizing(Corner::NorthEast));
    }

    #[test]
    fn test_pointer_up_returns_to_idle_and_keeps_last_update() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_move(PointerPoint::new(0.0, 0.0), TransformSnapshot::default());
        engine.pointer_move(PointerPoint::new(200.0, 0.0));
        engine.pointer_up();

        assert_eq!(engine.state(), DragState::Idle);
        assert!(engine.guides().is_empty());
        // The patch emitted during the move is the committed value.
        assert_eq!(last_patch(&log).offset_x, Some(200.0));

        // Events after release are ignored.
        engine.pointer_move(PointerPoint::new(999.0, 999.0));
        assert_eq!(log.lock().expect("lock").len(), 1);
    }

    #[test]
    fn test_offset_never_farther_than_threshold_from_reported_line() {
        let (mut engine, log) = engine_with_log(1.0);
        engine.begin_move(PointerPoint::new(0.0, 0.0), TransformSnapshot::default());

        for step in 0..200 {
            let x = f64::from(step) * 9.7 - 970.0;
            engine.pointer_move(PointerPoint::new(x, 0.0));
            let patch = last_patch(&log);
            let offset = patch.offset_x.expect("offset emitted");

            if let Some(guide) = engine.guides().iter().find(|g| g.axis == Axis::X) {
                let line = match guide.line {
                    SnapLine::NearEdge => -960.0,
                    SnapLine::Center => 0.0,
                    SnapLine::FarEdge => 960.0,
                };
                assert!((offset - line).abs() < f64::EPSILON);
                assert!((x - line).abs() < SNAP_THRESHOLD);
            } else {
                assert!((offset - x).abs() < f64::EPSILON);
            }
        }
    }
}
