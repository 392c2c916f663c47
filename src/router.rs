//! Input event routing and per-frame gesture resolution.
//!
//! The router owns the map of live gesture records, decides each frame
//! whether the anchor is driven by a single-hand drag or the two-hand
//! solve, and dispatches resolved taps to the host callbacks (UI action
//! or structure selection).
//!
//! Select-start/select-end/select arrive as host callbacks and may land
//! at any point between frames; they only mutate records consumed by
//! the next `update`, so no frame-boundary coordination is needed. The
//! router is the sole writer of gesture records, and the anchor has
//! exactly one writer per frame: the bimanual solve when it is engaged,
//! otherwise a single-source drag when exactly one record is live.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::anchor::Anchor;
use crate::bimanual::{BimanualBaseline, BimanualConfig};
use crate::gesture::{GestureConfig, GestureRecord};
use crate::hit::{HitTester, UiPickableSet};
use crate::perf::PerfConfig;
use crate::pose::{FramePoses, InputSourceId};

// ── Config ─────────────────────────────────────────────────

/// Aggregated tuning for the interaction layer, shaped for the host's
/// settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub gesture: GestureConfig,
    pub bimanual: BimanualConfig,
    pub perf: PerfConfig,
}

// ── Router ─────────────────────────────────────────────────

type UiActionHandler = Box<dyn FnMut(&str)>;
type SelectionHandler = Box<dyn FnMut(Option<&str>)>;
type ScaleHandler = Box<dyn FnMut(f32)>;

/// Central interaction state: gesture records keyed by input source,
/// the anchor they manipulate, and the layered hit tester.
pub struct InputRouter {
    config: InteractionConfig,
    records: HashMap<InputSourceId, GestureRecord>,
    bimanual: Option<BimanualBaseline>,
    anchor: Anchor,
    hit: HitTester,
    attached: bool,
    last_emitted_scale: Option<f32>,
    on_ui_action: Option<UiActionHandler>,
    on_structure_selected: Option<SelectionHandler>,
    on_anchor_scale_changed: Option<ScaleHandler>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::with_config(InteractionConfig::default())
    }

    pub fn with_config(config: InteractionConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            bimanual: None,
            anchor: Anchor::new(),
            hit: HitTester::new(),
            attached: false,
            last_emitted_scale: None,
            on_ui_action: None,
            on_structure_selected: None,
            on_anchor_scale_changed: None,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn anchor_mut(&mut self) -> &mut Anchor {
        &mut self.anchor
    }

    /// Registry the UI layer fills with its current panel geometry.
    pub fn ui_pickables_mut(&mut self) -> &mut UiPickableSet {
        &mut self.hit.ui
    }

    /// Content raycast delegate; the anatomy layer owns the geometry.
    pub fn set_content_picker(
        &mut self,
        picker: impl FnMut(glam::Vec3, glam::Vec3) -> Option<String> + 'static,
    ) {
        self.hit.set_content_picker(picker);
    }

    pub fn on_ui_action(&mut self, handler: impl FnMut(&str) + 'static) {
        self.on_ui_action = Some(Box::new(handler));
    }

    pub fn on_structure_selected(&mut self, handler: impl FnMut(Option<&str>) + 'static) {
        self.on_structure_selected = Some(Box::new(handler));
    }

    pub fn on_anchor_scale_changed(&mut self, handler: impl FnMut(f32) + 'static) {
        self.on_anchor_scale_changed = Some(Box::new(handler));
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Number of sources currently mid-gesture.
    pub fn active_gestures(&self) -> usize {
        self.records.len()
    }

    // ── Session lifecycle ──────────────────────────────────

    /// Begin routing for a freshly started XR session.
    pub fn attach_session(&mut self) {
        if self.attached {
            warn!("attach_session while already attached; restarting clean");
        }
        self.clear_gesture_state();
        self.attached = true;
        info!("xr session attached");
    }

    /// Stop routing and drop every gesture record atomically. Also the
    /// correct response to a session that ends abnormally: no record,
    /// however partial, may survive into the next attachment.
    pub fn detach_session(&mut self) {
        if !self.records.is_empty() {
            debug!("detaching with {} live gesture records", self.records.len());
        }
        self.clear_gesture_state();
        self.attached = false;
        info!("xr session detached");
    }

    fn clear_gesture_state(&mut self) {
        self.records.clear();
        self.bimanual = None;
        self.last_emitted_scale = None;
    }

    // ── Event entry points ─────────────────────────────────

    /// Host `selectstart` callback. Drag eligibility is decided here,
    /// once for the whole gesture: a press that begins on a UI pickable
    /// or on a structure must not also move the anchor underneath it.
    pub fn select_start(
        &mut self,
        source: InputSourceId,
        frame: Option<&dyn FramePoses>,
        now_ms: f64,
    ) {
        if !self.attached {
            debug!("select-start ignored: no session attached");
            return;
        }
        if self.records.contains_key(&source) {
            return;
        }
        let ray = frame.and_then(|f| f.target_ray(source));
        let blocked = ray.map_or(false, |r| self.hit.blocks_drag(&r));
        debug!("select-start {:?} allow_drag={}", source, !blocked);
        self.records.insert(source, GestureRecord::new(now_ms, !blocked));
    }

    /// Host `selectend` callback. Unconditional; a no-op for unknown
    /// sources. Any bimanual baseline is discarded on the next update.
    pub fn select_end(&mut self, source: InputSourceId) {
        if self.records.remove(&source).is_some() {
            debug!("select-end {:?}", source);
        }
    }

    /// Host `select` (primary action) callback. Resolves a tap: UI
    /// pickables first, then content. A gesture that moved or outlived
    /// the tap window has already been applied as a drag and is ignored
    /// here. Drag suppression never suppresses the tap itself.
    pub fn select(&mut self, source: InputSourceId, frame: Option<&dyn FramePoses>, now_ms: f64) {
        let Some(record) = self.records.get(&source) else {
            return;
        };
        if !record.is_tap(now_ms, &self.config.gesture) {
            debug!(
                "select ignored for {:?}: moved={} elapsed={:.0}ms",
                source,
                record.moved,
                record.elapsed_ms(now_ms),
            );
            return;
        }

        let ray = frame.and_then(|f| f.target_ray(source));
        let Some(ray) = ray else {
            // No ray to re-cast: the tap lands on nothing.
            if let Some(handler) = self.on_structure_selected.as_mut() {
                handler(None);
            }
            return;
        };

        if let Some(hit) = self.hit.ui_hit(&ray) {
            debug!("tap resolved to ui action {}", hit.action);
            if let Some(handler) = self.on_ui_action.as_mut() {
                handler(&hit.action);
            }
            return;
        }

        let structure = self.hit.pick_content(&ray);
        debug!("tap resolved to structure {:?}", structure);
        if let Some(handler) = self.on_structure_selected.as_mut() {
            handler(structure.as_deref());
        }
    }

    // ── Per-frame update ───────────────────────────────────

    /// Per-frame entry point. Polls grip poses for every tracked
    /// source, samples movement, then applies at most one anchor write:
    /// the bimanual solve when two drag-permitted sources are live, a
    /// single-source drag when exactly one is. A source with no grip
    /// pose this frame is skipped without touching its record.
    pub fn update(&mut self, frame: &dyn FramePoses) {
        if !self.attached {
            return;
        }

        // Stable hand order keeps the bimanual baseline consistent.
        let mut sources: Vec<InputSourceId> = self.records.keys().copied().collect();
        sources.sort_unstable();

        let mut grips = Vec::with_capacity(sources.len());
        for &id in &sources {
            let grip = frame.grip_pose(id).map(|pose| pose.position);
            if let Some(position) = grip {
                let anchor = &self.anchor;
                if let Some(record) = self.records.get_mut(&id) {
                    record.sample_movement(position, anchor, &self.config.gesture);
                }
            }
            grips.push(grip);
        }

        let two_qualify = sources.len() == 2
            && sources
                .iter()
                .all(|id| self.records.get(id).is_some_and(|r| r.allow_drag));

        if two_qualify {
            // Both poses are needed to solve; a transient tracking loss
            // holds the baseline and skips the frame.
            if let (Some(g0), Some(g1)) = (grips[0], grips[1]) {
                let pair = [g0, g1];
                let anchor_now = self.anchor.capture();
                let baseline = self.bimanual.get_or_insert_with(|| {
                    debug!("bimanual manipulation engaged");
                    BimanualBaseline::capture(pair, anchor_now)
                });
                let solved = baseline.solve(pair, &self.config.bimanual);
                // Scale, translation, and yaw land as one write.
                self.anchor.restore(&solved);
                self.emit_scale_if_changed(solved.scale.x);
            }
            return;
        }

        if self.bimanual.take().is_some() {
            debug!("bimanual manipulation disengaged");
            // Stale baselines would make a resumed one-hand drag jump;
            // survivors re-capture at their next movement sample.
            for record in self.records.values_mut() {
                record.clear_movement_baseline();
            }
        }

        if sources.len() == 1 {
            if let Some(position) = grips[0] {
                if let Some(record) = self.records.get_mut(&sources[0]) {
                    if record.moved && record.allow_drag {
                        record.drag_step(position, &mut self.anchor);
                    }
                }
            }
        }
    }

    /// Reposition the anchor in front of the viewer, e.g. when entering
    /// the session or on an explicit recenter. Returns false when no
    /// viewer pose is available this frame.
    pub fn recenter(
        &mut self,
        frame: &dyn FramePoses,
        distance: f32,
        vertical_offset: f32,
        yaw_only: bool,
    ) -> bool {
        let Some(viewer) = frame.viewer_pose() else {
            debug!("recenter skipped: no viewer pose");
            return false;
        };
        self.anchor
            .place_in_front_of_viewer(&viewer, distance, vertical_offset, yaw_only);
        true
    }

    fn emit_scale_if_changed(&mut self, scale: f32) {
        let changed = self
            .last_emitted_scale
            .map_or(true, |last| (last - scale).abs() > 1e-4);
        if changed {
            self.last_emitted_scale = Some(scale);
            if let Some(handler) = self.on_anchor_scale_changed.as_mut() {
                handler(scale);
            }
        }
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Test fixture ───────────────────────────────────────────

#[cfg(test)]
#[derive(Default)]
struct TestFrame {
    grips: HashMap<InputSourceId, glam::Vec3>,
    rays: HashMap<InputSourceId, crate::pose::Ray>,
    viewer: Option<crate::pose::Pose>,
}

#[cfg(test)]
impl TestFrame {
    fn with_grip(mut self, source: InputSourceId, position: glam::Vec3) -> Self {
        self.grips.insert(source, position);
        self
    }

    fn with_ray(mut self, source: InputSourceId, ray: crate::pose::Ray) -> Self {
        self.rays.insert(source, ray);
        self
    }
}

#[cfg(test)]
impl FramePoses for TestFrame {
    fn grip_pose(&self, source: InputSourceId) -> Option<crate::pose::Pose> {
        self.grips
            .get(&source)
            .map(|&p| crate::pose::Pose::new(p, glam::Quat::IDENTITY))
    }

    fn target_ray(&self, source: InputSourceId) -> Option<crate::pose::Ray> {
        self.rays.get(&source).copied()
    }

    fn viewer_pose(&self) -> Option<crate::pose::Pose> {
        self.viewer
    }
}

// ── Tests ──────────────────────────────────────────────────
