//! Per-source select gesture tracking.
//!
//! One `GestureRecord` exists per input source while a select gesture is
//! in progress. Dragging is not a separate state: it is the continuous
//! sub-behavior of a selecting source once the grip has moved past the
//! threshold and the start ray struck empty space.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anchor::{Anchor, AnchorTransform};

// ── Config ─────────────────────────────────────────────────

/// Thresholds for tap/drag disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Cumulative grip displacement (meters) past which a gesture
    /// counts as moved.
    pub move_threshold_m: f32,
    /// Maximum press duration (ms) for a select to resolve as a tap.
    pub tap_max_ms: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            move_threshold_m: 0.02,
            tap_max_ms: 250.0,
        }
    }
}

// ── Record ─────────────────────────────────────────────────

/// Per-source state between select-start and select-end.
///
/// Movement baselines (`start_grip`, `start_anchor`, `drag_offset`) are
/// captured lazily on first sample, so a record with all three unset is
/// well-formed: it only means no movement sampling has happened yet.
#[derive(Debug, Clone)]
pub struct GestureRecord {
    /// Host frame clock at select-start (ms).
    pub started_at_ms: f64,
    /// Grip position at the first movement sample.
    pub start_grip: Option<Vec3>,
    /// Anchor transform at the first movement sample.
    pub start_anchor: Option<AnchorTransform>,
    /// Anchor-minus-grip offset, captured once at drag start.
    pub drag_offset: Option<Vec3>,
    /// Sticky: grip displacement exceeded the threshold at least once.
    pub moved: bool,
    /// Decided once at select-start: false when the start ray struck a
    /// UI pickable or content.
    pub allow_drag: bool,
}

impl GestureRecord {
    pub fn new(started_at_ms: f64, allow_drag: bool) -> Self {
        Self {
            started_at_ms,
            start_grip: None,
            start_anchor: None,
            drag_offset: None,
            moved: false,
            allow_drag,
        }
    }

    /// Milliseconds since select-start.
    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        now_ms - self.started_at_ms
    }

    /// Whether a select event at `now_ms` resolves as a tap: the grip
    /// never crossed the movement threshold and the press was short.
    pub fn is_tap(&self, now_ms: f64, config: &GestureConfig) -> bool {
        !self.moved && self.elapsed_ms(now_ms) <= config.tap_max_ms
    }

    /// Sample this frame's grip position: lazily capture the baselines,
    /// then latch `moved` once displacement exceeds the threshold.
    pub fn sample_movement(&mut self, grip: Vec3, anchor: &Anchor, config: &GestureConfig) {
        let start = *self.start_grip.get_or_insert(grip);
        if self.start_anchor.is_none() {
            self.start_anchor = Some(anchor.capture());
        }
        if !self.moved && start.distance(grip) > config.move_threshold_m {
            self.moved = true;
            debug!("gesture crossed move threshold");
        }
    }

    /// One single-source drag step: keep the anchor rigidly attached at
    /// the offset captured when the drag began, rather than snapping the
    /// anchor to the grip position.
    pub fn drag_step(&mut self, grip: Vec3, anchor: &mut Anchor) {
        let offset = *self
            .drag_offset
            .get_or_insert_with(|| anchor.position() - grip);
        anchor.set_position(grip + offset);
    }

    /// Forget the movement baselines so the next sample re-captures
    /// fresh. Used when a two-hand gesture drops back to one hand; the
    /// `moved` latch is kept so the gesture can no longer resolve as a
    /// tap.
    pub fn clear_movement_baseline(&mut self) {
        self.start_grip = None;
        self.start_anchor = None;
        self.drag_offset = None;
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moved_latches_past_threshold() {
        let config = GestureConfig::default();
        let anchor = Anchor::new();
        let mut record = GestureRecord::new(0.0, true);

        record.sample_movement(Vec3::ZERO, &anchor, &config);
        assert!(!record.moved);

        // Below threshold: still a tap candidate.
        record.sample_movement(Vec3::new(0.015, 0.0, 0.0), &anchor, &config);
        assert!(!record.moved);

        // Past threshold: latched.
        record.sample_movement(Vec3::new(0.03, 0.0, 0.0), &anchor, &config);
        assert!(record.moved);

        // Returning to the start does not unlatch.
        record.sample_movement(Vec3::ZERO, &anchor, &config);
        assert!(record.moved);
    }

    #[test]
    fn test_tap_window_boundaries() {
        let config = GestureConfig::default();
        let record = GestureRecord::new(1000.0, true);

        assert!(record.is_tap(1000.0, &config));
        assert!(record.is_tap(1250.0, &config), "exactly 250ms is a tap");
        assert!(!record.is_tap(1251.0, &config), "251ms is too slow");
    }

    #[test]
    fn test_moved_gesture_never_taps() {
        let config = GestureConfig::default();
        let anchor = Anchor::new();
        let mut record = GestureRecord::new(0.0, true);
        record.sample_movement(Vec3::ZERO, &anchor, &config);
        record.sample_movement(Vec3::new(0.05, 0.0, 0.0), &anchor, &config);
        assert!(!record.is_tap(10.0, &config));
    }

    #[test]
    fn test_drag_preserves_offset() {
        let mut anchor = Anchor::new();
        anchor.set_position(Vec3::new(0.0, 1.0, -1.0));
        let mut record = GestureRecord::new(0.0, true);

        // First drag step captures the offset; the anchor must not jump.
        let grip = Vec3::new(0.2, 1.2, -0.5);
        record.drag_step(grip, &mut anchor);
        assert!((anchor.position() - Vec3::new(0.0, 1.0, -1.0)).length() < 1e-6);

        // Subsequent steps carry the anchor at the captured offset.
        let grip2 = grip + Vec3::new(0.1, 0.0, 0.0);
        record.drag_step(grip2, &mut anchor);
        assert!((anchor.position() - Vec3::new(0.1, 1.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_clear_movement_baseline_keeps_moved() {
        let config = GestureConfig::default();
        let anchor = Anchor::new();
        let mut record = GestureRecord::new(0.0, true);
        record.sample_movement(Vec3::ZERO, &anchor, &config);
        record.sample_movement(Vec3::new(0.1, 0.0, 0.0), &anchor, &config);
        record.drag_offset = Some(Vec3::X);

        record.clear_movement_baseline();
        assert!(record.start_grip.is_none());
        assert!(record.start_anchor.is_none());
        assert!(record.drag_offset.is_none());
        assert!(record.moved, "moved stays latched across a baseline reset");
    }

    #[test]
    fn test_config_defaults() {
        let config = GestureConfig::default();
        assert!((config.move_threshold_m - 0.02).abs() < f32::EPSILON);
        assert!((config.tap_max_ms - 250.0).abs() < f64::EPSILON);
    }
}
