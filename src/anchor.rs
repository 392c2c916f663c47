//! Anchor transform management.
//!
//! The anchor is the movable root transform of the anatomical content
//! group. Snapshots are plain value types; restoring one refreshes the
//! cached world matrix in the same call, so hit-testing later in the
//! frame never sees a stale transform.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

// ── Snapshot value ─────────────────────────────────────────

/// Snapshot of an anchor's rigid transform.
///
/// Capture and restore are a lossless round trip; a captured snapshot
/// is an independent copy, unaffected by later anchor writes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorTransform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Default for AnchorTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

// ── Anchor object ──────────────────────────────────────────

/// The movable anchor: transform plus cached world matrix.
///
/// Every write goes through a setter that refreshes the matrix, so the
/// renderer and hit-testing always observe a consistent transform.
#[derive(Debug, Clone)]
pub struct Anchor {
    position: Vec3,
    orientation: Quat,
    scale: Vec3,
    world_matrix: Mat4,
}

impl Anchor {
    pub fn new() -> Self {
        let mut anchor = Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world_matrix: Mat4::IDENTITY,
        };
        anchor.refresh_world_matrix();
        anchor
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.refresh_world_matrix();
    }

    /// Apply position, orientation, and scale as one write.
    pub fn set_transform(&mut self, position: Vec3, orientation: Quat, scale: Vec3) {
        self.position = position;
        self.orientation = orientation;
        self.scale = scale;
        self.refresh_world_matrix();
    }

    /// Snapshot the current transform as an independent copy.
    pub fn capture(&self) -> AnchorTransform {
        AnchorTransform {
            position: self.position,
            orientation: self.orientation,
            scale: self.scale,
        }
    }

    /// Apply a snapshot and refresh the world matrix.
    pub fn restore(&mut self, transform: &AnchorTransform) {
        self.set_transform(transform.position, transform.orientation, transform.scale);
    }

    /// Reposition the anchor in front of a viewer.
    ///
    /// With `yaw_only` the viewer's forward vector is flattened to the
    /// horizontal plane (falling back to -Z when the viewer looks
    /// straight up or down) and the anchor is oriented by yaw alone,
    /// turned to face back toward the viewer. Otherwise the anchor
    /// adopts the viewer's full orientation. Callable with no session
    /// active, e.g. for a desktop "recenter" action.
    pub fn place_in_front_of_viewer(
        &mut self,
        viewer: &Pose,
        distance: f32,
        vertical_offset: f32,
        yaw_only: bool,
    ) {
        let mut forward = viewer.forward();
        if yaw_only {
            forward.y = 0.0;
            forward = forward.try_normalize().unwrap_or(Vec3::NEG_Z);
            // Heading that points the anchor's forward back along -forward.
            self.orientation = Quat::from_rotation_y(forward.x.atan2(forward.z));
        } else {
            self.orientation = viewer.orientation;
        }

        let mut position = viewer.position + forward * distance;
        position.y += vertical_offset;
        self.position = position;
        self.refresh_world_matrix();
    }

    fn refresh_world_matrix(&mut self) {
        self.world_matrix =
            Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position);
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_near(a: Vec3, b: Vec3, eps: f32) {
        assert!((a - b).length() < eps, "expected {b}, got {a}");
    }

    #[test]
    fn test_capture_restore_round_trip() {
        let mut anchor = Anchor::new();
        anchor.set_transform(
            Vec3::new(0.3, 1.2, -0.8),
            Quat::from_rotation_y(0.7),
            Vec3::splat(0.4),
        );

        let snapshot = anchor.capture();
        anchor.set_transform(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        anchor.restore(&snapshot);

        assert_vec3_near(anchor.position(), Vec3::new(0.3, 1.2, -0.8), 1e-6);
        assert_vec3_near(anchor.scale(), Vec3::splat(0.4), 1e-6);
        let expected = Quat::from_rotation_y(0.7);
        assert!(
            anchor.orientation().dot(expected).abs() > 1.0 - 1e-6,
            "orientation not restored: {:?}",
            anchor.orientation(),
        );
    }

    #[test]
    fn test_captured_snapshot_is_independent() {
        let mut anchor = Anchor::new();
        anchor.set_position(Vec3::X);
        let snapshot = anchor.capture();
        anchor.set_position(Vec3::new(5.0, 5.0, 5.0));
        assert_vec3_near(snapshot.position, Vec3::X, 1e-6);
    }

    #[test]
    fn test_world_matrix_tracks_writes() {
        let mut anchor = Anchor::new();
        anchor.set_position(Vec3::new(1.0, 2.0, 3.0));
        let transformed = anchor.world_matrix().transform_point3(Vec3::ZERO);
        assert_vec3_near(transformed, Vec3::new(1.0, 2.0, 3.0), 1e-6);

        anchor.set_transform(Vec3::ZERO, Quat::IDENTITY, Vec3::splat(2.0));
        let scaled = anchor.world_matrix().transform_point3(Vec3::X);
        assert_vec3_near(scaled, Vec3::new(2.0, 0.0, 0.0), 1e-6);
    }

    #[test]
    fn test_place_in_front_yaw_only_faces_viewer() {
        let mut anchor = Anchor::new();
        let viewer = Pose::new(Vec3::new(0.0, 1.6, 0.0), Quat::IDENTITY);
        anchor.place_in_front_of_viewer(&viewer, 2.0, -0.4, true);

        assert_vec3_near(anchor.position(), Vec3::new(0.0, 1.2, -2.0), 1e-5);
        // Anchor forward points back toward the viewer (+Z here).
        let anchor_forward = anchor.orientation() * Vec3::NEG_Z;
        assert_vec3_near(anchor_forward, Vec3::Z, 1e-5);
    }

    #[test]
    fn test_place_in_front_yaw_only_ignores_pitch() {
        let mut anchor = Anchor::new();
        // Viewer pitched 45 degrees down, still heading -Z.
        let viewer = Pose::new(
            Vec3::ZERO,
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_4),
        );
        anchor.place_in_front_of_viewer(&viewer, 1.0, 0.0, true);

        // Flattened forward is -Z regardless of pitch.
        assert_vec3_near(anchor.position(), Vec3::NEG_Z, 1e-5);
    }

    #[test]
    fn test_place_in_front_degenerate_forward_falls_back() {
        let mut anchor = Anchor::new();
        // Viewer looking straight down: flattened forward is degenerate.
        let viewer = Pose::new(
            Vec3::ZERO,
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
        );
        anchor.place_in_front_of_viewer(&viewer, 1.5, 0.0, true);
        assert_vec3_near(anchor.position(), Vec3::new(0.0, 0.0, -1.5), 1e-4);
    }

    #[test]
    fn test_place_in_front_full_orientation() {
        let mut anchor = Anchor::new();
        let orientation = Quat::from_rotation_y(1.1);
        let viewer = Pose::new(Vec3::Y, orientation);
        anchor.place_in_front_of_viewer(&viewer, 1.0, 0.0, false);

        assert!(
            anchor.orientation().dot(orientation).abs() > 1.0 - 1e-6,
            "anchor should adopt the full viewer orientation",
        );
        let expected = Vec3::Y + orientation * Vec3::NEG_Z;
        assert_vec3_near(anchor.position(), expected, 1e-5);
    }
}
