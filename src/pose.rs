//! Pose and ray primitives plus the per-frame pose lookup capability.
//!
//! `FramePoses` abstracts "where is this input source right now" so the
//! router can be driven by a live XR runtime, a replay fixture, or a
//! synthetic test harness. A missing pose is a normal transient
//! tracking condition, not an error.

use glam::{Quat, Vec3};

// ── Input source identity ──────────────────────────────────

/// Stable identity for a tracked controller or hand.
///
/// Valid for the lifetime of one session attachment; a re-attached
/// session may hand out fresh ids for the same physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputSourceId(pub u64);

// ── Poses and rays ─────────────────────────────────────────

/// A rigid pose: position in meters plus orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Forward direction of this pose (-Z in pose space).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A pointing ray used for selection casts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, normalizing `direction`. A degenerate direction
    /// falls back to -Z so a malformed pose can never produce NaNs
    /// downstream.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }

    /// Pointing ray of a target-ray pose: origin at the pose, -Z forward.
    pub fn from_pose(pose: &Pose) -> Self {
        Self::new(pose.position, pose.forward())
    }

    /// Point at parametric distance `t` along the ray.
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// ── Frame pose lookup ──────────────────────────────────────

/// Per-frame pose lookup, implemented by the host runtime.
///
/// Every accessor returns `None` when the pose cannot be resolved this
/// frame (tracking loss, missing grip space, no reference space); the
/// caller skips that source for the frame and tries again on the next.
pub trait FramePoses {
    /// Grip pose of a source this frame, if tracked.
    fn grip_pose(&self, source: InputSourceId) -> Option<Pose>;

    /// Pointing ray of a source this frame, if tracked.
    fn target_ray(&self, source: InputSourceId) -> Option<Ray>;

    /// Viewer (head) pose this frame, if available.
    fn viewer_pose(&self) -> Option<Pose>;
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_pose_forward() {
        let fwd = Pose::IDENTITY.forward();
        assert!((fwd - Vec3::NEG_Z).length() < 1e-6, "expected -Z, got {fwd}");
    }

    #[test]
    fn test_rotated_pose_forward() {
        // Yaw 90 degrees: -Z turns to -X.
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let fwd = pose.forward();
        assert!((fwd - Vec3::NEG_X).length() < 1e-5, "expected -X, got {fwd}");
    }

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0));
        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
        assert!((ray.point_at(2.0) - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-6);
    }

    #[test]
    fn test_ray_degenerate_direction_falls_back() {
        let ray = Ray::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(ray.direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_ray_from_pose() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY);
        let ray = Ray::from_pose(&pose);
        assert_eq!(ray.origin, pose.position);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);
    }
}
