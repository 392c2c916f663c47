//! Two-handed combined scale/translate/rotate of the anchor.
//!
//! Engages only while exactly two sources are mid-gesture with drag
//! permitted on both. The per-frame solve produces all three components
//! of the new transform at once so the router can apply them as a
//! single write, avoiding visible jitter from interleaved partial
//! updates.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::anchor::AnchorTransform;

// ── Config ─────────────────────────────────────────────────

/// Bounds for two-handed resizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BimanualConfig {
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for BimanualConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.25,
            max_scale: 0.7,
        }
    }
}

// ── Baseline ───────────────────────────────────────────────

/// Pair state captured on the first qualifying frame of a two-hand
/// gesture. Discarded the moment the pair disqualifies; re-engaging
/// captures a fresh baseline rather than reusing a stale one.
#[derive(Debug, Clone)]
pub struct BimanualBaseline {
    start_grips: [Vec3; 2],
    start_anchor: AnchorTransform,
    start_yaw: f32,
}

impl BimanualBaseline {
    /// Capture the baseline at this instant. `grips` must keep a stable
    /// hand order across the gesture (the router sorts by source id).
    pub fn capture(grips: [Vec3; 2], anchor: AnchorTransform) -> Self {
        Self {
            start_grips: grips,
            start_anchor: anchor,
            start_yaw: inter_hand_yaw(grips[0], grips[1]),
        }
    }

    /// Solve the combined transform for the current grip positions.
    ///
    /// Scale follows the inter-hand distance ratio, clamped and applied
    /// uniformly; translation follows the midpoint of the two hands;
    /// rotation is yaw-only, the change in the horizontal inter-hand
    /// angle applied on top of the captured start orientation.
    pub fn solve(&self, grips: [Vec3; 2], config: &BimanualConfig) -> AnchorTransform {
        let start_dist = self.start_grips[0].distance(self.start_grips[1]);
        let dist = grips[0].distance(grips[1]);
        let ratio = if start_dist > f32::EPSILON {
            dist / start_dist
        } else {
            1.0
        };
        let scale = (self.start_anchor.scale.x * ratio).clamp(config.min_scale, config.max_scale);

        let start_mid = (self.start_grips[0] + self.start_grips[1]) * 0.5;
        let mid = (grips[0] + grips[1]) * 0.5;
        let position = self.start_anchor.position + (mid - start_mid);

        let mut delta_yaw = inter_hand_yaw(grips[0], grips[1]) - self.start_yaw;
        // Wrap so a pair crossing the atan2 seam keeps turning the short way.
        delta_yaw = (delta_yaw + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU)
            - std::f32::consts::PI;
        let orientation = Quat::from_rotation_y(delta_yaw) * self.start_anchor.orientation;

        AnchorTransform {
            position,
            orientation,
            scale: Vec3::splat(scale),
        }
    }

}

/// Yaw of the horizontal vector from `a` to `b`; zero along +Z.
fn inter_hand_yaw(a: Vec3, b: Vec3) -> f32 {
    let v = b - a;
    v.x.atan2(v.z)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(grips: [Vec3; 2], scale: f32) -> BimanualBaseline {
        BimanualBaseline::capture(
            grips,
            AnchorTransform {
                scale: Vec3::splat(scale),
                ..AnchorTransform::default()
            },
        )
    }

    #[test]
    fn test_scale_follows_distance_ratio_with_clamp() {
        // Hands 0.3m apart at capture, anchor scale 0.4.
        let b = baseline([Vec3::new(-0.15, 0.0, 0.0), Vec3::new(0.15, 0.0, 0.0)], 0.4);

        // Doubling the distance asks for 0.8, clamped to 0.7.
        let t = b.solve(
            [Vec3::new(-0.3, 0.0, 0.0), Vec3::new(0.3, 0.0, 0.0)],
            &BimanualConfig::default(),
        );
        assert!((t.scale.x - 0.7).abs() < 1e-6, "expected clamp to 0.7, got {}", t.scale.x);
        assert_eq!(t.scale.x, t.scale.y);
        assert_eq!(t.scale.x, t.scale.z);

        // Halving the distance: 0.4 * 0.5 = 0.2, clamped to 0.25.
        let t = b.solve(
            [Vec3::new(-0.075, 0.0, 0.0), Vec3::new(0.075, 0.0, 0.0)],
            &BimanualConfig::default(),
        );
        assert!((t.scale.x - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_zero_start_distance_defaults_ratio() {
        let b = baseline([Vec3::ZERO, Vec3::ZERO], 0.4);
        let t = b.solve(
            [Vec3::new(-0.2, 0.0, 0.0), Vec3::new(0.2, 0.0, 0.0)],
            &BimanualConfig::default(),
        );
        assert!((t.scale.x - 0.4).abs() < 1e-6, "ratio defaults to 1");
    }

    #[test]
    fn test_translation_follows_midpoint() {
        let b = baseline([Vec3::new(-0.1, 1.0, 0.0), Vec3::new(0.1, 1.0, 0.0)], 0.4);
        let t = b.solve(
            [Vec3::new(0.1, 1.2, -0.3), Vec3::new(0.3, 1.2, -0.3)],
            &BimanualConfig::default(),
        );
        // Midpoint moved by (0.2, 0.2, -0.3).
        assert!((t.position - Vec3::new(0.2, 0.2, -0.3)).length() < 1e-5);
    }

    #[test]
    fn test_yaw_delta_applied_over_start_orientation() {
        let start_orientation = Quat::from_rotation_y(0.4);
        let b = BimanualBaseline::capture(
            // Inter-hand vector along +Z: start yaw 0.
            [Vec3::ZERO, Vec3::new(0.0, 0.0, 0.3)],
            AnchorTransform {
                orientation: start_orientation,
                scale: Vec3::splat(0.4),
                ..AnchorTransform::default()
            },
        );

        // Rotate the pair so the inter-hand vector yaws to 30 degrees.
        let deg30 = 30f32.to_radians();
        let t = b.solve(
            [Vec3::ZERO, Vec3::new(0.3 * deg30.sin(), 0.0, 0.3 * deg30.cos())],
            &BimanualConfig::default(),
        );
        let expected = Quat::from_rotation_y(deg30) * start_orientation;
        assert!(
            t.orientation.dot(expected).abs() > 1.0 - 1e-5,
            "expected 30 degree yaw over the start orientation",
        );
    }

    #[test]
    fn test_yaw_wraps_across_seam() {
        // Start just short of the +/-180 degree seam.
        let yaw0 = 178f32.to_radians();
        let b = baseline(
            [Vec3::ZERO, Vec3::new(0.3 * yaw0.sin(), 0.0, 0.3 * yaw0.cos())],
            0.4,
        );
        // Cross the seam by 4 degrees: the delta must be +4, not -356.
        let yaw1 = -178f32.to_radians();
        let t = b.solve(
            [Vec3::ZERO, Vec3::new(0.3 * yaw1.sin(), 0.0, 0.3 * yaw1.cos())],
            &BimanualConfig::default(),
        );
        let expected = Quat::from_rotation_y(4f32.to_radians());
        assert!(
            t.orientation.dot(expected).abs() > 1.0 - 1e-4,
            "expected a short-way 4 degree turn",
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = BimanualConfig::default();
        assert!((config.min_scale - 0.25).abs() < f32::EPSILON);
        assert!((config.max_scale - 0.7).abs() < f32::EPSILON);
    }
}
