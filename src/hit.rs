//! Layered ray hit-testing.
//!
//! UI pickables (panels and buttons owned by the UI layer) are tested
//! first; anatomical content picking is delegated to the host through a
//! callback and never merged into the UI result list. The two layers
//! answer different questions: UI hits drive button dispatch and
//! drag-eligibility, content hits drive structure selection.

use glam::{Quat, Vec2, Vec3};
use tracing::debug;

use crate::pose::Ray;

const MIN_HIT_DISTANCE: f32 = 1e-4;

// ── Pickable geometry ──────────────────────────────────────

/// Geometry of a single UI pickable.
#[derive(Debug, Clone, Copy)]
pub enum PickShape {
    /// Oriented rectangle: a panel or button face. `half_extents` are
    /// the local x/y half sizes; the face normal is local +Z.
    Quad {
        center: Vec3,
        orientation: Quat,
        half_extents: Vec2,
    },
    /// Sphere: grab handles and compact controls.
    Sphere { center: Vec3, radius: f32 },
}

impl PickShape {
    /// Distance along `ray` to the nearest intersection, if any.
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        match *self {
            Self::Quad {
                center,
                orientation,
                half_extents,
            } => {
                let normal = orientation * Vec3::Z;
                let denom = ray.direction.dot(normal);
                if denom.abs() < 1e-6 {
                    return None;
                }
                let t = (center - ray.origin).dot(normal) / denom;
                if t < MIN_HIT_DISTANCE {
                    return None;
                }
                let local = orientation.conjugate() * (ray.point_at(t) - center);
                if local.x.abs() <= half_extents.x && local.y.abs() <= half_extents.y {
                    Some(t)
                } else {
                    None
                }
            }
            Self::Sphere { center, radius } => {
                let oc = ray.origin - center;
                let b = oc.dot(ray.direction);
                let c = oc.length_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sqrt_disc = disc.sqrt();
                let near = -b - sqrt_disc;
                let far = -b + sqrt_disc;
                if near >= MIN_HIT_DISTANCE {
                    Some(near)
                } else if far >= MIN_HIT_DISTANCE {
                    // Ray starts inside the sphere.
                    Some(far)
                } else {
                    None
                }
            }
        }
    }
}

/// A hit-test target bound to a UI action identifier.
#[derive(Debug, Clone)]
pub struct UiPickable {
    pub shape: PickShape,
    pub action: String,
}

/// Closest UI pickable struck by a ray.
#[derive(Debug, Clone, PartialEq)]
pub struct UiHit {
    pub action: String,
    pub point: Vec3,
    pub distance: f32,
}

// ── Pickable registry ──────────────────────────────────────

/// Flat registry of UI pickables, filled by the UI layer whenever its
/// panel layout changes.
#[derive(Debug, Clone, Default)]
pub struct UiPickableSet {
    pickables: Vec<UiPickable>,
}

impl UiPickableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, shape: PickShape, action: impl Into<String>) {
        self.pickables.push(UiPickable {
            shape,
            action: action.into(),
        });
    }

    pub fn clear(&mut self) {
        if !self.pickables.is_empty() {
            debug!("cleared {} ui pickables", self.pickables.len());
        }
        self.pickables.clear();
    }

    pub fn len(&self) -> usize {
        self.pickables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickables.is_empty()
    }

    /// Closest pickable struck by `ray`, if any.
    pub fn closest_hit(&self, ray: &Ray) -> Option<UiHit> {
        let mut best: Option<(f32, &UiPickable)> = None;
        for pickable in &self.pickables {
            if let Some(t) = pickable.shape.intersect(ray) {
                if best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, pickable));
                }
            }
        }
        best.map(|(t, pickable)| UiHit {
            action: pickable.action.clone(),
            point: ray.point_at(t),
            distance: t,
        })
    }
}

// ── Two-layer tester ───────────────────────────────────────

/// Content picking callback: world-space ray in, structure id out.
pub type ContentPicker = Box<dyn FnMut(Vec3, Vec3) -> Option<String>>;

/// Bundles the UI pickable layer with the delegated content layer.
///
/// UI is always evaluated first for drag-eligibility and button
/// dispatch; content is evaluated by the host on its own geometry.
pub struct HitTester {
    pub ui: UiPickableSet,
    content: Option<ContentPicker>,
}

impl HitTester {
    pub fn new() -> Self {
        Self {
            ui: UiPickableSet::new(),
            content: None,
        }
    }

    pub fn set_content_picker(&mut self, picker: impl FnMut(Vec3, Vec3) -> Option<String> + 'static) {
        self.content = Some(Box::new(picker));
    }

    /// Closest UI pickable struck by `ray`.
    pub fn ui_hit(&self, ray: &Ray) -> Option<UiHit> {
        self.ui.closest_hit(ray)
    }

    /// Structure id under `ray`, per the host's content picker.
    pub fn pick_content(&mut self, ray: &Ray) -> Option<String> {
        self.content
            .as_mut()
            .and_then(|pick| pick(ray.origin, ray.direction))
    }

    /// Whether a select beginning on this ray must not move the anchor:
    /// a press that begins on a button or on a structure is a tap
    /// candidate, never a drag.
    pub fn blocks_drag(&mut self, ray: &Ray) -> bool {
        self.ui_hit(ray).is_some() || self.pick_content(ray).is_some()
    }
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────
