//! XR interaction core for the Corpus anatomy explorer.
//!
//! Disambiguates controller and hand gestures inside an XR session
//! (tap to select, drag to move, two-handed scale/translate/rotate)
//! against two competing pickable layers, UI panels and anatomical
//! content, while a frame-time governor retunes render quality from
//! observed frame durations.
//!
//! Provides:
//! - [`router::InputRouter`]: session lifecycle, per-frame gesture
//!   resolution, and dispatch to the host callbacks
//! - [`gesture`] / [`bimanual`]: per-source records and the two-hand
//!   combined transform solve
//! - [`hit`]: layered ray hit-testing, UI first, content by delegation
//! - [`anchor`]: anchor transform capture/restore/placement
//! - [`perf::PerfMonitor`]: frame-time-driven quality tier governor
//! - [`pose::FramePoses`]: pose lookup capability implemented by the
//!   host runtime (or a replay/test fixture)
//!
//! The scene graph, renderer, session bootstrap, and UI shell are
//! external collaborators; nothing in this crate touches a GPU or an
//! XR loader. The whole layer is single-threaded and frame-driven: one
//! `update` per presentation frame, event callbacks applied between
//! frames as plain record mutations.

pub mod anchor;
pub mod bimanual;
pub mod gesture;
pub mod hit;
pub mod perf;
pub mod pose;
pub mod router;

pub use anchor::{Anchor, AnchorTransform};
pub use bimanual::{BimanualBaseline, BimanualConfig};
pub use gesture::{GestureConfig, GestureRecord};
pub use hit::{HitTester, PickShape, UiHit, UiPickable, UiPickableSet};
pub use perf::{PerfConfig, PerfMonitor, PerfReading, QualityTier};
pub use pose::{FramePoses, InputSourceId, Pose, Ray};
pub use router::{InputRouter, InteractionConfig};
