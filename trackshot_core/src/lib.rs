//! TrackShot Core - Waypoint Tracking-Shot Camera Engine
//!
//! This library moves a virtual camera smoothly and endlessly around a loop
//! of recorded poses:
//! 1. **Position**: centripetal Catmull-Rom through the waypoint positions
//!    (no cusps, no overshoot loops on uneven spacing)
//! 2. **Orientation**: SQUAD through the waypoint rotations, so the turn rate
//!    stays continuous across waypoints
//! 3. **Pacing**: one progress parameter per segment, normalized by the
//!    distance to the next waypoint, so both curves stay in lockstep
//!
//! Around the engine sit the interactive pieces of the demo: a free-flying
//! edit camera, an orbiting light and a render-agnostic scene description,
//! all owned by [`AppState`].

pub mod waypoint;
pub mod spline;
pub mod orientation;
pub mod tracking;
pub mod camera;
pub mod light;
pub mod scene;
pub mod app;

// Re-export key types for convenience
pub use waypoint::{NeighborSet, PathError, Waypoint, WaypointStore};
pub use spline::{catmull_rom, SplineError, CENTRIPETAL_ALPHA};
pub use tracking::{TrackingConfig, TrackingController, TrackingError, TrackingPhase, TrackingState};
pub use camera::{CameraConfig, CameraPose, FlyCamera, Movement};
pub use light::OrbitLight;
pub use scene::{MarkerKind, RenderPass, SceneMarker};
pub use app::{AppConfig, AppState, FrameReport, ViewMode};
