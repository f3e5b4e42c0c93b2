//! The Tracking Controller - drives a camera around the waypoint loop.
//!
//! Each frame the local segment parameter advances by
//! `elapsed · speed / segment_speed_scale`, where the scale is the distance
//! from the camera to the segment's end waypoint measured when the segment
//! began. Crossing `t = 1` moves on to the next segment (wrapping at the end
//! of the store), and the pose is re-evaluated from the segment's four
//! neighbours: Catmull-Rom for position, SQUAD for rotation.
//!
//! The controller keeps only indices into the store and re-fetches the
//! neighbour set every frame, so waypoints appended mid-run are picked up
//! without invalidating anything.

use crate::camera::CameraPose;
use crate::orientation;
use crate::spline::{self, SplineError, CENTRIPETAL_ALPHA};
use crate::waypoint::{NeighborSet, PathError, WaypointStore};
use nalgebra::Vector3;
use tracing::{debug, info, warn};

/// Floor for the per-segment distance scale, so a camera sitting exactly on
/// the next waypoint never divides by zero.
pub const MIN_SPEED_SCALE: f64 = 1e-6;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the TrackingController
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Knot parametrization exponent (default: 0.5, centripetal)
    pub alpha: f64,

    /// Carry the fractional overshoot into the next segment (default: true).
    ///
    /// When false the parameter restarts at exactly 0, which leaves a small
    /// hitch at every waypoint.
    pub carry_remainder: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            alpha: CENTRIPETAL_ALPHA,
            carry_remainder: true,
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

/// Per-segment progress of a running tracking shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingState {
    /// Index of the waypoint the current segment starts at
    pub segment_index: usize,

    /// Progress through the segment; conceptually [0, 1), transiently ≥ 1
    pub local_parameter: f64,

    /// Distance estimate used to normalize traversal rate
    pub segment_speed_scale: f64,
}

/// Coarse lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingPhase {
    /// No valid segment yet (fewer than four waypoints, or never started)
    Uninitialized,

    /// Travelling along `segment_index` at `local_parameter`
    Tracking { segment_index: usize, local_parameter: f64 },
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Stateful driver that advances a camera through a `WaypointStore`.
#[derive(Debug, Clone)]
pub struct TrackingController {
    config: TrackingConfig,
    state: Option<TrackingState>,
    pose: CameraPose,
    laps: u64,
    segments_completed: u64,
    /// Set when the current segment was skipped; its rollover carries nothing
    skipped: bool,
}

impl TrackingController {
    /// Create a new controller with the given configuration.
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            state: None,
            pose: CameraPose::default(),
            laps: 0,
            segments_completed: 0,
            skipped: false,
        }
    }

    /// Create a controller with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TrackingConfig::default())
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_some()
    }

    /// Current progress, if tracking has started.
    pub fn state(&self) -> Option<&TrackingState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> TrackingPhase {
        match self.state {
            Some(s) => TrackingPhase::Tracking {
                segment_index: s.segment_index,
                local_parameter: s.local_parameter,
            },
            None => TrackingPhase::Uninitialized,
        }
    }

    /// The camera pose produced by the last `advance`.
    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Places the camera, e.g. on the first waypoint before starting.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = pose;
    }

    /// Completed laps (wraps from the last segment back to segment 0).
    pub fn laps(&self) -> u64 {
        self.laps
    }

    /// Total segments finished since start.
    pub fn segments_completed(&self) -> u64 {
        self.segments_completed
    }

    /// Starts tracking at segment 0 from `camera_position`.
    ///
    /// # Errors
    /// `PathError::NotEnoughWaypoints` when the store has fewer than four
    /// waypoints; the controller stays `Uninitialized`.
    pub fn start(&mut self, store: &WaypointStore, camera_position: Vector3<f64>) -> Result<(), TrackingError> {
        let neighbors = store.neighbor_set(0)?;
        let scale = speed_scale(&camera_position, &neighbors.target().position);

        self.pose.position = camera_position;
        self.state = Some(TrackingState {
            segment_index: 0,
            local_parameter: 0.0,
            segment_speed_scale: scale,
        });
        self.laps = 0;
        self.segments_completed = 0;
        self.skipped = false;

        info!(
            "Tracking started: {} waypoints, first segment scale {:.3}",
            store.len(),
            scale
        );
        Ok(())
    }

    /// Returns the controller to `Uninitialized`. The last pose is kept.
    pub fn stop(&mut self) {
        self.state = None;
    }

    /// Advances by `elapsed` seconds at `speed` units per second and returns
    /// the new camera pose.
    ///
    /// At most one segment boundary is crossed per call; the overshoot is
    /// carried (or dropped, per `carry_remainder`).
    ///
    /// # Errors
    /// `TrackingError::NotStarted` before `start`, or a `PathError` if the
    /// store no longer holds enough waypoints.
    pub fn advance(&mut self, store: &WaypointStore, elapsed: f64, speed: f64) -> Result<CameraPose, TrackingError> {
        let Some(mut state) = self.state else {
            return Err(TrackingError::NotStarted);
        };

        let step = elapsed.max(0.0) * speed / state.segment_speed_scale;
        state.local_parameter = (state.local_parameter + step).max(0.0);

        let mut neighbors = store.neighbor_set(state.segment_index)?;

        if state.local_parameter >= 1.0 {
            let n = store.len();
            state.segment_index = (state.segment_index + 1) % n;
            self.segments_completed += 1;
            if state.segment_index == 0 {
                self.laps += 1;
                debug!("Lap {} complete", self.laps);
            }

            neighbors = store.neighbor_set(state.segment_index)?;
            state.segment_speed_scale = speed_scale(&self.pose.position, &neighbors.target().position);
            // Progress past a skipped segment comes from its floored scale, not from travel
            state.local_parameter = if self.config.carry_remainder && !self.skipped {
                state.local_parameter.fract()
            } else {
                0.0
            };
            self.skipped = false;

            debug!(
                "Moving to waypoint #{} (segment {} → {}), t={:.3}",
                neighbors.indices[2],
                neighbors.indices[1],
                neighbors.indices[2],
                state.local_parameter
            );
        }

        let pose = match evaluate(&neighbors, self.config.alpha, state.local_parameter) {
            Ok(pose) => pose,
            Err(e) => {
                // p1 == p2: the segment has no length, so sit on its end and roll over next frame
                warn!("Skipping segment {}: {}", state.segment_index, e);
                state.local_parameter = 1.0;
                self.skipped = true;
                let target = neighbors.target();
                CameraPose::new(target.position, target.rotation)
            }
        };

        self.state = Some(state);
        self.pose = pose;
        Ok(pose)
    }

    /// Evaluates any segment at local parameter `t` without touching the
    /// controller's progress.
    pub fn pose_at(&self, store: &WaypointStore, segment: usize, t: f64) -> Result<CameraPose, TrackingError> {
        let neighbors = store.neighbor_set(segment)?;
        Ok(evaluate(&neighbors, self.config.alpha, t)?)
    }
}

impl Default for TrackingController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn evaluate(neighbors: &NeighborSet, alpha: f64, t: f64) -> Result<CameraPose, SplineError> {
    let position = spline::catmull_rom(alpha, &neighbors.positions(), t)?;
    let rotation = orientation::interpolate(&neighbors.rotations(), t);
    Ok(CameraPose::new(position, rotation))
}

fn speed_scale(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    (to - from).norm().max(MIN_SPEED_SCALE)
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors that can occur while tracking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackingError {
    #[error("Tracking has not been started")]
    NotStarted,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Geometry(#[from] SplineError),
}

// ============================================================================
// TESTS
// ============================================================================
