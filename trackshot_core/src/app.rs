//! The Application State - everything one frame of the demo reads and writes.
//!
//! Owns the waypoint store, the tracking controller, the overview (edit)
//! camera, the light and the interactive settings. A host drives it once per
//! frame with the elapsed time and that frame's input; a renderer then reads
//! the active camera and the scene markers back out.

use crate::camera::{CameraConfig, CameraPose, FlyCamera, Movement};
use crate::light::OrbitLight;
use crate::tracking::{TrackingConfig, TrackingController, TrackingError};
use crate::waypoint::{PathError, Waypoint, WaypointStore};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trackshot_env::{FrameClock, FrameInput, InputSource, Key};
use tracing::{debug, info, warn};

/// Speed change per frame while the speed keys are held.
pub const SPEED_STEP: f64 = 0.1;

/// Bumpiness change per frame while the bumpiness keys are held.
pub const BUMPINESS_STEP: f64 = 0.01;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for an `AppState`
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Waypoints seeded on the initial ring (default: 20)
    pub waypoint_count: usize,

    /// Ring radius in world units (default: 8.0)
    pub ring_radius: f64,

    /// Ring height (default: 0.0)
    pub ring_height: f64,

    /// Tracking speed in units per second (default: 2.5)
    pub speed: f64,

    /// Normal-map strength handed to the renderer, in [0, 1] (default: 0.5)
    pub bumpiness: f64,

    /// Minimum distance between user-added waypoints (default: 1.0)
    pub min_spacing: f64,

    /// Viewport aspect ratio (default: 800 / 600)
    pub aspect: f64,

    /// Perspective clip planes (default: 0.1 .. 100.0)
    pub near: f64,
    pub far: f64,

    pub tracking: TrackingConfig,
    pub camera: CameraConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            waypoint_count: 20,
            ring_radius: 8.0,
            ring_height: 0.0,
            speed: 2.5,
            bumpiness: 0.5,
            min_spacing: WaypointStore::MIN_SPACING,
            aspect: 800.0 / 600.0,
            near: 0.1,
            far: 100.0,
            tracking: TrackingConfig::default(),
            camera: CameraConfig::overview(),
        }
    }
}

// ============================================================================
// MODE & INPUT
// ============================================================================

/// Which camera the renderer looks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// The user-controlled overview camera; the tracking camera is drawn
    Edit,

    /// Looking through the tracking camera
    Tracking,
}

/// Turns absolute cursor positions into per-event offsets.
///
/// The first sample only records the position, so a cursor that starts far
/// from the window centre does not jerk the camera.
#[derive(Debug, Clone, Copy, Default)]
pub struct MouseTracker {
    last: Option<(f64, f64)>,
}

impl MouseTracker {
    /// Returns `(dx, dy)` with `dy` positive when the cursor moves up.
    pub fn offset(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
        let previous = self.last.replace((x, y));
        previous.map(|(last_x, last_y)| (x - last_x, last_y - y))
    }
}

// ============================================================================
// FRAME REPORT
// ============================================================================

/// What happened in one frame, for logging and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time: f64,
    pub elapsed: f64,
    pub mode: ViewMode,
    pub tracking_pose: CameraPose,
    pub segment: Option<usize>,
    pub local_parameter: Option<f64>,
    pub laps: u64,
    pub waypoint_count: usize,
    pub speed: f64,
    pub added_waypoint: Option<usize>,
}

// ============================================================================
// APP STATE
// ============================================================================

/// All mutable state of the tracking-shot demo.
#[derive(Debug, Clone)]
pub struct AppState {
    config: AppConfig,
    store: WaypointStore,
    controller: TrackingController,
    camera: FlyCamera,
    light: OrbitLight,
    mode: ViewMode,
    speed: f64,
    bumpiness: f64,
    mouse: MouseTracker,
    should_quit: bool,
    frame_count: u64,
    last_added: Option<usize>,
    rejected_waypoints: u64,
    /// Whether the short-path notice has been logged since tracking last stopped
    waiting_logged: bool,
}

impl AppState {
    /// Seeds the waypoint ring, parks the tracking camera on the first
    /// waypoint and starts tracking if the ring is large enough.
    pub fn new(config: AppConfig) -> Self {
        let store = WaypointStore::ring(config.waypoint_count, config.ring_radius, config.ring_height);
        Self::with_store(config, store)
    }

    /// Like `new`, but with a caller-supplied path.
    pub fn with_store(config: AppConfig, store: WaypointStore) -> Self {
        let mut controller = TrackingController::new(config.tracking.clone());
        if let Some(first) = store.get(0) {
            controller.set_pose(CameraPose::new(first.position, first.rotation));
        }

        let mut state = Self {
            camera: FlyCamera::new(config.camera.clone()),
            light: OrbitLight::default(),
            mode: ViewMode::Edit,
            speed: config.speed.max(0.0),
            bumpiness: config.bumpiness.clamp(0.0, 1.0),
            mouse: MouseTracker::default(),
            should_quit: false,
            frame_count: 0,
            last_added: None,
            rejected_waypoints: 0,
            waiting_logged: false,
            store,
            controller,
            config,
        };

        state.ensure_tracking();
        state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn controller(&self) -> &TrackingController {
        &self.controller
    }

    /// The overview (edit) camera.
    pub fn camera(&self) -> &FlyCamera {
        &self.camera
    }

    pub fn light(&self) -> &OrbitLight {
        &self.light
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn bumpiness(&self) -> f64 {
        self.bumpiness
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Add-waypoint requests refused by the spacing guard.
    pub fn rejected_waypoints(&self) -> u64 {
        self.rejected_waypoints
    }

    /// Pose of the autonomous tracking camera.
    pub fn tracking_pose(&self) -> CameraPose {
        self.controller.pose()
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.mode != mode {
            info!("View mode: {:?}", mode);
            self.mode = mode;
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
    }

    /// Records the edit camera's current pose as a new waypoint, unless
    /// one already lies within `min_spacing`.
    pub fn add_waypoint(&mut self) -> Result<usize, PathError> {
        let pose = self.camera.pose();
        let index = self
            .store
            .push_spaced(Waypoint::new(pose.position, pose.rotation), self.config.min_spacing)?;

        info!(
            "Added waypoint #{} at ({:.2}, {:.2}, {:.2})",
            index, pose.position.x, pose.position.y, pose.position.z
        );
        self.ensure_tracking();
        Ok(index)
    }

    /// Applies one frame of keyboard, cursor and scroll input.
    pub fn apply_input(&mut self, input: &FrameInput, elapsed: f64) {
        let elapsed = elapsed.max(0.0);
        self.last_added = None;

        if input.close_requested || input.is_down(Key::Escape) {
            if !self.should_quit {
                info!("Quit requested");
            }
            self.should_quit = true;
        }

        if input.is_down(Key::Space) {
            match self.add_waypoint() {
                Ok(index) => self.last_added = Some(index),
                // Holding the key repeats the request every frame
                Err(e) => {
                    self.rejected_waypoints += 1;
                    debug!("{}", e);
                }
            }
        }

        if input.is_down(Key::Num1) {
            self.set_mode(ViewMode::Edit);
        } else if input.is_down(Key::Num2) {
            self.set_mode(ViewMode::Tracking);
        }

        if input.is_down(Key::PageUp) {
            self.bumpiness = (self.bumpiness + BUMPINESS_STEP).min(1.0);
        } else if input.is_down(Key::PageDown) {
            self.bumpiness = (self.bumpiness - BUMPINESS_STEP).max(0.0);
        }

        if input.is_down(Key::KeypadAdd) {
            self.set_speed(self.speed + SPEED_STEP);
        } else if input.is_down(Key::KeypadSubtract) {
            self.set_speed(self.speed - SPEED_STEP);
        }

        for (key, movement) in [
            (Key::W, Movement::Forward),
            (Key::S, Movement::Backward),
            (Key::A, Movement::Left),
            (Key::D, Movement::Right),
        ] {
            if input.is_down(key) {
                self.camera.process_movement(movement, elapsed);
            }
        }

        if let Some((x, y)) = input.cursor {
            if let Some((dx, dy)) = self.mouse.offset(x, y) {
                self.camera.process_mouse(dx, dy);
            }
        }

        if input.scroll != 0.0 {
            self.camera.process_scroll(input.scroll);
        }
    }

    /// Advances the tracking camera and the light.
    ///
    /// `time` is the absolute clock reading in seconds and drives the light
    /// orbit.
    pub fn update(&mut self, elapsed: f64, time: f64) {
        self.ensure_tracking();

        if self.controller.is_tracking() {
            if let Err(e) = self.controller.advance(&self.store, elapsed.max(0.0), self.speed) {
                warn!("Tracking step failed: {}", e);
            }
        }

        self.light.update(time, self.speed);
    }

    /// Runs one complete frame: tick, poll, apply input, update.
    pub fn frame<C, I>(&mut self, clock: &mut C, input: &mut I) -> FrameReport
    where
        C: FrameClock + ?Sized,
        I: InputSource + ?Sized,
    {
        let elapsed = clock.tick();
        let now: Duration = clock.now();
        let frame_input = input.poll(now);

        self.apply_input(&frame_input, elapsed);
        self.update(elapsed, now.as_secs_f64());
        self.frame_count += 1;

        self.report(now.as_secs_f64(), elapsed)
    }

    /// The pose of whichever camera the renderer should use.
    pub fn active_pose(&self) -> CameraPose {
        match self.mode {
            ViewMode::Edit => self.camera.pose(),
            ViewMode::Tracking => self.tracking_pose(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f64> {
        self.active_pose().view_matrix()
    }

    /// Perspective projection for the active camera. The tracking camera
    /// keeps the default field of view.
    pub fn projection(&self) -> Matrix4<f64> {
        let fov = match self.mode {
            ViewMode::Edit => self.camera.zoom(),
            ViewMode::Tracking => crate::camera::MAX_ZOOM_DEG,
        };
        Matrix4::new_perspective(self.config.aspect, fov.to_radians(), self.config.near, self.config.far)
    }

    pub fn light_space_matrix(&self) -> Matrix4<f64> {
        self.light.light_space_matrix()
    }

    fn ensure_tracking(&mut self) {
        if self.controller.is_tracking() {
            return;
        }

        if !self.store.is_trackable() {
            let missing = WaypointStore::MIN_WAYPOINTS - self.store.len();
            if self.waiting_logged {
                debug!("Tracking still waits for {} more waypoint(s)", missing);
            } else {
                info!(
                    "Tracking waits for {} more waypoint(s): {} of {} placed",
                    missing,
                    self.store.len(),
                    WaypointStore::MIN_WAYPOINTS
                );
                self.waiting_logged = true;
            }
            return;
        }

        // Start from the first waypoint so the first segment has no jump
        let Some(first) = self.store.get(0).copied() else {
            return;
        };
        self.controller.set_pose(CameraPose::new(first.position, first.rotation));

        match self.controller.start(&self.store, first.position) {
            Ok(()) => self.waiting_logged = false,
            Err(TrackingError::Path(e)) => debug!("Tracking not started: {}", e),
            Err(e) => warn!("Tracking not started: {}", e),
        }
    }

    fn report(&self, time: f64, elapsed: f64) -> FrameReport {
        let state = self.controller.state();
        FrameReport {
            frame: self.frame_count,
            time,
            elapsed,
            mode: self.mode,
            tracking_pose: self.tracking_pose(),
            segment: state.map(|s| s.segment_index),
            local_parameter: state.map(|s| s.local_parameter),
            laps: self.controller.laps(),
            waypoint_count: self.store.len(),
            speed: self.speed,
            added_waypoint: self.last_added,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingPhase;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use trackshot_env::NullInput;

    /// Fixed-step clock for driving frames in tests.
    struct StepClock {
        now: Duration,
        dt: Duration,
    }

    impl FrameClock for StepClock {
        fn now(&self) -> Duration {
            self.now
        }

        fn tick(&mut self) -> f64 {
            self.now += self.dt;
            self.dt.as_secs_f64()
        }
    }

    fn step_clock() -> StepClock {
        StepClock {
            now: Duration::ZERO,
            dt: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_new_starts_tracking_on_ring() {
        let app = AppState::default();
        assert_eq!(app.store().len(), 20);
        assert!(app.controller().is_tracking());
        assert_eq!(app.mode(), ViewMode::Edit);
        assert_relative_eq!(app.tracking_pose().position, Vector3::new(8.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_small_ring_waits_for_waypoints() {
        let config = AppConfig {
            waypoint_count: 3,
            ..AppConfig::default()
        };
        let mut app = AppState::new(config);
        assert_eq!(app.controller().phase(), TrackingPhase::Uninitialized);
        assert!(app.waiting_logged);

        // Updating without enough waypoints is a no-op, not a failure
        app.update(0.1, 0.1);
        assert!(!app.controller().is_tracking());
        assert!(app.waiting_logged);

        // The overview camera sits well away from the ring
        app.add_waypoint().unwrap();
        assert!(app.controller().is_tracking());
        assert!(!app.waiting_logged);
    }

    #[test]
    fn test_mode_keys() {
        let mut app = AppState::default();
        app.apply_input(&FrameInput::with_keys(&[Key::Num2]), 0.01);
        assert_eq!(app.mode(), ViewMode::Tracking);
        assert_eq!(app.active_pose(), app.tracking_pose());

        app.apply_input(&FrameInput::with_keys(&[Key::Num1]), 0.01);
        assert_eq!(app.mode(), ViewMode::Edit);
        assert_eq!(app.active_pose(), app.camera().pose());
    }

    #[test]
    fn test_speed_keys() {
        let mut app = AppState::default();
        app.apply_input(&FrameInput::with_keys(&[Key::KeypadAdd]), 0.01);
        assert_relative_eq!(app.speed(), 2.6, epsilon = 1e-12);

        for _ in 0..100 {
            app.apply_input(&FrameInput::with_keys(&[Key::KeypadSubtract]), 0.01);
        }
        assert_eq!(app.speed(), 0.0);
    }

    #[test]
    fn test_bumpiness_is_clamped() {
        let mut app = AppState::default();
        for _ in 0..80 {
            app.apply_input(&FrameInput::with_keys(&[Key::PageUp]), 0.01);
        }
        assert_eq!(app.bumpiness(), 1.0);

        for _ in 0..150 {
            app.apply_input(&FrameInput::with_keys(&[Key::PageDown]), 0.01);
        }
        assert_eq!(app.bumpiness(), 0.0);
    }

    #[test]
    fn test_add_waypoint_guard() {
        let mut app = AppState::default();

        app.apply_input(&FrameInput::with_keys(&[Key::Space]), 0.01);
        assert_eq!(app.store().len(), 21);
        assert_eq!(app.report(0.0, 0.0).added_waypoint, Some(20));

        // Same camera position: rejected
        app.apply_input(&FrameInput::with_keys(&[Key::Space]), 0.01);
        assert_eq!(app.store().len(), 21);
        assert_eq!(app.rejected_waypoints(), 1);

        // Fly more than one unit forward and try again
        app.apply_input(&FrameInput::with_keys(&[Key::W]), 1.0);
        app.apply_input(&FrameInput::with_keys(&[Key::Space]), 0.01);
        assert_eq!(app.store().len(), 22);
    }

    #[test]
    fn test_first_mouse_sample_only_primes() {
        let mut app = AppState::new(AppConfig {
            camera: CameraConfig::default(),
            ..AppConfig::default()
        });
        let yaw = app.camera().yaw();

        let mut input = FrameInput::idle();
        input.cursor = Some((700.0, 20.0));
        app.apply_input(&input, 0.01);
        assert_eq!(app.camera().yaw(), yaw);

        input.cursor = Some((710.0, 10.0));
        app.apply_input(&input, 0.01);
        assert_relative_eq!(app.camera().yaw(), yaw + 1.0, epsilon = 1e-12);
        assert_relative_eq!(app.camera().pitch(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mouse_tracker_offsets() {
        let mut mouse = MouseTracker::default();
        assert_eq!(mouse.offset(400.0, 300.0), None);
        assert_eq!(mouse.offset(410.0, 290.0), Some((10.0, 10.0)));
    }

    #[test]
    fn test_scroll_zooms_edit_camera() {
        let mut app = AppState::default();
        let mut input = FrameInput::idle();
        input.scroll = 5.0;
        app.apply_input(&input, 0.01);
        assert_relative_eq!(app.camera().zoom(), 40.0);
    }

    #[test]
    fn test_quit_requests() {
        let mut app = AppState::default();
        app.apply_input(&FrameInput::idle(), 0.01);
        assert!(!app.should_quit());

        app.apply_input(&FrameInput::with_keys(&[Key::Escape]), 0.01);
        assert!(app.should_quit());

        let mut app = AppState::default();
        let mut input = FrameInput::idle();
        input.close_requested = true;
        app.apply_input(&input, 0.01);
        assert!(app.should_quit());
    }

    #[test]
    fn test_frame_advances_tracking_and_light() {
        let mut app = AppState::default();
        let mut clock = step_clock();
        let mut input = NullInput;

        let start = app.tracking_pose().position;
        let mut report = app.frame(&mut clock, &mut input);
        for _ in 0..99 {
            report = app.frame(&mut clock, &mut input);
        }

        assert_eq!(report.frame, 100);
        assert_relative_eq!(report.time, 1.0, epsilon = 1e-9);
        assert_eq!(report.waypoint_count, 20);
        assert!(report.local_parameter.is_some());
        assert!((app.tracking_pose().position - start).norm() > 1.0);
        assert_relative_eq!(app.light().position.norm(), (200.0f64).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_projection_uses_active_camera_zoom() {
        let mut app = AppState::default();
        let mut input = FrameInput::idle();
        input.scroll = 20.0;
        app.apply_input(&input, 0.01);
        let edit = app.projection();

        app.set_mode(ViewMode::Tracking);
        let tracking = app.projection();

        // m[(1,1)] = 1 / tan(fov / 2): narrower field of view, larger value
        assert!(edit[(1, 1)] > tracking[(1, 1)]);
    }
}
