//! Rerun visualization for tracking-shot runs.
//!
//! Visualization is optional and only available with the `visualization`
//! feature. Without it every method is a no-op.
//!
//! # What Gets Logged
//!
//! - Waypoints as yellow points
//! - The sampled spline path as a closed line strip
//! - The tracking camera as a point plus a forward arrow
//! - Local parameter and speed as scalar timelines

#[cfg(feature = "visualization")]
use rerun::{Arrows3D, Color, LineStrips3D, Points3D, Position3D, Radius, RecordingStream};

use crate::runner::ScenarioTrace;
use trackshot_core::{spline, CameraPose, WaypointStore};

/// Samples per segment when drawing the path.
pub const PATH_SAMPLES_PER_SEGMENT: usize = 16;

/// Rerun logger for simulation visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to see the run");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replays a whole run: path once, then the camera frame by frame.
    pub fn log_trace(&self, trace: &ScenarioTrace) {
        if !self.enabled {
            return;
        }

        self.set_time(0.0);
        self.log_waypoints(&trace.store);
        self.log_path(&trace.store, trace.alpha);

        for report in &trace.frames {
            self.set_time(report.time);
            self.log_camera(&report.tracking_pose);
            self.log_scalar("metrics/speed", report.speed);
            if let Some(t) = report.local_parameter {
                self.log_scalar("metrics/local_parameter", t);
            }
            if let Some(index) = report.added_waypoint {
                self.log_event("events", &format!("waypoint #{} added", index));
            }
        }
    }

    /// Sets the simulation time for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_time(&self, seconds: f64) {
        if let Some(ref rec) = self.rec {
            rec.set_time_seconds("sim_time", seconds);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_time(&self, _seconds: f64) {}

    /// Logs the waypoint positions.
    #[cfg(feature = "visualization")]
    pub fn log_waypoints(&self, store: &WaypointStore) {
        if let Some(ref rec) = self.rec {
            let points: Vec<Position3D> = store
                .iter()
                .map(|w| Position3D::new(w.position.x as f32, w.position.y as f32, w.position.z as f32))
                .collect();

            let _ = rec.log(
                "world/waypoints",
                &Points3D::new(points)
                    .with_colors([Color::from_rgb(255, 220, 0)])
                    .with_radii([Radius::new_scene_units(0.25)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_waypoints(&self, _store: &WaypointStore) {}

    /// Logs the closed spline through the waypoints.
    #[cfg(feature = "visualization")]
    pub fn log_path(&self, store: &WaypointStore, alpha: f64) {
        if let Some(ref rec) = self.rec {
            let points = path_points(store, alpha);
            let strip: Vec<[f32; 3]> = points.iter().map(|p| [p.x as f32, p.y as f32, p.z as f32]).collect();

            let _ = rec.log(
                "world/path",
                &LineStrips3D::new([strip]).with_colors([Color::from_rgb(120, 120, 255)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_path(&self, _store: &WaypointStore, _alpha: f64) {}

    /// Logs the tracking camera.
    #[cfg(feature = "visualization")]
    pub fn log_camera(&self, pose: &CameraPose) {
        if let Some(ref rec) = self.rec {
            let p = pose.position;
            let f = pose.forward();
            let origin = [p.x as f32, p.y as f32, p.z as f32];

            let _ = rec.log(
                "world/camera",
                &Points3D::new([origin])
                    .with_colors([Color::from_rgb(255, 80, 80)])
                    .with_radii([Radius::new_scene_units(0.3)]),
            );
            let _ = rec.log(
                "world/camera/forward",
                &Arrows3D::from_vectors([[f.x as f32, f.y as f32, f.z as f32]])
                    .with_origins([origin])
                    .with_colors([Color::from_rgb(255, 80, 80)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_camera(&self, _pose: &CameraPose) {}

    /// Logs a text annotation (e.g., waypoint added).
    #[cfg(feature = "visualization")]
    pub fn log_event(&self, path: &str, message: &str) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::TextLog::new(message));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_event(&self, _path: &str, _message: &str) {}

    /// Logs a scalar metric.
    #[cfg(feature = "visualization")]
    pub fn log_scalar(&self, path: &str, value: f64) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::Scalar::new(value));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_scalar(&self, _path: &str, _value: f64) {}
}

/// Points along the closed spline, segment after segment. Degenerate
/// segments contribute nothing.
pub fn path_points(store: &WaypointStore, alpha: f64) -> Vec<nalgebra::Vector3<f64>> {
    let mut points = Vec::new();
    if !store.is_trackable() {
        return points;
    }

    for segment in 0..store.len() {
        let Ok(neighbors) = store.neighbor_set(segment) else {
            continue;
        };
        if let Ok(samples) = spline::sample_segment(alpha, &neighbors.positions(), PATH_SAMPLES_PER_SEGMENT) {
            points.extend(samples);
        }
    }
    points
}
