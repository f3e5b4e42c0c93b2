//! JSON exporter for offline inspection.
//!
//! Exports scenario frames as JSON so a run can be plotted or replayed
//! without rerunning the simulation.

use crate::runner::{ScenarioResult, ScenarioTrace};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use trackshot_core::{FrameReport, ViewMode};

/// Errors from writing an export.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single frame of simulation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub frame: u64,

    /// Segment the tracking camera is on, if tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_parameter: Option<f64>,

    /// Tracking camera position
    pub position: [f64; 3],

    /// Tracking camera rotation as [i, j, k, w]
    pub rotation: [f64; 4],

    pub mode: ViewMode,

    pub waypoint_count: usize,
}

impl From<&FrameReport> for SimFrame {
    fn from(report: &FrameReport) -> Self {
        let p = report.tracking_pose.position;
        let q = report.tracking_pose.rotation.coords;
        Self {
            time_sec: report.time,
            frame: report.frame,
            segment: report.segment,
            local_parameter: report.local_parameter,
            position: [p.x, p.y, p.z],
            rotation: [q.x, q.y, q.z, q.w],
            mode: report.mode,
            waypoint_count: report.waypoint_count,
        }
    }
}

impl SimFrame {
    pub fn position(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let [i, j, k, w] = self.rotation;
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, i, j, k))
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Waypoint positions at the end of the run
    pub waypoints: Vec<[f64; 3]>,

    /// Sampled frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            waypoints: Vec::new(),
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Builds an export from a finished run, keeping every `interval`-th
    /// frame plus the last one.
    pub fn from_run(result: &ScenarioResult, trace: &ScenarioTrace, interval: usize) -> Self {
        let mut export = Self::new(result.scenario.name(), result.seed);
        export.waypoints = trace.store.iter().map(|w| w.position.into()).collect();

        let interval = interval.max(1);
        let last = trace.frames.len().saturating_sub(1);
        for (i, report) in trace.frames.iter().enumerate() {
            if i % interval == 0 || i == last {
                export.add_frame(SimFrame::from(report));
            }
        }

        export.finalize(result.passed, result.failure_reason.clone());
        export
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
