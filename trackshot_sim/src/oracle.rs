//! Property oracle for simulation runs.
//!
//! The Oracle watches every frame a scenario produces and checks the
//! properties a tracking shot must always have, independent of the
//! scenario's own pass criteria:
//! - Poses are finite and the local parameter stays in [0, 1]
//! - The camera never teleports or flips between consecutive frames
//! - Segments are visited in order, one at a time, wrapping at the end
//! - Every completed lap lands back on segment 0
//!
//! It can also check the static path: neighbouring segments must meet with
//! equal position and rotation, and recorded waypoints must respect the
//! spacing guard.

use nalgebra::Vector3;
use serde::Serialize;
use trackshot_core::orientation::angular_distance;
use trackshot_core::{FrameReport, TrackingController, WaypointStore};

/// Allowed ratio between a frame's displacement and `elapsed · speed`.
///
/// Spline velocity differs from the chord-normalized rate by a bounded
/// factor; a genuine jump is many times larger.
pub const POSITION_STEP_FACTOR: f64 = 8.0;

/// Largest rotation (radians) the camera may turn in one frame.
pub const MAX_ROTATION_STEP: f64 = 0.5;

/// Tolerance for positions and rotations that must coincide.
pub const BOUNDARY_TOLERANCE: f64 = 1e-6;

const STEP_EPSILON: f64 = 1e-9;

/// A property the run broke.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    NonFinitePose { frame: u64 },
    ParameterOutOfRange { frame: u64, value: f64 },
    PositionJump { frame: u64, step: f64, limit: f64 },
    RotationJump { frame: u64, angle: f64 },
    SegmentSkipped { frame: u64, from: usize, to: usize },
    LapWithoutWrap { frame: u64, segment: usize },
    BoundaryGap { segment: usize, position_gap: f64, rotation_gap: f64 },
    WaypointsTooClose { first: usize, second: usize, distance: f64 },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::NonFinitePose { frame } => write!(f, "frame {}: non-finite pose", frame),
            Violation::ParameterOutOfRange { frame, value } => {
                write!(f, "frame {}: local parameter {:.4} outside [0, 1]", frame, value)
            }
            Violation::PositionJump { frame, step, limit } => {
                write!(f, "frame {}: camera moved {:.3} (limit {:.3})", frame, step, limit)
            }
            Violation::RotationJump { frame, angle } => {
                write!(f, "frame {}: camera turned {:.3} rad in one frame", frame, angle)
            }
            Violation::SegmentSkipped { frame, from, to } => {
                write!(f, "frame {}: segment jumped {} → {}", frame, from, to)
            }
            Violation::LapWithoutWrap { frame, segment } => {
                write!(f, "frame {}: lap counted on segment {}", frame, segment)
            }
            Violation::BoundaryGap {
                segment,
                position_gap,
                rotation_gap,
            } => write!(
                f,
                "segment {} → {}: position gap {:.2e}, rotation gap {:.2e}",
                segment,
                segment + 1,
                position_gap,
                rotation_gap
            ),
            Violation::WaypointsTooClose { first, second, distance } => {
                write!(f, "waypoints #{} and #{} only {:.3} apart", first, second, distance)
            }
        }
    }
}

/// Running statistics gathered by the oracle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OracleStats {
    /// Frames observed
    pub frames: u64,

    /// Frames in which the tracking camera was running
    pub tracked_frames: u64,

    /// Largest frame-to-frame displacement of the tracking camera
    pub max_position_step: f64,

    /// Largest frame-to-frame rotation of the tracking camera (radians)
    pub max_rotation_step: f64,

    /// Largest gap found at a segment boundary
    pub max_boundary_gap: f64,
}

/// The Oracle - checks tracking-shot properties frame by frame.
#[derive(Debug, Clone, Default)]
pub struct Oracle {
    previous: Option<FrameReport>,
    stats: OracleStats,
    violations: Vec<Violation>,
}

impl Oracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks one frame against the previous one.
    pub fn observe(&mut self, report: &FrameReport) {
        self.stats.frames += 1;
        let pose = &report.tracking_pose;

        if !pose.position.iter().all(|c| c.is_finite()) || !pose.rotation.coords.iter().all(|c| c.is_finite()) {
            self.violations.push(Violation::NonFinitePose { frame: report.frame });
        }

        if let Some(t) = report.local_parameter {
            self.stats.tracked_frames += 1;
            if !(0.0..=1.0).contains(&t) {
                self.violations.push(Violation::ParameterOutOfRange {
                    frame: report.frame,
                    value: t,
                });
            }
        }

        if let Some(previous) = self.previous.take() {
            self.compare(&previous, report);
        }
        self.previous = Some(report.clone());
    }

    fn compare(&mut self, previous: &FrameReport, report: &FrameReport) {
        let (Some(from), Some(to)) = (previous.segment, report.segment) else {
            return;
        };
        // Appending a waypoint legitimately reshapes the segments around it
        if previous.waypoint_count != report.waypoint_count {
            return;
        }

        let n = report.waypoint_count;
        if to != from && to != (from + 1) % n {
            self.violations.push(Violation::SegmentSkipped {
                frame: report.frame,
                from,
                to,
            });
        }

        if report.laps > previous.laps && to != 0 {
            self.violations.push(Violation::LapWithoutWrap {
                frame: report.frame,
                segment: to,
            });
        }

        let step = (report.tracking_pose.position - previous.tracking_pose.position).norm();
        let limit = report.elapsed * report.speed * POSITION_STEP_FACTOR + STEP_EPSILON;
        self.stats.max_position_step = self.stats.max_position_step.max(step);
        if step > limit {
            self.violations.push(Violation::PositionJump {
                frame: report.frame,
                step,
                limit,
            });
        }

        let angle = angular_distance(&previous.tracking_pose.rotation, &report.tracking_pose.rotation);
        self.stats.max_rotation_step = self.stats.max_rotation_step.max(angle);
        if angle > MAX_ROTATION_STEP {
            self.violations.push(Violation::RotationJump {
                frame: report.frame,
                angle,
            });
        }
    }

    /// Checks that every pair of neighbouring segments meets with the same
    /// position and rotation.
    pub fn check_boundaries(&mut self, controller: &TrackingController, store: &WaypointStore) {
        let n = store.len();
        if !store.is_trackable() {
            return;
        }

        for segment in 0..n {
            let end = controller.pose_at(store, segment, 1.0);
            let start = controller.pose_at(store, (segment + 1) % n, 0.0);

            // Degenerate segments are skipped by the controller and have no curve
            let (Ok(end), Ok(start)) = (end, start) else {
                continue;
            };

            let position_gap = (end.position - start.position).norm();
            let rotation_gap = angular_distance(&end.rotation, &start.rotation);
            let gap = position_gap.max(rotation_gap);
            self.stats.max_boundary_gap = self.stats.max_boundary_gap.max(gap);

            if gap > BOUNDARY_TOLERANCE {
                self.violations.push(Violation::BoundaryGap {
                    segment,
                    position_gap,
                    rotation_gap,
                });
            }
        }
    }

    /// Checks that no two waypoints lie closer than `min_distance`.
    pub fn check_spacing(&mut self, store: &WaypointStore, min_distance: f64) {
        let positions: Vec<Vector3<f64>> = store.positions();
        for (i, a) in positions.iter().enumerate() {
            for (j, b) in positions.iter().enumerate().skip(i + 1) {
                let distance = (a - b).norm();
                if distance < min_distance {
                    self.violations.push(Violation::WaypointsTooClose {
                        first: i,
                        second: j,
                        distance,
                    });
                }
            }
        }
    }

    pub fn stats(&self) -> &OracleStats {
        &self.stats
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use trackshot_core::{AppConfig, AppState, CameraPose, ViewMode, Waypoint};

    fn report(frame: u64, segment: usize, t: f64, position: Vector3<f64>) -> FrameReport {
        FrameReport {
            frame,
            time: frame as f64 * 0.1,
            elapsed: 0.1,
            mode: ViewMode::Tracking,
            tracking_pose: CameraPose::new(position, UnitQuaternion::identity()),
            segment: Some(segment),
            local_parameter: Some(t),
            laps: 0,
            waypoint_count: 4,
            speed: 1.0,
            added_waypoint: None,
        }
    }

    #[test]
    fn test_smooth_run_passes() {
        let mut app = AppState::default();
        let mut oracle = Oracle::new();

        for _ in 0..600 {
            app.update(1.0 / 60.0, 0.0);
            let r = FrameReport {
                frame: app.frame_count(),
                time: 0.0,
                elapsed: 1.0 / 60.0,
                mode: app.mode(),
                tracking_pose: app.tracking_pose(),
                segment: app.controller().state().map(|s| s.segment_index),
                local_parameter: app.controller().state().map(|s| s.local_parameter),
                laps: app.controller().laps(),
                waypoint_count: app.store().len(),
                speed: app.speed(),
                added_waypoint: None,
            };
            oracle.observe(&r);
        }
        oracle.check_boundaries(app.controller(), app.store());
        oracle.check_spacing(app.store(), 1.0);

        assert!(oracle.passed(), "{:?}", oracle.violations());
        assert_eq!(oracle.stats().tracked_frames, 600);
        assert!(oracle.stats().max_boundary_gap < 1e-9);
    }

    #[test]
    fn test_detects_teleport() {
        let mut oracle = Oracle::new();
        oracle.observe(&report(0, 0, 0.1, Vector3::zeros()));
        oracle.observe(&report(1, 0, 0.2, Vector3::new(5.0, 0.0, 0.0)));

        assert!(matches!(oracle.violations(), [Violation::PositionJump { frame: 1, .. }]));
    }

    #[test]
    fn test_detects_skipped_segment() {
        let mut oracle = Oracle::new();
        oracle.observe(&report(0, 0, 0.9, Vector3::zeros()));
        oracle.observe(&report(1, 2, 0.1, Vector3::zeros()));

        assert!(matches!(oracle.violations(), [Violation::SegmentSkipped { from: 0, to: 2, .. }]));
    }

    #[test]
    fn test_wrap_is_not_a_skip() {
        let mut oracle = Oracle::new();
        oracle.observe(&report(0, 3, 0.95, Vector3::zeros()));
        let mut wrapped = report(1, 0, 0.05, Vector3::new(0.01, 0.0, 0.0));
        wrapped.laps = 1;
        oracle.observe(&wrapped);

        assert!(oracle.passed(), "{:?}", oracle.violations());
    }

    #[test]
    fn test_detects_parameter_out_of_range() {
        let mut oracle = Oracle::new();
        oracle.observe(&report(0, 0, 1.5, Vector3::zeros()));
        assert!(matches!(oracle.violations(), [Violation::ParameterOutOfRange { .. }]));
    }

    #[test]
    fn test_spacing_check() {
        let mut store = WaypointStore::new();
        store.push(Waypoint::at(Vector3::zeros()));
        store.push(Waypoint::at(Vector3::new(0.5, 0.0, 0.0)));
        store.push(Waypoint::at(Vector3::new(5.0, 0.0, 0.0)));

        let mut oracle = Oracle::new();
        oracle.check_spacing(&store, 1.0);
        assert!(matches!(
            oracle.violations(),
            [Violation::WaypointsTooClose { first: 0, second: 1, .. }]
        ));
    }

    #[test]
    fn test_boundaries_of_small_ring() {
        let app = AppState::new(AppConfig {
            waypoint_count: 5,
            ..AppConfig::default()
        });
        let mut oracle = Oracle::new();
        oracle.check_boundaries(app.controller(), app.store());
        assert!(oracle.passed(), "{:?}", oracle.violations());
    }
}
