//! Scenario runner - executes tracking-shot scenarios against a virtual clock.

use crate::clock::SimClock;
use crate::oracle::Oracle;
use crate::scenarios::ScenarioId;
use crate::script::{hold, tap, ScriptedInput};

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::f64::consts::{PI, SQRT_2, TAU};
use trackshot_core::{AppConfig, AppState, FrameReport, ViewMode, Waypoint, WaypointStore};
use trackshot_env::{FrameClock, Key, TimedEvent};
use tracing::{debug, info, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration shared by every scenario run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed (clock jitter, random paths)
    pub seed: u64,

    /// Nominal frame rate (default: 60)
    pub fps: u32,

    /// Simulated seconds; `None` uses each scenario's own duration
    pub duration: Option<f64>,

    /// Frame-time jitter standard deviation in milliseconds (default: 0)
    pub jitter_ms: f64,

    /// Tracking speed override; `None` keeps the demo default
    pub speed: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fps: 60,
            duration: None,
            jitter_ms: 0.0,
            speed: None,
        }
    }
}

/// Jitter the `jitter` scenario uses when none is configured.
const DEFAULT_SCENARIO_JITTER_MS: f64 = 4.0;

/// Relative tolerance on lap times.
const LAP_TIME_TOLERANCE: f64 = 0.05;

// ============================================================================
// RESULTS
// ============================================================================

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    #[serde(serialize_with = "serialize_scenario")]
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total frames executed
    pub total_frames: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Number of waypoints at the end
    pub final_waypoint_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

fn serialize_scenario<S: serde::Serializer>(scenario: &ScenarioId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(scenario.name())
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Completed laps
    pub laps: u64,

    /// Segments finished
    pub segments_completed: u64,

    /// Waypoints recorded during the run
    pub waypoints_added: u64,

    /// Add requests refused by the spacing guard
    pub waypoints_rejected: u64,

    /// Largest per-frame camera displacement
    pub max_position_step: f64,

    /// Largest per-frame camera rotation (radians)
    pub max_rotation_step: f64,

    /// Largest mismatch between neighbouring segments
    pub max_boundary_gap: f64,

    /// Oracle violations
    pub violations: usize,
}

/// Everything a run produced, for export and visualization.
#[derive(Debug, Clone)]
pub struct ScenarioTrace {
    pub frames: Vec<FrameReport>,
    pub store: WaypointStore,
    pub alpha: f64,
}

/// A prepared scenario: initial state, clock, input.
struct Setup {
    app: AppState,
    clock: SimClock,
    input: ScriptedInput,
}

// ============================================================================
// RUNNER
// ============================================================================

/// Runs tracking-shot scenarios.
pub struct ScenarioRunner {
    config: SimConfig,

    /// Replaces the scenario's own input script
    script: Option<Vec<TimedEvent>>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self::from_config(SimConfig {
            seed,
            ..SimConfig::default()
        })
    }

    pub fn from_config(config: SimConfig) -> Self {
        Self { config, script: None }
    }

    /// Sets the frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.config.fps = fps.max(1);
        self
    }

    /// Sets the simulated duration for every scenario.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.config.duration = Some(secs);
        self
    }

    /// Sets the frame-time jitter (standard deviation, milliseconds).
    pub fn with_jitter_ms(mut self, jitter_ms: f64) -> Self {
        self.config.jitter_ms = jitter_ms;
        self
    }

    /// Overrides the tracking speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.config.speed = Some(speed);
        self
    }

    /// Replaces every scenario's input with the given events.
    pub fn with_script(mut self, events: Vec<TimedEvent>) -> Self {
        self.script = Some(events);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_traced(scenario).0
    }

    /// Runs a scenario and also returns every frame it produced.
    pub fn run_traced(&self, scenario: ScenarioId) -> (ScenarioResult, ScenarioTrace) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);
        debug!("  {}", scenario.description());

        let duration = self.config.duration.unwrap_or_else(|| scenario.default_duration());
        let Setup {
            mut app,
            mut clock,
            mut input,
        } = self.setup(scenario);

        let mut oracle = Oracle::new();
        let mut frames = Vec::new();
        let log_interval = u64::from(self.config.fps.max(1));

        while clock.now().as_secs_f64() < duration && !app.should_quit() {
            let report = app.frame(&mut clock, &mut input);
            oracle.observe(&report);

            if report.frame % log_interval == 0 {
                debug!(
                    "  t={:.1}s | segment={:?} | t_local={:.3} | laps={} | waypoints={}",
                    report.time,
                    report.segment,
                    report.local_parameter.unwrap_or(0.0),
                    report.laps,
                    report.waypoint_count
                );
            }
            frames.push(report);
        }

        oracle.check_boundaries(app.controller(), app.store());
        oracle.check_spacing(app.store(), app.config().min_spacing);

        for violation in oracle.violations().iter().take(5) {
            warn!("  ✗ {}", violation);
        }

        let failure_reason = match oracle.violations().first() {
            Some(violation) => Some(format!("{} ({} violations)", violation, oracle.violations().len())),
            None => self.check_scenario(scenario, &app, &frames).err(),
        };

        let stats = oracle.stats();
        let metrics = ScenarioMetrics {
            laps: app.controller().laps(),
            segments_completed: app.controller().segments_completed(),
            waypoints_added: frames.iter().filter(|f| f.added_waypoint.is_some()).count() as u64,
            waypoints_rejected: app.rejected_waypoints(),
            max_position_step: stats.max_position_step,
            max_rotation_step: stats.max_rotation_step,
            max_boundary_gap: stats.max_boundary_gap,
            violations: oracle.violations().len(),
        };

        let result = ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: failure_reason.is_none(),
            total_frames: frames.len() as u64,
            final_time_secs: clock.now().as_secs_f64(),
            final_waypoint_count: app.store().len(),
            failure_reason,
            metrics,
        };

        let trace = ScenarioTrace {
            frames,
            store: app.store().clone(),
            alpha: app.controller().config().alpha,
        };

        (result, trace)
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    fn setup(&self, scenario: ScenarioId) -> Setup {
        let seed = self.config.seed;
        let mut clock = SimClock::new(seed, self.config.fps).with_jitter(self.config.jitter_ms / 1000.0);
        let mut config = AppConfig {
            speed: self.config.speed.unwrap_or(AppConfig::default().speed),
            ..AppConfig::default()
        };
        let mut events = Vec::new();
        let mut mode = ViewMode::Tracking;

        let mut app = match scenario {
            ScenarioId::Ring => AppState::new(config),
            ScenarioId::Square => {
                // Exact timing: no jitter, speed equal to the side length
                clock = SimClock::new(seed, self.config.fps);
                config.speed = 8.0 * SQRT_2;
                AppState::with_store(config, square_store())
            }
            ScenarioId::Uneven => AppState::with_store(config, uneven_store()),
            ScenarioId::Jitter => {
                let jitter_ms = if self.config.jitter_ms > 0.0 {
                    self.config.jitter_ms
                } else {
                    DEFAULT_SCENARIO_JITTER_MS
                };
                clock = SimClock::new(seed, self.config.fps).with_jitter(jitter_ms / 1000.0);
                AppState::new(config)
            }
            ScenarioId::RandomPath => {
                // Separate stream so path shape does not depend on clock jitter
                let path_seed = seed.wrapping_mul(0x9e3779b97f4a7c15);
                AppState::with_store(config, random_store(path_seed, 12))
            }
            ScenarioId::Recorded => {
                config.waypoint_count = 0;
                mode = ViewMode::Edit;
                events = recording_script();
                AppState::new(config)
            }
            ScenarioId::SpeedRamp => {
                events.extend(hold(Key::KeypadAdd, 1.0, 2.0));
                events.extend(hold(Key::KeypadSubtract, 4.0, 8.0));
                AppState::new(config)
            }
        };

        app.set_mode(mode);

        let input = ScriptedInput::new(self.script.clone().unwrap_or(events));
        Setup { app, clock, input }
    }

    // ========================================================================
    // SCENARIO ASSERTIONS
    // ========================================================================

    fn check_scenario(&self, scenario: ScenarioId, app: &AppState, frames: &[FrameReport]) -> Result<(), String> {
        match scenario {
            ScenarioId::Ring | ScenarioId::Jitter => check_ring_laps(app, frames),
            ScenarioId::Square => check_square(app, frames),
            ScenarioId::Uneven | ScenarioId::RandomPath => check_completes_lap(app),
            ScenarioId::Recorded if self.script.is_none() => check_recorded(app),
            ScenarioId::SpeedRamp if self.script.is_none() => check_speed_ramp(app, frames),
            // A custom script may do anything; the oracle still applies
            ScenarioId::Recorded | ScenarioId::SpeedRamp => Ok(()),
        }
    }
}

/// Times at which each lap completed.
fn lap_times(frames: &[FrameReport]) -> Vec<f64> {
    frames
        .windows(2)
        .filter(|w| w[1].laps > w[0].laps)
        .map(|w| w[1].time)
        .collect()
}

fn check_ring_laps(app: &AppState, frames: &[FrameReport]) -> Result<(), String> {
    let n = app.store().len() as f64;
    let radius = app.config().ring_radius;
    let chord = 2.0 * radius * (PI / n).sin();
    let speed = app.speed();

    if speed <= 0.0 {
        return match app.controller().laps() {
            0 => Ok(()),
            laps => Err(format!("{} laps at zero speed", laps)),
        };
    }

    // Each segment is normalized by its chord: one lap takes n·chord/speed
    let lap_time = n * chord / speed;
    let times = lap_times(frames);
    let mut previous = 0.0;
    for (i, t) in times.iter().enumerate() {
        let elapsed = t - previous;
        if ((elapsed - lap_time) / lap_time).abs() > LAP_TIME_TOLERANCE {
            return Err(format!(
                "lap {} took {:.2}s, expected {:.2}s ±{:.0}%",
                i + 1,
                elapsed,
                lap_time,
                LAP_TIME_TOLERANCE * 100.0
            ));
        }
        previous = *t;
    }

    let total = frames.last().map(|f| f.time).unwrap_or(0.0);
    let expected = (total / lap_time).floor() as u64;
    let laps = app.controller().laps();
    if laps + 1 < expected || laps > expected + 1 {
        return Err(format!("completed {} laps in {:.1}s, expected about {}", laps, total, expected));
    }
    Ok(())
}

fn check_square(app: &AppState, frames: &[FrameReport]) -> Result<(), String> {
    // One segment per second, so the local parameter tracks the clock
    let Some(half) = frames
        .iter()
        .filter(|f| f.time <= 1.0)
        .min_by(|a, b| (a.time - 0.5).abs().total_cmp(&(b.time - 0.5).abs()))
    else {
        return Err("run too short to reach t=0.5".to_string());
    };

    let t = half.local_parameter.unwrap_or(f64::NAN);
    if half.segment != Some(0) || (t - half.time).abs() > 1e-3 {
        return Err(format!(
            "at {:.3}s expected segment 0, t={:.3}; got {:?}, t={:.3}",
            half.time, half.time, half.segment, t
        ));
    }

    let midpoint = app
        .controller()
        .pose_at(app.store(), 0, 0.5)
        .map_err(|e| e.to_string())?
        .position;
    if (midpoint - Vector3::new(5.0, 0.0, 5.0)).norm() > 1e-6 {
        return Err(format!("segment midpoint {:?}, expected (5, 0, 5)", midpoint));
    }

    let total = frames.last().map(|f| f.time).unwrap_or(0.0);
    let expected = (total / 4.0).floor() as u64;
    if app.controller().laps() != expected {
        return Err(format!("{} laps in {:.2}s, expected {}", app.controller().laps(), total, expected));
    }
    Ok(())
}

fn check_completes_lap(app: &AppState) -> Result<(), String> {
    if app.speed() > 0.0 && app.controller().laps() == 0 {
        return Err(format!(
            "no lap completed around {} waypoints",
            app.store().len()
        ));
    }
    Ok(())
}

fn check_recorded(app: &AppState) -> Result<(), String> {
    if app.store().len() != 5 {
        return Err(format!("recorded {} waypoints, expected 5", app.store().len()));
    }
    if app.rejected_waypoints() == 0 {
        return Err("duplicate waypoint was not rejected".to_string());
    }
    if !app.controller().is_tracking() {
        return Err("tracking never started".to_string());
    }
    if app.mode() != ViewMode::Tracking {
        return Err("view never switched to the tracking camera".to_string());
    }
    Ok(())
}

fn check_speed_ramp(app: &AppState, frames: &[FrameReport]) -> Result<(), String> {
    let initial = AppConfig::default().speed;
    let peak = frames.iter().map(|f| f.speed).fold(0.0, f64::max);
    if peak <= initial {
        return Err(format!("speed never rose above {:.1}", initial));
    }
    if app.speed() != 0.0 {
        return Err(format!("speed ended at {:.2}, expected 0", app.speed()));
    }

    // Stationary for the last second
    let end = frames.last().map(|f| f.time).unwrap_or(0.0);
    let still: Vec<&FrameReport> = frames.iter().filter(|f| f.time >= end - 1.0).collect();
    if let (Some(first), Some(last)) = (still.first(), still.last()) {
        let drift = (last.tracking_pose.position - first.tracking_pose.position).norm();
        if drift > 1e-12 {
            return Err(format!("camera drifted {:.4} at zero speed", drift));
        }
    }
    Ok(())
}

// ============================================================================
// PATHS & SCRIPTS
// ============================================================================

fn closed(points: &[Vector3<f64>]) -> WaypointStore {
    let mut store = WaypointStore::new();
    for p in points {
        store.push(Waypoint::at(*p));
    }
    store.close_loop_facing(&Vector3::y());
    store
}

fn square_store() -> WaypointStore {
    closed(&[
        Vector3::new(8.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, 8.0),
        Vector3::new(-8.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -8.0),
    ])
}

fn uneven_store() -> WaypointStore {
    closed(&[
        Vector3::new(8.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 8.0),
        Vector3::new(-8.0, 0.0, 0.0),
        Vector3::new(-8.0, 0.5, -1.5),
        Vector3::new(2.0, 2.0, -7.0),
    ])
}

/// A loop of `count` waypoints around the origin with seeded radius, angle
/// and height noise. Angles stay ordered so the loop never crosses itself.
fn random_store(seed: u64, count: usize) -> WaypointStore {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let step = TAU / count as f64;
    let height = Normal::<f64>::new(0.0, 1.0).ok();
    let mut store = WaypointStore::new();

    for i in 0..count {
        let angle = i as f64 * step + rng.gen_range(-0.15..0.15) * step;
        let radius = rng.gen_range(5.0..11.0);
        let y = height.map(|n| n.sample(&mut rng)).unwrap_or(0.0).clamp(-3.0, 3.0);
        let position = Vector3::new(radius * angle.cos(), y, radius * angle.sin());

        if let Err(e) = store.push_spaced(Waypoint::at(position), WaypointStore::MIN_SPACING) {
            debug!("Random path: {}", e);
        }
    }

    store.close_loop_facing(&Vector3::y());
    store
}

/// Flies the overview camera around and records five waypoints, with one
/// duplicate request in between, then switches to the tracking camera.
fn recording_script() -> Vec<TimedEvent> {
    let mut events = Vec::new();
    events.extend(tap(Key::Space, 0.1));
    events.extend(tap(Key::Space, 0.3)); // same spot: rejected
    events.extend(hold(Key::D, 0.5, 1.7));
    events.extend(tap(Key::Space, 2.0));
    events.extend(hold(Key::W, 2.5, 3.3));
    events.extend(tap(Key::Space, 3.5));
    events.extend(hold(Key::A, 4.0, 6.0));
    events.extend(tap(Key::Space, 6.2));
    events.extend(hold(Key::S, 6.5, 7.3));
    events.extend(tap(Key::Space, 7.5));
    events.extend(tap(Key::Num2, 8.0));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass_default_seed() {
        let runner = ScenarioRunner::new(42);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_scenarios_pass_other_seeds_and_rates() {
        for (seed, fps) in [(1, 30), (7, 144), (12345, 24)] {
            let runner = ScenarioRunner::new(seed).with_fps(fps);
            for scenario in [ScenarioId::Jitter, ScenarioId::RandomPath, ScenarioId::Recorded] {
                let result = runner.run(scenario);
                assert!(result.passed, "{} seed={} fps={}: {:?}", scenario, seed, fps, result.failure_reason);
            }
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let runner = ScenarioRunner::new(99).with_jitter_ms(3.0).with_duration(5.0);
        let (_, a) = runner.run_traced(ScenarioId::RandomPath);
        let (_, b) = runner.run_traced(ScenarioId::RandomPath);
        assert_eq!(a.frames, b.frames);
    }

    #[test]
    fn test_ring_metrics() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Ring);
        assert_eq!(result.metrics.laps, 3);
        assert!((60..80).contains(&result.metrics.segments_completed));
        assert!(result.metrics.max_boundary_gap < 1e-9);
        assert_eq!(result.final_waypoint_count, 20);
    }

    #[test]
    fn test_recorded_metrics() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Recorded);
        assert_eq!(result.metrics.waypoints_added, 5);
        assert!(result.metrics.waypoints_rejected >= 1);
    }

    #[test]
    fn test_custom_script_can_quit_early() {
        let script = vec![TimedEvent {
            at: 1.0,
            event: trackshot_env::InputEvent::CloseRequested,
        }];
        let result = ScenarioRunner::new(42).with_script(script).run(ScenarioId::Ring);
        assert!(result.final_time_secs < 1.1);
    }

    #[test]
    fn test_zero_speed_ring() {
        let result = ScenarioRunner::new(42).with_speed(0.0).with_duration(5.0).run(ScenarioId::Ring);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.laps, 0);
    }

    #[test]
    fn test_random_store_is_spaced_and_closed() {
        let store = random_store(5, 12);
        assert!(store.is_trackable());

        let mut oracle = Oracle::new();
        oracle.check_spacing(&store, WaypointStore::MIN_SPACING);
        assert!(oracle.passed());
    }
}
