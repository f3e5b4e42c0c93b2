//! TrackShot Simulator CLI
//!
//! Run deterministic tracking-shot scenarios, or drive the demo in real time.

use clap::Parser;
use std::time::Duration;
use trackshot_core::AppState;
use trackshot_env::{FrameClock, InputSource, NullInput, SystemClock, TimedEvent};
use trackshot_sim::scenarios::ScenarioId;
use trackshot_sim::{load_events, RerunLogger, ScenarioResult, ScenarioRunner, ScriptedInput, SimConfig, SimExport};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Export every Nth frame.
const EXPORT_INTERVAL: usize = 10;

/// TrackShot deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "trackshot-sim")]
#[command(about = "Run deterministic tracking-shot scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (ring, square, uneven, jitter, random_path, recorded, speed_ramp, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulated duration in seconds (default: per scenario)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Nominal frame rate
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Frame-time jitter standard deviation in milliseconds
    #[arg(long, default_value = "0")]
    jitter: f64,

    /// Tracking speed override
    #[arg(long)]
    speed: Option<f64>,

    /// JSON input script replacing the scenario's own input
    #[arg(long)]
    script: Option<String>,

    /// Run the demo against the wall clock instead of a scenario
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frames of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Stream the run to a Rerun viewer (needs the `visualization` feature)
    #[arg(long)]
    rerun: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("TrackShot Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let script = match args.script.as_deref().map(load_events).transpose() {
        Ok(script) => script,
        Err(e) => {
            error!("Failed to load script: {}", e);
            std::process::exit(1);
        }
    };

    if args.realtime {
        run_realtime(&args, script);
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: ring, square, uneven, jitter, random_path, recorded, speed_ramp, all");
            std::process::exit(1);
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if args.export.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        std::process::exit(1);
    }

    let logger = if args.rerun {
        RerunLogger::new("trackshot_sim")
    } else {
        RerunLogger::disabled()
    };

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let mut runner = ScenarioRunner::from_config(SimConfig {
            seed,
            fps: args.fps.max(1),
            duration: args.duration,
            jitter_ms: args.jitter,
            speed: args.speed,
        });
        if let Some(events) = &script {
            runner = runner.with_script(events.clone());
        }

        for scenario in &scenarios {
            let (result, trace) = runner.run_traced(*scenario);

            logger.log_trace(&trace);

            if let Some(path) = &args.export {
                let export = SimExport::from_run(&result, &trace, EXPORT_INTERVAL);
                match export.write_to_file(path) {
                    Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
                    Err(e) => error!("Failed to write export: {}", e),
                }
            }

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED | laps={} | waypoints={} | max step={:.3}",
                        scenario.name(),
                        seed,
                        result.metrics.laps,
                        result.final_waypoint_count,
                        result.metrics.max_position_step
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            // List failed seeds
            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

/// Runs the default demo against the wall clock, sleeping between frames.
fn run_realtime(args: &Args, script: Option<Vec<TimedEvent>>) {
    let duration = args.duration.unwrap_or(10.0);
    let frame_budget = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);

    let mut app = AppState::default();
    if let Some(speed) = args.speed {
        app.set_speed(speed);
    }

    let mut clock = SystemClock::new();
    let mut input: Box<dyn InputSource> = match script {
        Some(events) => Box::new(ScriptedInput::new(events)),
        None => Box::new(NullInput),
    };

    info!("Running demo in real time for {:.1}s at {} fps", duration, args.fps);

    let mut next_log = 0.0;
    while clock.now().as_secs_f64() < duration && !app.should_quit() {
        let report = app.frame(&mut clock, input.as_mut());

        if report.time >= next_log {
            let p = report.tracking_pose.position;
            debug!(
                "t={:.2}s | {:?} | segment={:?} | camera=({:.2}, {:.2}, {:.2})",
                report.time, report.mode, report.segment, p.x, p.y, p.z
            );
            next_log += 1.0;
        }

        let spent = clock.since_tick();
        if spent < frame_budget {
            std::thread::sleep(frame_budget - spent);
        }
    }

    info!(
        "Done: {} frames, {} laps, {} waypoints",
        app.frame_count(),
        app.controller().laps(),
        app.store().len()
    );
}
