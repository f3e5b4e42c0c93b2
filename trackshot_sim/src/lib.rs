//! TrackShot Deterministic Simulation Harness
//!
//! This crate drives the tracking-shot engine headlessly: a virtual frame
//! clock stands in for the window's timer and a scripted input source
//! stands in for the keyboard and mouse.
//!
//! # Core Principle: Everything From One Seed
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advanced by a fixed step, with optional seeded jitter
//! - **Input**: Timed key, cursor and scroll events replayed from a script
//! - **Randomness**: Random paths derived from the same 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ScenarioRunner                       │
//! │  ┌──────────┐   ┌────────────────┐   ┌───────────────┐   │
//! │  │ SimClock │──►│    AppState    │◄──│ ScriptedInput │   │
//! │  └──────────┘   │ (store, track, │   └───────────────┘   │
//! │                 │  cameras)      │                       │
//! │                 └───────┬────────┘                       │
//! │                         │ FrameReport                    │
//! │                 ┌───────▼────────┐                       │
//! │                 │     Oracle     │                       │
//! │                 └────────────────┘                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use trackshot_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_jitter_ms(3.0).run(ScenarioId::Ring);
//! assert!(result.passed);
//! ```

mod clock;
mod exporter;
mod oracle;
mod runner;
mod script;
pub mod scenarios;
pub mod visualizer;

pub use clock::SimClock;
pub use exporter::{SimError, SimExport, SimFrame};
pub use oracle::{Oracle, OracleStats, Violation};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, ScenarioTrace, SimConfig};
pub use script::{hold, load_events, parse_events, tap, ScriptedInput};
pub use visualizer::RerunLogger;
