//! TrackShot Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam between the tracking-shot engine
//! and whatever drives it: a windowed application polling a real keyboard
//! and wall clock, or the headless simulator replaying a script against a
//! virtual clock.
//!
//! # Core Concept: Frame-Driven Polling
//!
//! The engine only ever sees two things per frame:
//! - Time (`FrameClock::tick()` → elapsed seconds)
//! - Input (`InputSource::poll()` → a [`FrameInput`] snapshot)
//!
//! # Example
//!
//! ```ignore
//! use trackshot_env::{FrameClock, InputSource, SystemClock};
//!
//! fn frame_loop<C: FrameClock, I: InputSource>(clock: &mut C, input: &mut I) {
//!     loop {
//!         let elapsed = clock.tick();
//!         let frame = input.poll(clock.now());
//!         if frame.close_requested {
//!             break;
//!         }
//!         update(elapsed, &frame);
//!     }
//! }
//! ```

mod clock;
mod input;
mod types;
mod error;
mod system_clock;

pub use clock::FrameClock;
pub use input::{InputSource, NullInput};
pub use types::{FrameInput, InputEvent, Key, TimedEvent};
pub use error::EnvError;
pub use system_clock::SystemClock;
