//! Frame clock trait for the TrackShot engine.

use std::time::Duration;

/// The time source driving the frame loop.
///
/// # Implementations
///
/// - **Production**: `SystemClock` - wraps `std::time::Instant`
/// - **Simulation**: `SimClock` - fixed-step virtual time with seeded jitter
///
/// # Determinism
///
/// The engine never reads the wall clock itself; elapsed time reaches it only
/// through `tick()`, so a simulated clock makes a whole run reproducible.
pub trait FrameClock {
    /// Returns the time since the clock was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;
    
    /// Marks a frame boundary and returns the seconds elapsed since the
    /// previous boundary (or since creation for the first frame).
    ///
    /// Never negative.
    fn tick(&mut self) -> f64;
    
    /// Returns the clock's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64 {
        0
    }
}
