//! Production implementation of FrameClock using the system monotonic clock.

use crate::FrameClock;
use std::time::{Duration, Instant};

/// Production clock backed by `std::time::Instant`.
///
/// This is the "real" implementation used by a windowed front end.
pub struct SystemClock {
    /// Start time for monotonic duration calculations
    start: Instant,
    
    /// Time of the previous frame boundary
    last_tick: Instant,
}

impl SystemClock {
    /// Creates a new SystemClock.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }
    
    /// Returns the time spent in the current frame so far.
    pub fn since_tick(&self) -> Duration {
        self.last_tick.elapsed()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
    
    fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        elapsed.as_secs_f64()
    }
}
