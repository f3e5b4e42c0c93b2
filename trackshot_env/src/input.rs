//! Input source abstraction for the TrackShot engine.

use crate::types::FrameInput;
use std::time::Duration;

/// Abstraction for per-frame input polling.
///
/// # Implementations
///
/// - **Production**: a window system adapter that collects callbacks
///   between frames and reports held keys
/// - **Simulation**: `ScriptedInput` replaying timed events
///
/// # Frame Flow
///
/// ```text
/// Window/Script              InputSource                 Engine
///   |                           |                          |
///   |-- key/cursor events ----->|                          |
///   |                           |<-- poll(now) ------------|
///   |                           |-- FrameInput ----------->|
/// ```
pub trait InputSource {
    /// Returns the input state for the frame ending at `now`.
    ///
    /// Events stamped after `now` must stay queued for later frames.
    fn poll(&mut self, now: Duration) -> FrameInput;
}

/// An input source that never reports anything.
///
/// Useful for unattended runs where only the tracking camera moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInput;

impl InputSource for NullInput {
    fn poll(&mut self, _now: Duration) -> FrameInput {
        FrameInput::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_null_input_is_idle() {
        let mut input = NullInput;
        assert_eq!(input.poll(Duration::from_secs(3)), FrameInput::idle());
    }
}
