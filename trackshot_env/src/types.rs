//! Common types for the TrackShot environment abstraction.

use serde::{Deserialize, Serialize};

/// Physical keys the demo reacts to.
///
/// The engine maps these to actions; the environment only reports which
/// of them are held down during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Record the edit camera's pose as a new waypoint
    Space,
    /// Switch to the edit (overview) camera
    Num1,
    /// Switch to the tracking camera
    Num2,
    /// Increase camera speed
    KeypadAdd,
    /// Decrease camera speed
    KeypadSubtract,
    /// Increase normal-map bumpiness
    PageUp,
    /// Decrease normal-map bumpiness
    PageDown,
    W,
    A,
    S,
    D,
    /// Request shutdown
    Escape,
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Key::Space => "space",
            Key::Num1 => "1",
            Key::Num2 => "2",
            Key::KeypadAdd => "kp_add",
            Key::KeypadSubtract => "kp_subtract",
            Key::PageUp => "page_up",
            Key::PageDown => "page_down",
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
            Key::Escape => "escape",
        };
        write!(f, "{}", name)
    }
}

/// A discrete input event, as delivered by a window system callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Key went down (stays held until the matching `KeyUp`)
    KeyDown { key: Key },
    
    /// Key was released
    KeyUp { key: Key },
    
    /// Absolute cursor position in window coordinates
    CursorMoved { x: f64, y: f64 },
    
    /// Scroll wheel offset
    Scroll { dy: f64 },
    
    /// Window close button or equivalent
    CloseRequested,
}

/// An input event stamped with the time (seconds since start) it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Seconds since the start of the run
    pub at: f64,
    
    /// The event itself
    #[serde(flatten)]
    pub event: InputEvent,
}

/// Snapshot of the input state for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Keys held down during this frame (sorted, no duplicates)
    pub keys_down: Vec<Key>,
    
    /// Latest absolute cursor position, if the cursor moved this frame
    pub cursor: Option<(f64, f64)>,
    
    /// Accumulated scroll offset for this frame
    pub scroll: f64,
    
    /// Shutdown was requested by the window system
    pub close_requested: bool,
}

impl FrameInput {
    /// Creates an empty snapshot (nothing pressed, no motion).
    pub fn idle() -> Self {
        Self::default()
    }
    
    /// Creates a snapshot with the given keys held.
    pub fn with_keys(keys: &[Key]) -> Self {
        let mut keys_down = keys.to_vec();
        keys_down.sort();
        keys_down.dedup();
        Self {
            keys_down,
            ..Self::default()
        }
    }
    
    /// Returns true if `key` is held this frame.
    pub fn is_down(&self, key: Key) -> bool {
        self.keys_down.binary_search(&key).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_with_keys_sorted_and_deduped() {
        let input = FrameInput::with_keys(&[Key::W, Key::Space, Key::W]);
        assert_eq!(input.keys_down, vec![Key::Space, Key::W]);
        assert!(input.is_down(Key::W));
        assert!(!input.is_down(Key::S));
    }
    
    #[test]
    fn test_timed_event_json_shape() {
        let json = r#"{"at": 1.5, "type": "key_down", "key": "space"}"#;
        let event: TimedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.at, 1.5);
        assert_eq!(event.event, InputEvent::KeyDown { key: Key::Space });
    }
}
