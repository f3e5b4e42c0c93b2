//! Scripted input source replaying timed events.
//!
//! A script is a JSON array of [`TimedEvent`]s:
//!
//! ```json
//! [
//!   { "at": 0.5, "type": "key_down", "key": "d" },
//!   { "at": 1.7, "type": "key_up", "key": "d" },
//!   { "at": 2.0, "type": "key_down", "key": "space" },
//!   { "at": 2.1, "type": "key_up", "key": "space" }
//! ]
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::time::Duration;
use trackshot_env::{EnvError, FrameInput, InputEvent, InputSource, Key, TimedEvent};
use tracing::debug;

/// An `InputSource` that replays a fixed list of timed events.
///
/// Keys stay held from `key_down` until `key_up`. A key pressed and released
/// within the same frame still counts as held for that frame, so short taps
/// are never lost at low frame rates.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pending: VecDeque<TimedEvent>,
    held: BTreeSet<Key>,
}

impl ScriptedInput {
    /// Creates a source from events in any order; they are replayed by time.
    pub fn new(mut events: Vec<TimedEvent>) -> Self {
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            pending: events.into(),
            held: BTreeSet::new(),
        }
    }

    /// Parses a JSON script.
    pub fn from_json(json: &str) -> Result<Self, EnvError> {
        parse_events(json).map(Self::new)
    }

    /// Loads a JSON script from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        load_events(path).map(Self::new)
    }

    /// Events not yet delivered.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, now: Duration) -> FrameInput {
        let now = now.as_secs_f64();
        let mut input = FrameInput::idle();
        let mut tapped = BTreeSet::new();

        while let Some(next) = self.pending.front() {
            if next.at > now {
                break;
            }
            let Some(timed) = self.pending.pop_front() else {
                break;
            };

            debug!("Script t={:.3}: {:?}", timed.at, timed.event);
            match timed.event {
                InputEvent::KeyDown { key } => {
                    self.held.insert(key);
                    tapped.insert(key);
                }
                InputEvent::KeyUp { key } => {
                    self.held.remove(&key);
                }
                InputEvent::CursorMoved { x, y } => input.cursor = Some((x, y)),
                InputEvent::Scroll { dy } => input.scroll += dy,
                InputEvent::CloseRequested => input.close_requested = true,
            }
        }

        // BTreeSet iteration is ordered, so keys_down stays sorted
        input.keys_down = self.held.union(&tapped).copied().collect();
        input
    }
}

/// Parses and validates a JSON event list.
pub fn parse_events(json: &str) -> Result<Vec<TimedEvent>, EnvError> {
    let events: Vec<TimedEvent> = serde_json::from_str(json).map_err(|e| EnvError::invalid_script(e.to_string()))?;

    if let Some(bad) = events.iter().find(|e| !e.at.is_finite() || e.at < 0.0) {
        return Err(EnvError::invalid_script(format!(
            "event time {} is not a non-negative number",
            bad.at
        )));
    }
    Ok(events)
}

/// Reads and validates a JSON event list from disk.
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<TimedEvent>, EnvError> {
    let json = std::fs::read_to_string(path)?;
    parse_events(&json)
}

/// Builds a press-and-hold pair for `key`.
pub fn hold(key: Key, from: f64, until: f64) -> [TimedEvent; 2] {
    [
        TimedEvent {
            at: from,
            event: InputEvent::KeyDown { key },
        },
        TimedEvent {
            at: until,
            event: InputEvent::KeyUp { key },
        },
    ]
}

/// Builds a short tap of `key` at `at`.
pub fn tap(key: Key, at: f64) -> [TimedEvent; 2] {
    hold(key, at, at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_hold_spans_frames() {
        let mut input = ScriptedInput::new(hold(Key::W, 1.0, 2.0).to_vec());

        assert!(!input.poll(secs(0.5)).is_down(Key::W));
        assert!(input.poll(secs(1.0)).is_down(Key::W));
        assert!(input.poll(secs(1.5)).is_down(Key::W));
        assert!(!input.poll(secs(2.0)).is_down(Key::W));
        assert!(input.is_finished());
    }

    #[test]
    fn test_tap_within_one_frame_is_seen() {
        let mut input = ScriptedInput::new(tap(Key::Space, 0.31).to_vec());
        assert!(input.poll(secs(0.4)).is_down(Key::Space));
        assert!(!input.poll(secs(0.5)).is_down(Key::Space));
    }

    #[test]
    fn test_cursor_scroll_close() {
        let events = vec![
            TimedEvent { at: 0.1, event: InputEvent::CursorMoved { x: 10.0, y: 20.0 } },
            TimedEvent { at: 0.2, event: InputEvent::CursorMoved { x: 15.0, y: 25.0 } },
            TimedEvent { at: 0.2, event: InputEvent::Scroll { dy: 1.0 } },
            TimedEvent { at: 0.3, event: InputEvent::Scroll { dy: 2.0 } },
            TimedEvent { at: 0.9, event: InputEvent::CloseRequested },
        ];
        let mut input = ScriptedInput::new(events);

        let frame = input.poll(secs(0.5));
        assert_eq!(frame.cursor, Some((15.0, 25.0)));
        assert_eq!(frame.scroll, 3.0);
        assert!(!frame.close_requested);

        let frame = input.poll(secs(1.0));
        assert_eq!(frame.cursor, None);
        assert!(frame.close_requested);
    }

    #[test]
    fn test_unsorted_events_replay_in_time_order() {
        let mut events = hold(Key::D, 2.0, 3.0).to_vec();
        events.extend(hold(Key::A, 0.0, 1.0));
        let mut input = ScriptedInput::new(events);

        let frame = input.poll(secs(0.5));
        assert_eq!(frame.keys_down, vec![Key::A]);
        let frame = input.poll(secs(2.5));
        assert_eq!(frame.keys_down, vec![Key::D]);
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"at": 0.5, "type": "key_down", "key": "keypad_add"},
            {"at": 0.6, "type": "key_up", "key": "keypad_add"},
            {"at": 1.0, "type": "scroll", "dy": -1.0}
        ]"#;
        let input = ScriptedInput::from_json(json).unwrap();
        assert_eq!(input.remaining(), 3);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(ScriptedInput::from_json("{not json"), Err(EnvError::InvalidScript(_))));

        let negative = r#"[{"at": -1.0, "type": "close_requested"}]"#;
        assert!(matches!(ScriptedInput::from_json(negative), Err(EnvError::InvalidScript(_))));
    }

    #[test]
    fn test_from_missing_file() {
        let result = ScriptedInput::from_file("/nonexistent/trackshot/script.json");
        assert!(matches!(result, Err(EnvError::Io(_))));
    }
}
