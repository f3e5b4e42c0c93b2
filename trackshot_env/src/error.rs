//! Error types for the TrackShot environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// An input script could not be parsed or is inconsistent
    #[error("Invalid input script: {0}")]
    InvalidScript(String),
    
    /// Reading or writing an environment resource failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Creates an invalid-script error.
    pub fn invalid_script(msg: impl Into<String>) -> Self {
        Self::InvalidScript(msg.into())
    }
}
