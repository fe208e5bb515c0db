//! Error types for track lookup, track editing and configuration loading.
//!
//! Fuel or tire exhaustion is not represented here: running dry is simulated
//! degradation handled by the physics step, not a failure.

use thiserror::Error;

/// Result type alias for track and layout operations.
pub type TrackResult<T> = Result<T, TrackError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised when looking up or editing a track.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// No built-in track has this id.
    #[error("unknown track id: {0}")]
    UnknownTrack(String),

    /// A closed racing line needs at least three control nodes.
    #[error("track needs at least {required} nodes, got {actual}")]
    TooFewNodes { required: usize, actual: usize },

    /// Editor addressed a node that does not exist.
    #[error("node index {index} out of range for {len} nodes")]
    NodeIndexOutOfRange { index: usize, len: usize },

    /// Editing was attempted without the editor debug option.
    #[error("track editor is disabled for this session")]
    EditorDisabled,

    /// Operation needs a race but none has been initialized.
    #[error("no race initialized")]
    NoRace,
}

impl TrackError {
    /// Create an unknown track error.
    #[must_use]
    pub fn unknown_track(id: impl Into<String>) -> Self {
        Self::UnknownTrack(id.into())
    }
}

/// Errors raised when reading a tuning file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File content is not valid config JSON.
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value parsed but is outside its legal range.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}
