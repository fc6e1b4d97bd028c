// Error handling for the player facade

use std::fmt;

/// Facade error types.
///
/// Only construction can fail synchronously. Everything after construction
/// is fire-and-forget: native-engine failures come back asynchronously as
/// error events, and commands on a released facade are silent no-ops.
#[derive(Debug, Clone)]
pub enum PlayerError {
    /// The native layer could not allocate an engine instance
    EngineCreate(String),

    /// The event delivery worker could not be spawned
    Thread(String),
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayerError::EngineCreate(msg) => write!(f, "engine create error: {}", msg),
            PlayerError::Thread(msg) => write!(f, "thread error: {}", msg),
        }
    }
}

impl std::error::Error for PlayerError {}

/// Result type alias for facade operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Error categories reported by the native engine.
///
/// These arrive as the `code` field of an error event; `extra` usually
/// carries the underlying library's own error value.
pub mod codes {
    pub const UNKNOWN: i32 = -1;
    /// Opening the input failed
    pub const SOURCE_OPEN: i32 = 1;
    /// Reading stream info failed
    pub const STREAM_INFO: i32 = 2;
    /// No audio or video stream found
    pub const NO_STREAM: i32 = 3;
    /// Decoder could not be opened
    pub const DECODER_OPEN: i32 = 4;
    /// Packet read failed or was interrupted
    pub const DEMUX: i32 = 5;
    /// Decode failure
    pub const DECODE: i32 = 6;
    /// Renderer initialization failed
    pub const RENDER: i32 = 7;
    /// Internal state machine or thread fault
    pub const INTERNAL: i32 = 99;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::EngineCreate("out of memory".to_string());
        assert_eq!(err.to_string(), "engine create error: out of memory");
    }
}
