//! Error types for the room core

use thiserror::Error;

/// Errors returned by directory and relay operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A required identifier or field was missing or empty
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The operation targeted a room that does not exist (never created,
    /// emptied out, or removed by the reaper)
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RelayError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a room not found error
    pub fn room_not_found(room_id: impl Into<String>) -> Self {
        Self::RoomNotFound(room_id.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

/// Result type for room core operations
pub type Result<T> = std::result::Result<T, RelayError>;
