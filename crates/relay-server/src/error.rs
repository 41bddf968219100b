//! Server error types and their HTTP mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use signalhub_room_core::RelayError;

/// Errors surfaced by the delivery transports
#[derive(Error, Debug)]
pub enum ServerError {
    /// A required request field was missing or empty
    #[error("{0}")]
    BadRequest(String),

    /// Core relay failure, mapped onto a status by kind
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Listener or serve failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ServerError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Every error renders as `{"error": "..."}` with the matching status, the
/// shape the browser client expects.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ServerError::Relay(RelayError::InvalidInput(message)) => {
                (StatusCode::BAD_REQUEST, message)
            }
            ServerError::Relay(RelayError::RoomNotFound(_)) => {
                (StatusCode::NOT_FOUND, "Room not found".to_string())
            }
            ServerError::Relay(RelayError::InternalError(message)) => {
                error!(%message, "internal relay error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Transport(message) => {
                error!(%message, "transport error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
