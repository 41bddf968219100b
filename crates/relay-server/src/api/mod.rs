//! Delivery transport surface
//!
//! One router carries both transports: the pull-style JSON routes and the
//! WebSocket upgrade. `create_router` is exposed so tests can drive the app
//! in-process without a listener.

pub mod rooms;
pub mod ws;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Build the transport router over shared state.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/rooms/:room_id/join", post(rooms::join_room))
        .route("/api/rooms/:room_id/leave", post(rooms::leave_room))
        .route("/api/rooms/:room_id/users", get(rooms::list_users))
        .route(
            "/api/rooms/:room_id/messages",
            get(rooms::list_messages).post(rooms::post_message),
        )
        .route(
            "/api/rooms/:room_id/signaling",
            get(rooms::list_signaling).post(rooms::post_signaling),
        )
        .route("/api/rooms/:room_id/ws", get(ws::ws_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub rooms: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        rooms: state.directory.room_count(),
    })
}
