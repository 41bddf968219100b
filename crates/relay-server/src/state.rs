//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

use signalhub_room_core::RoomDirectory;

use crate::connections::ConnectionRegistry;

/// State shared by every HTTP and WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    /// The relay core; all room state lives here
    pub directory: Arc<RoomDirectory>,
    /// Live WebSocket connections for push delivery
    pub connections: ConnectionRegistry,
    /// Process start, for the health report
    pub started_at: Instant,
}

impl AppState {
    pub fn new(directory: Arc<RoomDirectory>, connections: ConnectionRegistry) -> Self {
        Self {
            directory,
            connections,
            started_at: Instant::now(),
        }
    }
}
