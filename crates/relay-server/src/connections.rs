//! Live connection registry and the push delivery bridge
//!
//! The registry maps each room to the send halves of its open sockets. A
//! participant may hold several connections at once (tabs, devices); each
//! registers separately and is removed by its own id. Dropping a
//! connection's sender is how the registry tells that socket's pump task to
//! close the socket, so expiry and room removal propagate to clients
//! without extra bookkeeping.
//!
//! `PushEventHandler` subscribes to room events and translates them into
//! frames: chat and membership fan out to the whole room, signaling only to
//! the addressee's connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use signalhub_room_core::{ParticipantId, RoomEvent, RoomEventHandler, RoomId};

use crate::protocol::ServerFrame;

/// Send half of one socket's outbound queue
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

struct Connection {
    id: u64,
    participant_id: ParticipantId,
    sender: ConnectionSender,
}

/// Registry of live WebSocket connections, keyed by room.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    rooms: Arc<DashMap<RoomId, Vec<Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. The returned id removes exactly this one.
    pub fn register(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        sender: ConnectionSender,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .push(Connection {
                id,
                participant_id: participant_id.clone(),
                sender,
            });
        debug!(room = %room_id, participant = %participant_id, connection = id, "ws registered");
        id
    }

    /// Drop one connection, releasing the room's slot when it empties.
    pub fn unregister(&self, room_id: &RoomId, connection_id: u64) {
        if let Some(mut entry) = self.rooms.get_mut(room_id) {
            entry.value_mut().retain(|c| c.id != connection_id);
        }
        self.rooms.remove_if(room_id, |_, conns| conns.is_empty());
    }

    /// Drop every connection a participant holds in a room.
    pub fn drop_participant(&self, room_id: &RoomId, participant_id: &ParticipantId) {
        if let Some(mut entry) = self.rooms.get_mut(room_id) {
            entry
                .value_mut()
                .retain(|c| c.participant_id != *participant_id);
        }
        self.rooms.remove_if(room_id, |_, conns| conns.is_empty());
    }

    /// Drop every connection in a room.
    pub fn drop_room(&self, room_id: &RoomId) {
        self.rooms.remove(room_id);
    }

    /// Live connections in a room.
    pub fn connection_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map(|c| c.len()).unwrap_or(0)
    }

    /// Ping every registered connection, returning how many were pinged.
    ///
    /// The pong that comes back refreshes the participant's liveness stamp,
    /// so a connected client stays a member without sending frames of its
    /// own. Browsers cannot initiate pings, so the server has to.
    pub fn ping_all(&self) -> usize {
        let mut pinged = 0;
        for conns in self.rooms.iter() {
            for conn in conns.iter() {
                let _ = conn.sender.send(Message::Ping(Vec::new()));
                pinged += 1;
            }
        }
        pinged
    }

    /// Send a frame to every connection in a room. With `skip`, that
    /// participant's connections are passed over (used for frames that echo
    /// the sender's own action back).
    pub fn broadcast(&self, room_id: &RoomId, frame: &ServerFrame, skip: Option<&ParticipantId>) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(room = %room_id, error = %e, "dropping unencodable frame");
                return;
            }
        };
        if let Some(conns) = self.rooms.get(room_id) {
            for conn in conns.iter() {
                if skip.is_some_and(|p| conn.participant_id == *p) {
                    continue;
                }
                let _ = conn.sender.send(Message::Text(text.clone()));
            }
        }
    }

    /// Send a frame to one participant's connections only.
    pub fn send_to(&self, room_id: &RoomId, participant_id: &ParticipantId, frame: &ServerFrame) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(room = %room_id, error = %e, "dropping unencodable frame");
                return;
            }
        };
        if let Some(conns) = self.rooms.get(room_id) {
            for conn in conns.iter() {
                if conn.participant_id == *participant_id {
                    let _ = conn.sender.send(Message::Text(text.clone()));
                }
            }
        }
    }

    /// Send a frame to exactly one connection. Silently dropped when the
    /// connection is already gone.
    pub fn send_to_connection(&self, room_id: &RoomId, connection_id: u64, frame: &ServerFrame) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(room = %room_id, error = %e, "dropping unencodable frame");
                return;
            }
        };
        if let Some(conns) = self.rooms.get(room_id) {
            if let Some(conn) = conns.iter().find(|c| c.id == connection_id) {
                let _ = conn.sender.send(Message::Text(text));
            }
        }
    }
}

/// Bridges room events onto live sockets.
pub struct PushEventHandler {
    connections: ConnectionRegistry,
}

impl PushEventHandler {
    pub fn new(connections: ConnectionRegistry) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl RoomEventHandler for PushEventHandler {
    async fn handle_event(&self, event: RoomEvent) {
        match event {
            RoomEvent::ParticipantJoined {
                room_id,
                participant_id,
            } => {
                // The joiner learns the membership from its snapshot frame.
                let frame = ServerFrame::UserJoined {
                    user_id: participant_id.clone(),
                };
                self.connections
                    .broadcast(&room_id, &frame, Some(&participant_id));
            }
            RoomEvent::ParticipantLeft {
                room_id,
                participant_id,
                ..
            } => {
                // Cut the departed participant's sockets loose before
                // announcing to the rest of the room.
                self.connections.drop_participant(&room_id, &participant_id);
                let frame = ServerFrame::UserLeft {
                    user_id: participant_id,
                };
                self.connections.broadcast(&room_id, &frame, None);
            }
            RoomEvent::ChatPosted { room_id, message } => {
                self.connections
                    .broadcast(&room_id, &ServerFrame::Chat { message }, None);
            }
            RoomEvent::SignalPosted { room_id, message } => {
                let recipient = message.to_id.clone();
                self.connections
                    .send_to(&room_id, &recipient, &ServerFrame::Signal { message });
            }
            RoomEvent::RoomRemoved { room_id, .. } => {
                self.connections.drop_room(&room_id);
            }
            RoomEvent::RoomCreated { .. } => {}
        }
    }
}
