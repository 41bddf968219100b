//! Room directory
//!
//! Process-wide table of active rooms. Rooms are created lazily by the first
//! join and removed when the last participant leaves, so a room exists
//! exactly while it has members (the reaper additionally removes rooms whose
//! empty shell outlived the idle window).
//!
//! The table is a concurrent map whose per-entry locks give each operation
//! room-level atomicity without serializing unrelated rooms. Events are
//! published only after the entry lock has been released.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::RelayConfig;
use crate::errors::{RelayError, Result};
use crate::events::{LeaveReason, RemoveReason, RoomEvent, RoomEventHandler};
use crate::room::{Participant, Room};
use crate::types::{ParticipantId, RoomId};

/// Owns all room state and performs every membership mutation.
///
/// Message relay operations live on this same type (see the relay module);
/// they go through the same per-room entry locks.
pub struct RoomDirectory {
    /// Active rooms
    pub(crate) rooms: Arc<DashMap<RoomId, Room>>,
    /// Log bounds and reaper windows
    pub(crate) config: RelayConfig,
    /// Event handlers, keyed by registration name
    event_handlers: Arc<RwLock<Vec<(String, Arc<dyn RoomEventHandler>)>>>,
}

impl RoomDirectory {
    /// Create an empty directory.
    pub fn new(config: RelayConfig) -> Self {
        info!(
            chat_cap = config.chat_log_cap,
            signal_cap = config.signal_log_cap,
            "creating room directory"
        );
        Self {
            rooms: Arc::new(DashMap::new()),
            config,
            event_handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Directory configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Add a participant to a room, creating the room if needed.
    ///
    /// Re-joining is idempotent: it refreshes the participant's liveness
    /// stamp and does not duplicate the membership or re-announce it.
    pub async fn join(&self, room_id: &RoomId, participant_id: &ParticipantId) -> Result<()> {
        if room_id.as_str().is_empty() {
            return Err(RelayError::invalid_input("room id must not be empty"));
        }
        if participant_id.as_str().is_empty() {
            return Err(RelayError::invalid_input(
                "participant id must not be empty",
            ));
        }

        let now = Utc::now();
        let mut created = false;
        let rejoined;
        {
            let mut entry = self.rooms.entry(room_id.clone()).or_insert_with(|| {
                created = true;
                Room::new(room_id.clone(), now)
            });
            let room = entry.value_mut();
            rejoined = room.participants.contains_key(participant_id);
            if rejoined {
                room.touch(participant_id, now);
            } else {
                room.participants.insert(
                    participant_id.clone(),
                    Participant::new(participant_id.clone(), now),
                );
            }
        }

        if created {
            debug!(room = %room_id, "room created");
            self.publish_event(RoomEvent::RoomCreated {
                room_id: room_id.clone(),
            })
            .await;
        }
        if rejoined {
            debug!(room = %room_id, participant = %participant_id, "re-join refreshed liveness");
        } else {
            info!(room = %room_id, participant = %participant_id, "participant joined");
            self.publish_event(RoomEvent::ParticipantJoined {
                room_id: room_id.clone(),
                participant_id: participant_id.clone(),
            })
            .await;
        }
        Ok(())
    }

    /// Remove a participant from a room.
    ///
    /// Succeeds as a no-op when the room or the membership does not exist.
    /// When the last participant leaves, the room itself is removed and
    /// becomes indistinguishable from one that was never created.
    pub async fn leave(&self, room_id: &RoomId, participant_id: &ParticipantId) -> Result<()> {
        if participant_id.as_str().is_empty() {
            return Err(RelayError::invalid_input(
                "participant id must not be empty",
            ));
        }

        let mut removed_member = false;
        let mut emptied = false;
        if let Some(mut entry) = self.rooms.get_mut(room_id) {
            let room = entry.value_mut();
            removed_member = room.participants.remove(participant_id).is_some();
            emptied = removed_member && room.participants.is_empty();
        }

        // Re-check emptiness under the entry lock: a join that slipped in
        // between the two acquisitions keeps the room alive.
        let removed_room = emptied
            && self
                .rooms
                .remove_if(room_id, |_, room| room.participants.is_empty())
                .is_some();

        if removed_member {
            info!(room = %room_id, participant = %participant_id, "participant left");
            self.publish_event(RoomEvent::ParticipantLeft {
                room_id: room_id.clone(),
                participant_id: participant_id.clone(),
                reason: LeaveReason::Left,
            })
            .await;
        }
        if removed_room {
            debug!(room = %room_id, "room emptied and removed");
            self.publish_event(RoomEvent::RoomRemoved {
                room_id: room_id.clone(),
                reason: RemoveReason::Emptied,
            })
            .await;
        }
        Ok(())
    }

    /// Current members of a room. Empty for unknown rooms.
    pub fn list_participants(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.rooms
            .get(room_id)
            .map(|room| room.participants.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Refresh a member's liveness stamp. No-op for unknown rooms or
    /// non-members.
    pub fn touch(&self, room_id: &RoomId, participant_id: &ParticipantId) {
        if let Some(mut entry) = self.rooms.get_mut(room_id) {
            entry.value_mut().touch(participant_id, Utc::now());
        }
    }

    /// Whether a room currently exists.
    pub fn room_exists(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Register an event handler under a name.
    pub async fn add_event_handler(&self, name: &str, handler: Arc<dyn RoomEventHandler>) {
        let mut handlers = self.event_handlers.write().await;
        handlers.push((name.to_string(), handler));
        debug!(handler = name, total = handlers.len(), "event handler added");
    }

    /// Remove a handler by name. Returns whether one was removed.
    pub async fn remove_event_handler(&self, name: &str) -> bool {
        let mut handlers = self.event_handlers.write().await;
        let before = handlers.len();
        handlers.retain(|(n, _)| n != name);
        before != handlers.len()
    }

    /// Number of registered event handlers.
    pub async fn event_handler_count(&self) -> usize {
        self.event_handlers.read().await.len()
    }

    /// Deliver an event to every registered handler, in registration order.
    pub(crate) async fn publish_event(&self, event: RoomEvent) {
        let handlers = self.event_handlers.read().await;
        for (_, handler) in handlers.iter() {
            handler.handle_event(event.clone()).await;
        }
    }
}

impl std::fmt::Debug for RoomDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomDirectory")
            .field("rooms", &self.rooms.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> RoomDirectory {
        RoomDirectory::new(RelayConfig::default())
    }

    #[tokio::test]
    async fn test_join_creates_room_lazily() {
        let dir = directory();
        let room = RoomId::from("daily");

        assert!(!dir.room_exists(&room));
        dir.join(&room, &ParticipantId::from("alice")).await.unwrap();
        assert!(dir.room_exists(&room));
        assert_eq!(dir.room_count(), 1);
    }

    #[tokio::test]
    async fn test_rejoin_does_not_duplicate() {
        let dir = directory();
        let room = RoomId::from("daily");
        let alice = ParticipantId::from("alice");

        dir.join(&room, &alice).await.unwrap();
        dir.join(&room, &alice).await.unwrap();
        assert_eq!(dir.list_participants(&room), vec![alice]);
    }

    #[tokio::test]
    async fn test_last_leave_removes_room() {
        let dir = directory();
        let room = RoomId::from("daily");
        let alice = ParticipantId::from("alice");
        let bob = ParticipantId::from("bob");

        dir.join(&room, &alice).await.unwrap();
        dir.join(&room, &bob).await.unwrap();

        dir.leave(&room, &alice).await.unwrap();
        assert!(dir.room_exists(&room));
        dir.leave(&room, &bob).await.unwrap();
        assert!(!dir.room_exists(&room));
    }

    #[tokio::test]
    async fn test_leave_unknown_room_is_noop() {
        let dir = directory();
        dir.leave(&RoomId::from("ghost"), &ParticipantId::from("alice"))
            .await
            .unwrap();
        assert_eq!(dir.room_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let dir = directory();
        let err = dir
            .join(&RoomId::from(""), &ParticipantId::from("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));

        let err = dir
            .join(&RoomId::from("daily"), &ParticipantId::from(""))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }
}
