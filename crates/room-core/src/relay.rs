//! Message relay operations
//!
//! Append-and-trim writes and filter-reads over the two per-room logs. These
//! live on `RoomDirectory` so every mutation goes through the same per-room
//! entry lock as membership changes.
//!
//! Reads never mutate the logs; bounds are enforced on write (and stale
//! signaling entries are additionally dropped by the reaper). A read on an
//! unknown room returns an empty list rather than an error, so a poller
//! whose room was reaped degrades quietly instead of erroring out.

use chrono::Utc;
use tracing::debug;

use crate::directory::RoomDirectory;
use crate::errors::{RelayError, Result};
use crate::events::RoomEvent;
use crate::types::{
    ChatMessage, MessageId, ParticipantId, RoomId, SignalKind, SignalMessage, SignalPayload,
};

impl RoomDirectory {
    /// Append a broadcast message to a room's chat log.
    ///
    /// The server assigns the ID and the timestamp. Posting counts as
    /// liveness-bearing activity for the sender.
    pub async fn post_chat(
        &self,
        room_id: &RoomId,
        sender_id: &ParticipantId,
        text: &str,
    ) -> Result<ChatMessage> {
        if sender_id.as_str().is_empty() {
            return Err(RelayError::invalid_input("sender id must not be empty"));
        }
        if text.is_empty() {
            return Err(RelayError::invalid_input("message text must not be empty"));
        }

        let message = {
            let Some(mut entry) = self.rooms.get_mut(room_id) else {
                return Err(RelayError::room_not_found(room_id.as_str()));
            };
            let room = entry.value_mut();
            let now = Utc::now();
            let message = ChatMessage {
                id: MessageId::new(),
                sender_id: sender_id.clone(),
                text: text.to_string(),
                timestamp: now.timestamp_millis(),
            };
            room.append_chat(message.clone(), self.config.chat_log_cap);
            room.touch(sender_id, now);
            message
        };

        debug!(room = %room_id, sender = %sender_id, id = %message.id, "chat posted");
        self.publish_event(RoomEvent::ChatPosted {
            room_id: room_id.clone(),
            message: message.clone(),
        })
        .await;
        Ok(message)
    }

    /// Read a room's chat log, oldest first.
    ///
    /// With `since`, only messages stamped strictly later than the cursor
    /// are returned. Unknown rooms read as empty.
    pub fn list_chat(&self, room_id: &RoomId, since: Option<i64>) -> Vec<ChatMessage> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        match since {
            Some(cursor) => room
                .chat_log
                .iter()
                .filter(|m| m.timestamp > cursor)
                .cloned()
                .collect(),
            None => room.chat_log.clone(),
        }
    }

    /// Append a directed signaling message to a room's signaling log.
    ///
    /// The payload is stored verbatim; the relay never parses it. Neither
    /// the sender nor the addressee is required to be a member, which lets
    /// a joining client signal peers before its own join settles.
    pub async fn post_signal(
        &self,
        room_id: &RoomId,
        from_id: &ParticipantId,
        to_id: &ParticipantId,
        kind: SignalKind,
        payload: SignalPayload,
    ) -> Result<SignalMessage> {
        if from_id.as_str().is_empty() {
            return Err(RelayError::invalid_input("sender id must not be empty"));
        }
        if to_id.as_str().is_empty() {
            return Err(RelayError::invalid_input("recipient id must not be empty"));
        }

        let message = {
            let Some(mut entry) = self.rooms.get_mut(room_id) else {
                return Err(RelayError::room_not_found(room_id.as_str()));
            };
            let room = entry.value_mut();
            let now = Utc::now();
            let message = SignalMessage {
                id: MessageId::new(),
                from_id: from_id.clone(),
                to_id: to_id.clone(),
                kind,
                payload,
                timestamp: now.timestamp_millis(),
            };
            room.append_signal(message.clone(), self.config.signal_log_cap);
            room.touch(from_id, now);
            message
        };

        debug!(
            room = %room_id, from = %from_id, to = %to_id, kind = %kind,
            "signal posted"
        );
        self.publish_event(RoomEvent::SignalPosted {
            room_id: room_id.clone(),
            message: message.clone(),
        })
        .await;
        Ok(message)
    }

    /// Read the signaling messages addressed to one participant, oldest
    /// first.
    ///
    /// Only entries whose addressee matches `recipient_id` are visible;
    /// traffic between other peers never appears. With `since`, only
    /// entries stamped strictly later than the cursor are returned.
    /// Polling counts as liveness-bearing activity for the recipient.
    /// Unknown rooms read as empty.
    pub fn list_signals(
        &self,
        room_id: &RoomId,
        recipient_id: &ParticipantId,
        since: Option<i64>,
    ) -> Vec<SignalMessage> {
        let Some(mut entry) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        let room = entry.value_mut();
        room.touch(recipient_id, Utc::now());
        room.signal_log
            .iter()
            .filter(|m| m.to_id == *recipient_id)
            .filter(|m| since.is_none_or(|cursor| m.timestamp > cursor))
            .cloned()
            .collect()
    }
}
