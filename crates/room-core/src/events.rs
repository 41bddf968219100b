//! Room events
//!
//! The directory and relay publish an event after every observable mutation.
//! Push transports subscribe here to fan messages out to live connections;
//! pull transports ignore events entirely and read the logs on their own
//! schedule. Handlers run inline on the mutating call, after the room lock
//! has been released.

use std::fmt;

use async_trait::async_trait;

use crate::types::{ChatMessage, ParticipantId, RoomId, SignalMessage};

/// Why a participant's membership ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// The participant asked to leave
    Left,
    /// The reaper expired the participant after a silent liveness window
    Expired,
}

/// Why a room was removed from the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReason {
    /// The last participant left
    Emptied,
    /// The reaper removed an empty room past its idle lifetime
    Reaped,
}

/// Events emitted by the room directory and message relay
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A room was lazily created by a first join
    RoomCreated { room_id: RoomId },
    /// A participant joined a room for the first time
    ParticipantJoined {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// A participant's membership ended
    ParticipantLeft {
        room_id: RoomId,
        participant_id: ParticipantId,
        reason: LeaveReason,
    },
    /// A broadcast message was appended to the room's chat log
    ChatPosted { room_id: RoomId, message: ChatMessage },
    /// A directed message was appended to the room's signaling log
    SignalPosted {
        room_id: RoomId,
        message: SignalMessage,
    },
    /// A room was removed from the directory
    RoomRemoved { room_id: RoomId, reason: RemoveReason },
}

impl RoomEvent {
    /// Room the event concerns
    pub fn room_id(&self) -> &RoomId {
        match self {
            RoomEvent::RoomCreated { room_id }
            | RoomEvent::ParticipantJoined { room_id, .. }
            | RoomEvent::ParticipantLeft { room_id, .. }
            | RoomEvent::ChatPosted { room_id, .. }
            | RoomEvent::SignalPosted { room_id, .. }
            | RoomEvent::RoomRemoved { room_id, .. } => room_id,
        }
    }
}

impl fmt::Display for RoomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomEvent::RoomCreated { room_id } => write!(f, "room {} created", room_id),
            RoomEvent::ParticipantJoined {
                room_id,
                participant_id,
            } => write!(f, "{} joined {}", participant_id, room_id),
            RoomEvent::ParticipantLeft {
                room_id,
                participant_id,
                reason,
            } => write!(f, "{} left {} ({:?})", participant_id, room_id, reason),
            RoomEvent::ChatPosted { room_id, message } => {
                write!(f, "chat from {} in {}", message.sender_id, room_id)
            }
            RoomEvent::SignalPosted { room_id, message } => write!(
                f,
                "{} signal {} -> {} in {}",
                message.kind, message.from_id, message.to_id, room_id
            ),
            RoomEvent::RoomRemoved { room_id, reason } => {
                write!(f, "room {} removed ({:?})", room_id, reason)
            }
        }
    }
}

/// Handler for room events.
///
/// Implementations must be cheap or defer to their own queues. Handlers are
/// awaited inline by the publishing operation.
#[async_trait]
pub trait RoomEventHandler: Send + Sync {
    async fn handle_event(&self, event: RoomEvent);
}
