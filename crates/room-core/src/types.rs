//! Core identifier and message types
//!
//! Identifiers are thin string newtypes. Rooms and participants are keyed by
//! caller-supplied strings (a URL, a display name, a device id), so the
//! wrappers exist for type safety rather than for any generated format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

/// Unique identifier for a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    /// Generate a new random room ID
    pub fn new() -> Self {
        Self(format!("room-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a participant within a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a relayed message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new random message ID
    pub fn new() -> Self {
        Self(format!("msg-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque signaling payload, stored and relayed verbatim.
///
/// The relay never inspects this. SDP offers, ICE candidates and anything
/// else a client wants to hand its peer all travel through the same slot.
pub type SignalPayload = Box<RawValue>;

/// Kind tag on a directed signaling message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// WebRTC SDP offer
    Offer,
    /// WebRTC SDP answer
    Answer,
    /// ICE candidate
    Candidate,
    /// Announce to an existing peer that the sender has joined
    JoinNotice,
    /// Announce that the sender is leaving
    LeaveNotice,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
            SignalKind::JoinNotice => "join-notice",
            SignalKind::LeaveNotice => "leave-notice",
        };
        write!(f, "{}", s)
    }
}

/// A broadcast chat message, visible to every participant in the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned unique ID
    pub id: MessageId,
    /// Participant who posted the message
    pub sender_id: ParticipantId,
    /// Message body
    pub text: String,
    /// Server-assigned receipt time, unix milliseconds. Doubles as the
    /// since-cursor axis for incremental reads.
    pub timestamp: i64,
}

/// A directed signaling message, visible only to its addressee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    /// Server-assigned unique ID
    pub id: MessageId,
    /// Sending participant
    pub from_id: ParticipantId,
    /// Addressed participant. Reads filter on this; other participants
    /// never observe the entry.
    pub to_id: ParticipantId,
    /// Message kind tag
    pub kind: SignalKind,
    /// Opaque payload, relayed verbatim
    pub payload: SignalPayload,
    /// Server-assigned receipt time, unix milliseconds
    pub timestamp: i64,
}
