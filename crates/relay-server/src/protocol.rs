//! WebSocket wire frames
//!
//! Tagged JSON frames exchanged over the push transport. These are pure
//! data; all behavior lives in the socket handler. Field names are
//! camelCase to match the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use signalhub_room_core::{ChatMessage, ParticipantId, SignalKind, SignalMessage};

/// Frames a client sends over the socket
///
/// The signal payload is a `Value` rather than a raw slice: the tag field
/// forces serde to buffer the frame before picking the variant, and raw
/// slices cannot be recovered from buffered input. The socket handler
/// re-encodes it at the relay boundary.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Post a broadcast message to the room
    Chat { text: String },
    /// Post a directed signaling message
    Signal {
        to: String,
        kind: SignalKind,
        payload: Value,
    },
    /// Announce screen-share state to the rest of the room. Transient:
    /// relayed to current connections and never written to any log.
    ScreenShare { active: bool },
    /// Leave the room without tearing the socket down first
    Leave,
}

/// Frames the server delivers to a client.
///
/// Serialize-only: the signal variant embeds a raw payload slice, which
/// writes out fine but cannot come back through a tagged deserialize.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Membership snapshot, sent once right after the connection joins
    RoomUsers { users: Vec<ParticipantId> },
    /// Another participant joined the room
    #[serde(rename_all = "camelCase")]
    UserJoined { user_id: ParticipantId },
    /// A participant left, expired or disconnected
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: ParticipantId },
    /// A broadcast message was posted to the room
    Chat { message: ChatMessage },
    /// A signaling message addressed to this connection's participant
    Signal { message: SignalMessage },
    /// Screen-share state change from another participant
    #[serde(rename_all = "camelCase")]
    ScreenShare {
        user_id: ParticipantId,
        active: bool,
    },
    /// The server could not act on an inbound frame
    Error { message: String },
}
