//! # signalhub-room-core
//!
//! Room membership directory, message relay and liveness reaper for the
//! signalhub signaling server.
//!
//! This crate provides:
//! - Room and participant lifecycle (join/leave/expire)
//! - A bounded broadcast (chat) log and a bounded directed (signaling) log
//!   per room, with since-cursor reads for polling clients
//! - A background reaper that drops stale signaling entries, expires silent
//!   participants and removes long-idle empty rooms
//! - Room events behind a handler trait, so a push transport can deliver
//!   messages as they are posted without the core knowing about sockets
//!
//! ## Architecture
//!
//! The directory owns all room state. Every caller-facing operation (join,
//! leave, append-and-trim, filter-read) runs under a single per-room entry
//! lock, so operations are atomic with respect to each other and to the
//! reaper without serializing unrelated rooms. Signaling payloads are opaque
//! blobs; the relay routes them by recipient and never parses them.

pub mod config;
pub mod directory;
pub mod errors;
pub mod events;
pub mod reaper;
pub mod room;
pub mod types;

mod relay;

pub use config::RelayConfig;
pub use directory::RoomDirectory;
pub use errors::{RelayError, Result};
pub use events::{LeaveReason, RemoveReason, RoomEvent, RoomEventHandler};
pub use reaper::{Reaper, SweepStats};
pub use room::{Participant, Room};
pub use types::{
    ChatMessage, MessageId, ParticipantId, RoomId, SignalKind, SignalMessage, SignalPayload,
};
