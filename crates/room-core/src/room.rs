//! Room and participant records
//!
//! These are plain data owned by the directory. Nothing outside this crate
//! holds a reference to a live `Room`; callers observe rooms only through
//! directory operations, which snapshot what they return.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::{ChatMessage, ParticipantId, RoomId, SignalMessage};

/// A participant's membership record within one room
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    /// When the participant first joined this room
    pub joined_at: DateTime<Utc>,
    /// Last liveness-bearing activity (join, post, poll, socket frame)
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    pub(crate) fn new(id: ParticipantId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            joined_at: now,
            last_seen: now,
        }
    }
}

/// One room: its membership and its two bounded message logs
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub participants: HashMap<ParticipantId, Participant>,
    /// Broadcast log, oldest first
    pub chat_log: Vec<ChatMessage>,
    /// Directed signaling log, oldest first
    pub signal_log: Vec<SignalMessage>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub(crate) fn new(id: RoomId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            participants: HashMap::new(),
            chat_log: Vec::new(),
            signal_log: Vec::new(),
            created_at,
        }
    }

    /// Append a chat message, dropping the oldest entries beyond `cap`.
    pub(crate) fn append_chat(&mut self, message: ChatMessage, cap: usize) {
        self.chat_log.push(message);
        if self.chat_log.len() > cap {
            let excess = self.chat_log.len() - cap;
            self.chat_log.drain(..excess);
        }
    }

    /// Append a signaling message, dropping the oldest entries beyond `cap`.
    pub(crate) fn append_signal(&mut self, message: SignalMessage, cap: usize) {
        self.signal_log.push(message);
        if self.signal_log.len() > cap {
            let excess = self.signal_log.len() - cap;
            self.signal_log.drain(..excess);
        }
    }

    /// Refresh a member's liveness stamp. No-op for non-members.
    pub(crate) fn touch(&mut self, participant_id: &ParticipantId, now: DateTime<Utc>) {
        if let Some(participant) = self.participants.get_mut(participant_id) {
            participant.last_seen = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageId;

    fn chat(n: usize) -> ChatMessage {
        ChatMessage {
            id: MessageId(format!("msg-{}", n)),
            sender_id: ParticipantId::from("alice"),
            text: format!("message {}", n),
            timestamp: n as i64,
        }
    }

    #[test]
    fn test_append_chat_drops_oldest_beyond_cap() {
        let mut room = Room::new(RoomId::from("r"), Utc::now());
        for n in 0..5 {
            room.append_chat(chat(n), 3);
        }
        assert_eq!(room.chat_log.len(), 3);
        let texts: Vec<&str> = room.chat_log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["message 2", "message 3", "message 4"]);
    }

    #[test]
    fn test_touch_ignores_non_members() {
        let mut room = Room::new(RoomId::from("r"), Utc::now());
        room.touch(&ParticipantId::from("ghost"), Utc::now());
        assert!(room.participants.is_empty());
    }
}
