//! Relay configuration
//!
//! Log bounds and reaper windows. Defaults match what small standup-style
//! rooms need; tests shrink the windows to milliseconds.

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

/// Configuration for the room directory, relay logs and reaper.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Most recent broadcast (chat) messages retained per room
    pub chat_log_cap: usize,
    /// Most recent directed (signaling) messages retained per room
    pub signal_log_cap: usize,
    /// Signaling entries older than this are dropped on reaper sweeps
    pub signal_freshness_ms: u64,
    /// Participants silent for longer than this are expired from their room
    pub participant_liveness_ms: u64,
    /// Empty rooms older than this are removed outright
    pub room_max_idle_ms: u64,
    /// Cadence of the background reaper sweep
    pub reap_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chat_log_cap: 100,
            signal_log_cap: 50,
            signal_freshness_ms: 5 * 60 * 1000,
            participant_liveness_ms: 30 * 1000,
            room_max_idle_ms: 2 * 60 * 60 * 1000,
            reap_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl RelayConfig {
    /// Set the chat log bound
    pub fn with_chat_log_cap(mut self, cap: usize) -> Self {
        self.chat_log_cap = cap;
        self
    }

    /// Set the signaling log bound
    pub fn with_signal_log_cap(mut self, cap: usize) -> Self {
        self.signal_log_cap = cap;
        self
    }

    /// Set the signaling freshness window in milliseconds
    pub fn with_signal_freshness_ms(mut self, ms: u64) -> Self {
        self.signal_freshness_ms = ms;
        self
    }

    /// Set the participant liveness window in milliseconds
    pub fn with_participant_liveness_ms(mut self, ms: u64) -> Self {
        self.participant_liveness_ms = ms;
        self
    }

    /// Set the maximum idle lifetime of an empty room in milliseconds
    pub fn with_room_max_idle_ms(mut self, ms: u64) -> Self {
        self.room_max_idle_ms = ms;
        self
    }

    /// Set the reaper sweep cadence in milliseconds
    pub fn with_reap_interval_ms(mut self, ms: u64) -> Self {
        self.reap_interval_ms = ms;
        self
    }

    /// Signaling freshness window as a time delta
    pub fn signal_freshness(&self) -> Duration {
        Duration::milliseconds(self.signal_freshness_ms as i64)
    }

    /// Participant liveness window as a time delta
    pub fn participant_liveness(&self) -> Duration {
        Duration::milliseconds(self.participant_liveness_ms as i64)
    }

    /// Maximum idle lifetime as a time delta
    pub fn room_max_idle(&self) -> Duration {
        Duration::milliseconds(self.room_max_idle_ms as i64)
    }

    /// Reaper sweep cadence as a std duration, for timers
    pub fn reap_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.reap_interval_ms)
    }
}
