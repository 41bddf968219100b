//! Liveness reaper
//!
//! Periodic sweep over the room table that enforces the time-based windows:
//! stale signaling entries are dropped, silent participants are expired and
//! long-idle empty rooms are removed. Sweeps take each room's entry lock
//! only briefly and publish events after all locks are released, so a sweep
//! never blocks posts or polls for long and never deadlocks with them.
//!
//! A room that disappears between the key snapshot and its per-room pass is
//! skipped; the rest of the sweep continues.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::directory::RoomDirectory;
use crate::events::{LeaveReason, RemoveReason, RoomEvent};
use crate::types::{ParticipantId, RoomId};

/// Counters for one reaper sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Signaling entries dropped for exceeding the freshness window
    pub stale_signals: usize,
    /// Participants expired for exceeding the liveness window
    pub expired_participants: usize,
    /// Empty rooms removed for exceeding the idle lifetime
    pub removed_rooms: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.stale_signals + self.expired_participants + self.removed_rooms
    }
}

/// Background task that sweeps the directory on a fixed cadence.
///
/// Clones share the running flag, so any clone can stop the task.
#[derive(Clone)]
pub struct Reaper {
    directory: Arc<RoomDirectory>,
    running: Arc<AtomicBool>,
    // Bumped on stop. A task from before a stop/start cycle sees a stale
    // generation at its next tick and exits even though the flag is raised
    // again, so there is never more than one sweep task.
    generation: Arc<AtomicU64>,
}

impl Reaper {
    pub fn new(directory: Arc<RoomDirectory>) -> Self {
        Self {
            directory,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the periodic sweep task. Idempotent while running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let reaper = self.clone();
        let generation = self.generation.load(Ordering::SeqCst);
        let interval = reaper.directory.config().reap_interval();
        info!(interval_ms = interval.as_millis() as u64, "starting reaper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !reaper.running.load(Ordering::SeqCst)
                    || reaper.generation.load(Ordering::SeqCst) != generation
                {
                    break;
                }
                let stats = reaper.sweep().await;
                if stats.total() > 0 {
                    debug!(
                        stale_signals = stats.stale_signals,
                        expired_participants = stats.expired_participants,
                        removed_rooms = stats.removed_rooms,
                        "reaper sweep"
                    );
                }
            }
            debug!("reaper task stopped");
        });
    }

    /// Signal the sweep task to exit at its next tick.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Whether the periodic task is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one sweep over every room now.
    ///
    /// Exposed separately from the periodic task so callers can force a
    /// sweep (and observe its counters) on their own schedule.
    pub async fn sweep(&self) -> SweepStats {
        let config = self.directory.config();
        let now = Utc::now();
        let signal_cutoff_ms = (now - config.signal_freshness()).timestamp_millis();
        let liveness_cutoff = now - config.participant_liveness();
        let idle_cutoff = now - config.room_max_idle();

        let mut stats = SweepStats::default();
        let mut events: Vec<RoomEvent> = Vec::new();

        // Snapshot the keys first; each room is then revisited under its own
        // entry lock so the sweep never holds the whole table.
        let room_ids: Vec<RoomId> = self
            .directory
            .rooms
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for room_id in room_ids {
            if let Some(mut entry) = self.directory.rooms.get_mut(&room_id) {
                let room = entry.value_mut();

                let before = room.signal_log.len();
                room.signal_log.retain(|m| m.timestamp > signal_cutoff_ms);
                stats.stale_signals += before - room.signal_log.len();

                let expired: Vec<ParticipantId> = room
                    .participants
                    .values()
                    .filter(|p| p.last_seen < liveness_cutoff)
                    .map(|p| p.id.clone())
                    .collect();
                for participant_id in expired {
                    room.participants.remove(&participant_id);
                    stats.expired_participants += 1;
                    events.push(RoomEvent::ParticipantLeft {
                        room_id: room_id.clone(),
                        participant_id,
                        reason: LeaveReason::Expired,
                    });
                }
            } else {
                debug!(room = %room_id, "room vanished mid-sweep, skipping");
                continue;
            }

            // Removal re-checks emptiness under the entry lock so a join
            // racing the sweep keeps its room.
            let reaped = self
                .directory
                .rooms
                .remove_if(&room_id, |_, room| {
                    room.participants.is_empty() && room.created_at < idle_cutoff
                })
                .is_some();
            if reaped {
                info!(room = %room_id, "idle room reaped");
                stats.removed_rooms += 1;
                events.push(RoomEvent::RoomRemoved {
                    room_id: room_id.clone(),
                    reason: RemoveReason::Reaped,
                });
            }
        }

        for event in events {
            self.directory.publish_event(event).await;
        }
        stats
    }
}

impl std::fmt::Debug for Reaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaper")
            .field("running", &self.is_running())
            .finish()
    }
}
