//! Queue operations
//!
//! **Responsibilities:**
//! - Appending tracks (user requests and background enrichment)
//! - Clear and shuffle
//! - Queue snapshots for display
//! - QueueChanged event emission

use roomplay_common::events::{QueueChangeTrigger, RoomEvent, SessionStatus};
use roomplay_common::{RoomId, Track};
use tracing::{debug, info};

use super::core::RoomScheduler;
use super::QueueSnapshot;
use crate::error::{Error, Result};

impl RoomScheduler {
    /// Append tracks and start draining if the room is idle
    ///
    /// With `epoch` set, the append is rejected as `NoSession` unless the
    /// room's current session is that epoch, so work started under a
    /// stopped session never lands in a newer one.
    pub(super) fn enqueue(
        &mut self,
        room: RoomId,
        tracks: Vec<Track>,
        trigger: QueueChangeTrigger,
        epoch: Option<u64>,
    ) -> Result<usize> {
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        if let Some(epoch) = epoch {
            if entry.session.epoch() != epoch {
                debug!(room = %room, epoch, "Rejecting append for ended session");
                return Err(Error::NoSession(room));
            }
        }

        let appended = entry.queue.append(tracks);
        if appended == 0 {
            return Ok(0);
        }
        let len = entry.queue.len();
        let idle = entry.session.status() == SessionStatus::Idle;
        debug!(room = %room, appended, len, %trigger, "Tracks enqueued");

        self.queue_changed(room, len, trigger);
        if idle {
            self.drain(room)?;
        }
        Ok(appended)
    }

    /// Empty the queue; the current track keeps playing
    pub(super) fn clear(&mut self, room: RoomId) -> Result<usize> {
        info!(room = %room, "Clear queue command received");
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        let removed = entry.queue.clear();
        if removed > 0 {
            self.queue_changed(room, 0, QueueChangeTrigger::Clear);
        }
        Ok(removed)
    }

    /// Permute the queue; false when it has fewer than two tracks
    pub(super) fn shuffle(&mut self, room: RoomId) -> Result<bool> {
        info!(room = %room, "Shuffle command received");
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        let shuffled = entry.queue.shuffle(&mut self.rng);
        let len = entry.queue.len();
        if shuffled {
            self.queue_changed(room, len, QueueChangeTrigger::Shuffle);
        }
        Ok(shuffled)
    }

    pub(super) fn snapshot(&self, room: RoomId, limit: usize) -> Option<QueueSnapshot> {
        let entry = self.rooms.get(&room)?;
        Some(QueueSnapshot {
            room,
            status: entry.session.status(),
            now_playing: entry.session.current().cloned(),
            loading: entry.session.pending().cloned(),
            upcoming: entry.queue.snapshot(limit),
            total: entry.queue.len(),
        })
    }

    fn queue_changed(&self, room: RoomId, len: usize, trigger: QueueChangeTrigger) {
        self.emit(RoomEvent::QueueChanged {
            room,
            len,
            trigger,
            timestamp: roomplay_common::time::now(),
        });
    }
}

