//! Session control operations
//!
//! **Responsibilities:**
//! - Opening a room session around an acquired sink
//! - Skip, pause and resume of the current track
//! - Stop (full teardown of the room)

use roomplay_common::events::{RoomEvent, SessionEndReason, SessionStatus};
use roomplay_common::RoomId;
use tracing::{debug, info};

use super::core::{Room, RoomScheduler};
use super::ControlOutcome;
use crate::error::{Error, Result};
use crate::playback::queue::RoomQueue;
use crate::playback::session::{PlaybackSession, SessionToken};
use crate::sink::{OutputSink, SinkError};

impl RoomScheduler {
    /// Create the room's session, or return the existing one
    ///
    /// A sink acquired for a room that already has a session is released
    /// straight away.
    pub(super) fn open(&mut self, room: RoomId, mut sink: Box<dyn OutputSink>) -> SessionToken {
        if let Some(existing) = self.rooms.get(&room) {
            debug!(room = %room, "Session already open, releasing extra sink");
            sink.release();
            return existing.session.token().clone();
        }

        let token = SessionToken::new(self.next_epoch);
        self.next_epoch += 1;
        info!(room = %room, epoch = token.epoch(), "Session opened");

        self.rooms.insert(
            room,
            Room {
                queue: RoomQueue::new(),
                session: PlaybackSession::new(room, sink, token.clone()),
            },
        );
        self.emit(RoomEvent::SessionOpened {
            room,
            timestamp: roomplay_common::time::now(),
        });
        token
    }

    /// Halt the current track; its completion drives the next drain
    pub(super) fn skip(&mut self, room: RoomId) -> Result<ControlOutcome> {
        info!(room = %room, "Skip command received");
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        if entry.session.skip() {
            Ok(ControlOutcome::Applied)
        } else {
            debug!(room = %room, status = %entry.session.status(), "Nothing to skip");
            Ok(ControlOutcome::NothingToSkip)
        }
    }

    pub(super) fn pause(&mut self, room: RoomId) -> Result<ControlOutcome> {
        info!(room = %room, "Pause command received");
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        match entry.session.pause() {
            Ok(true) => {
                self.state_changed(room, SessionStatus::Playing, SessionStatus::Paused);
                Ok(ControlOutcome::Applied)
            }
            Ok(false) => Ok(ControlOutcome::NothingToPause),
            Err(e) => Err(self.output_failed(room, e)),
        }
    }

    pub(super) fn resume(&mut self, room: RoomId) -> Result<ControlOutcome> {
        info!(room = %room, "Resume command received");
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        match entry.session.resume() {
            Ok(true) => {
                self.state_changed(room, SessionStatus::Paused, SessionStatus::Playing);
                Ok(ControlOutcome::Applied)
            }
            Ok(false) => Ok(ControlOutcome::NothingToResume),
            Err(e) => Err(self.output_failed(room, e)),
        }
    }

    /// Tear the room down; false when it had no session
    pub(super) fn stop(&mut self, room: RoomId) -> bool {
        info!(room = %room, "Stop command received");
        self.end_session(room, SessionEndReason::Stopped)
    }

    fn state_changed(&self, room: RoomId, old_state: SessionStatus, new_state: SessionStatus) {
        self.emit(RoomEvent::PlaybackStateChanged {
            room,
            old_state,
            new_state,
            timestamp: roomplay_common::time::now(),
        });
    }

    /// A pause/resume hit a dead sink: end the session and report it
    fn output_failed(&mut self, room: RoomId, cause: SinkError) -> Error {
        let current = self
            .rooms
            .get(&room)
            .and_then(|r| r.session.current().cloned());
        self.sink_lost(room, current, cause.clone());
        Error::SinkUnavailable(cause)
    }
}
