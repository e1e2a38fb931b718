//! Per-room playback session state machine
//!
//! ```text
//!            drain             bind ok
//!   Idle ──────────▶ Draining ─────────▶ Playing ◀──▶ Paused
//!    ▲                  │                   │           │
//!    └── stream error ──┘                   └─ finished ┘
//! ```
//!
//! The session only records transitions. Deciding when to drain, and what
//! to emit, belongs to the scheduler loop.

use roomplay_common::events::SessionStatus;
use roomplay_common::{RoomId, Track};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::playback::events::LoopEvent;
use crate::resolver::StreamHandle;
use crate::sink::{OutputSink, PlaybackCompletion, SinkError};

/// Identity of one room session
///
/// A new session always gets a new epoch. Background work started under a
/// session carries its token: cancellation is observable through
/// [`cancelled`](Self::cancelled), and events tagged with an older epoch are
/// dropped by the loop.
#[derive(Debug, Clone)]
pub struct SessionToken {
    epoch: u64,
    cancel: CancellationToken,
}

impl SessionToken {
    pub(crate) fn new(epoch: u64) -> Self {
        Self {
            epoch,
            cancel: CancellationToken::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Token cancelled together with the session (or on its own)
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session has ended
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Binding of one room to its output sink
pub struct PlaybackSession {
    room: RoomId,
    sink: Box<dyn OutputSink>,
    token: SessionToken,
    status: SessionStatus,
    /// Track bound to the sink (Playing or Paused)
    current: Option<Track>,
    /// Track whose stream handle is being fetched (Draining)
    pending: Option<Track>,
    /// Incremented on every bind
    generation: u64,
    /// Incremented on every drain step
    drain_attempt: u64,
    /// Output was halted; waiting for the sink's completion
    halting: bool,
}

impl PlaybackSession {
    pub fn new(room: RoomId, sink: Box<dyn OutputSink>, token: SessionToken) -> Self {
        Self {
            room,
            sink,
            token,
            status: SessionStatus::Idle,
            current: None,
            pending: None,
            generation: 0,
            drain_attempt: 0,
            halting: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<&Track> {
        self.pending.as_ref()
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn epoch(&self) -> u64 {
        self.token.epoch
    }

    /// Idle → Draining; returns the attempt number of this drain step
    pub(crate) fn begin_drain(&mut self, track: Track) -> u64 {
        debug_assert_eq!(self.status, SessionStatus::Idle);
        self.status = SessionStatus::Draining;
        self.pending = Some(track);
        self.drain_attempt += 1;
        self.drain_attempt
    }

    /// Whether `attempt` is the drain step still waiting for its stream
    pub(crate) fn is_current_drain(&self, attempt: u64) -> bool {
        self.status == SessionStatus::Draining && self.drain_attempt == attempt
    }

    /// Draining → Idle after the stream handle could not be fetched
    pub(crate) fn abort_drain(&mut self) -> Option<Track> {
        self.status = SessionStatus::Idle;
        self.pending.take()
    }

    /// Draining → Playing
    ///
    /// Hands the stream to the sink together with a completion notifier for
    /// this bind's generation. On a sink error the session drops back to
    /// Idle.
    pub(crate) fn bind(
        &mut self,
        stream: StreamHandle,
        loop_tx: &mpsc::UnboundedSender<LoopEvent>,
    ) -> Result<(), SinkError> {
        self.generation += 1;
        self.pending = None;
        self.halting = false;
        let track = stream.track.clone();
        let completion =
            PlaybackCompletion::new(self.room, self.token.epoch, self.generation, loop_tx.clone());

        match self.sink.bind(stream, completion) {
            Ok(()) => {
                self.status = SessionStatus::Playing;
                self.current = Some(track);
                Ok(())
            }
            Err(e) => {
                self.status = SessionStatus::Idle;
                Err(e)
            }
        }
    }

    /// Whether `generation` is the bind currently on the sink
    pub(crate) fn is_current_playback(&self, generation: u64) -> bool {
        self.status.is_active() && self.generation == generation
    }

    /// Playing/Paused → Idle; returns the track that was playing
    pub(crate) fn finish_playback(&mut self) -> Option<Track> {
        self.status = SessionStatus::Idle;
        self.halting = false;
        self.current.take()
    }

    /// Halt sink output if something is playing
    ///
    /// The session stays Playing until the sink's completion arrives, and
    /// ignores further skip, pause and resume until then.
    pub(crate) fn skip(&mut self) -> bool {
        if self.status != SessionStatus::Playing || self.halting {
            return false;
        }
        self.halting = true;
        self.sink.halt_output();
        true
    }

    /// Whether a skip is waiting for the sink to report the halt
    pub fn is_halting(&self) -> bool {
        self.halting
    }

    /// Playing → Paused; `Ok(false)` when not playing
    pub(crate) fn pause(&mut self) -> Result<bool, SinkError> {
        if self.status != SessionStatus::Playing || self.halting {
            return Ok(false);
        }
        self.sink.pause_output()?;
        self.status = SessionStatus::Paused;
        Ok(true)
    }

    /// Paused → Playing; `Ok(false)` when not paused
    pub(crate) fn resume(&mut self) -> Result<bool, SinkError> {
        if self.status != SessionStatus::Paused || self.halting {
            return Ok(false);
        }
        self.sink.resume_output()?;
        self.status = SessionStatus::Playing;
        Ok(true)
    }

    /// Cancel the token, halt output and release the sink
    pub(crate) fn close(mut self) {
        self.token.cancel();
        if self.status.is_active() {
            self.sink.halt_output();
        }
        self.sink.release();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("room", &self.room)
            .field("epoch", &self.token.epoch)
            .field("status", &self.status)
            .field("current", &self.current)
            .field("generation", &self.generation)
            .field("halting", &self.halting)
            .finish()
    }
}
