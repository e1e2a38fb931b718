//! Room scheduler
//!
//! **Module Structure:**
//! - `core.rs`: scheduler loop, room table, drain step, loop-event handling
//! - `queue.rs`: queue operations (enqueue, clear, shuffle, snapshot)
//! - `control.rs`: session control (open, skip, pause, resume, stop)
//! - `handle.rs`: cloneable [`SchedulerHandle`] used by callers and enrichers
//!
//! All room state lives in one task. Callers talk to it through
//! [`Command`]s carrying a oneshot reply; worker tasks and sinks report back
//! through internal loop events. Nothing inside the loop awaits a provider
//! or a sink.

mod control;
mod core;
mod handle;
mod queue;

pub use self::core::RoomScheduler;
pub use handle::SchedulerHandle;

use roomplay_common::events::{QueueChangeTrigger, SessionStatus};
use roomplay_common::{RoomId, Track};
use serde::Serialize;
use tokio::sync::oneshot;

use super::session::SessionToken;
use crate::error::Result;
use crate::sink::OutputSink;

/// Result of an explicit `advance`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The head was popped and its stream is being fetched
    Started(Track),
    /// A drain step is already in flight, or a track is playing
    Busy,
    /// Nothing left to play; `QueueExhausted` was emitted
    Exhausted,
}

/// Result of skip / pause / resume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Applied,
    NothingToSkip,
    NothingToPause,
    NothingToResume,
}

impl ControlOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ControlOutcome::Applied)
    }
}

/// Point-in-time view of one room
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub room: RoomId,
    pub status: SessionStatus,
    /// Track bound to the sink
    pub now_playing: Option<Track>,
    /// Track whose stream is being fetched
    pub loading: Option<Track>,
    /// First queued tracks, up to the requested limit
    pub upcoming: Vec<Track>,
    /// Total number of queued tracks
    pub total: usize,
}

/// Requests processed by the scheduler loop
pub(crate) enum Command {
    Open {
        room: RoomId,
        sink: Box<dyn OutputSink>,
        reply: oneshot::Sender<SessionToken>,
    },
    Enqueue {
        room: RoomId,
        tracks: Vec<Track>,
        trigger: QueueChangeTrigger,
        /// Reject unless the room's session has this epoch
        epoch: Option<u64>,
        reply: oneshot::Sender<Result<usize>>,
    },
    Advance {
        room: RoomId,
        reply: oneshot::Sender<Result<AdvanceOutcome>>,
    },
    Skip {
        room: RoomId,
        reply: oneshot::Sender<Result<ControlOutcome>>,
    },
    Pause {
        room: RoomId,
        reply: oneshot::Sender<Result<ControlOutcome>>,
    },
    Resume {
        room: RoomId,
        reply: oneshot::Sender<Result<ControlOutcome>>,
    },
    Clear {
        room: RoomId,
        reply: oneshot::Sender<Result<usize>>,
    },
    Shuffle {
        room: RoomId,
        reply: oneshot::Sender<Result<bool>>,
    },
    Stop {
        room: RoomId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        room: RoomId,
        limit: usize,
        reply: oneshot::Sender<Option<QueueSnapshot>>,
    },
    Token {
        room: RoomId,
        reply: oneshot::Sender<Option<SessionToken>>,
    },
    Rooms {
        reply: oneshot::Sender<Vec<RoomId>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl Command {
    /// Short name for logging
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::Enqueue { .. } => "enqueue",
            Command::Advance { .. } => "advance",
            Command::Skip { .. } => "skip",
            Command::Pause { .. } => "pause",
            Command::Resume { .. } => "resume",
            Command::Clear { .. } => "clear",
            Command::Shuffle { .. } => "shuffle",
            Command::Stop { .. } => "stop",
            Command::Snapshot { .. } => "snapshot",
            Command::Token { .. } => "token",
            Command::Rooms { .. } => "rooms",
            Command::Shutdown { .. } => "shutdown",
        }
    }
}
