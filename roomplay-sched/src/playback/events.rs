//! Internal scheduler-loop events (never broadcast)
//!
//! Worker tasks and sinks report back to the scheduler loop with these.
//! Every event carries the session epoch it was started under, so events
//! that outlive their session are recognised and dropped. They are converted
//! into `RoomEvent`s by the loop before anything reaches subscribers.

use roomplay_common::{RoomId, Track};

use crate::resolver::{ResolutionError, StreamHandle};
use crate::sink::PlaybackOutcome;

/// Events fed back into the scheduler loop
#[derive(Debug)]
pub(crate) enum LoopEvent {
    /// A stream-handle fetch started by a drain step finished
    ///
    /// `attempt` identifies the drain step; only the latest one may bind.
    StreamResolved {
        room: RoomId,
        epoch: u64,
        attempt: u64,
        track: Track,
        result: Result<StreamHandle, ResolutionError>,
    },

    /// The sink reported the end of a bound stream
    ///
    /// `generation` identifies the bind; a completion for an older bind is
    /// ignored.
    PlaybackFinished {
        room: RoomId,
        epoch: u64,
        generation: u64,
        outcome: PlaybackOutcome,
    },
}

impl LoopEvent {
    pub(crate) fn room(&self) -> RoomId {
        match self {
            LoopEvent::StreamResolved { room, .. } | LoopEvent::PlaybackFinished { room, .. } => *room,
        }
    }
}
