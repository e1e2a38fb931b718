//! Output sink binding
//!
//! The scheduler never produces audio. It asks the host (a voice connection,
//! a speaker group, the demo's timed sink) for one [`OutputSink`] per room
//! and only ever binds a stream to it, halts, pauses, resumes, and finally
//! releases it.
//!
//! Sink methods are called from the scheduler loop and must not block: a
//! sink starts playback on its own task and reports the end of the track
//! through the [`PlaybackCompletion`] it was given at bind time.

mod timed;

pub use timed::TimedSinkHost;

use async_trait::async_trait;
use roomplay_common::RoomId;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::playback::events::LoopEvent;
use crate::resolver::StreamHandle;

/// Output binding failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The host has no connection for this room
    #[error("{0} has no output connection")]
    NotConnected(RoomId),

    /// The connection dropped while in use
    #[error("output connection dropped: {0}")]
    Disconnected(String),

    /// A stream is still bound to this sink
    #[error("output is already playing")]
    Busy,
}

/// How a bound stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Reached the natural end of the track
    Finished,
    /// Stopped early by `halt_output` (skip)
    Halted,
    /// Playback broke off with an error
    Failed(String),
}

/// Hands out output sinks, one per room
#[async_trait]
pub trait SinkHost: Send + Sync + 'static {
    /// Connect an output for `room`
    async fn acquire(&self, room: RoomId) -> Result<Box<dyn OutputSink>, SinkError>;
}

/// A single room's output
pub trait OutputSink: Send + 'static {
    /// Start playing `stream`; `completion` must be fired exactly once when
    /// the stream ends for any reason
    fn bind(&mut self, stream: StreamHandle, completion: PlaybackCompletion) -> Result<(), SinkError>;

    /// Stop the current stream; its completion fires with `Halted`
    fn halt_output(&mut self);

    fn pause_output(&mut self) -> Result<(), SinkError>;

    fn resume_output(&mut self) -> Result<(), SinkError>;

    /// Disconnect; the sink is not used again afterwards
    fn release(&mut self);
}

/// One-shot end-of-track notifier handed to a sink at bind time
///
/// Consumed by value, so a sink cannot report twice. Dropping it without
/// calling [`complete`](Self::complete) reports a failed playback, which
/// keeps the room from stalling when a sink loses track of its stream.
pub struct PlaybackCompletion {
    room: RoomId,
    epoch: u64,
    generation: u64,
    tx: Option<mpsc::UnboundedSender<LoopEvent>>,
}

impl PlaybackCompletion {
    pub(crate) fn new(
        room: RoomId,
        epoch: u64,
        generation: u64,
        tx: mpsc::UnboundedSender<LoopEvent>,
    ) -> Self {
        Self {
            room,
            epoch,
            generation,
            tx: Some(tx),
        }
    }

    /// Room the bound stream belongs to
    pub fn room(&self) -> RoomId {
        self.room
    }

    /// Report how the stream ended
    pub fn complete(mut self, outcome: PlaybackOutcome) {
        self.send(outcome);
    }

    /// Shorthand for a natural end of track
    pub fn finished(self) {
        self.complete(PlaybackOutcome::Finished);
    }

    fn send(&mut self, outcome: PlaybackOutcome) {
        if let Some(tx) = self.tx.take() {
            // Closed loop means the scheduler shut down; nothing left to advance
            let _ = tx.send(LoopEvent::PlaybackFinished {
                room: self.room,
                epoch: self.epoch,
                generation: self.generation,
                outcome,
            });
        }
    }
}

impl Drop for PlaybackCompletion {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!(room = %self.room, "Sink dropped playback completion without reporting");
            self.send(PlaybackOutcome::Failed(
                "sink dropped completion notifier".to_string(),
            ));
        }
    }
}

impl std::fmt::Debug for PlaybackCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCompletion")
            .field("room", &self.room)
            .field("epoch", &self.epoch)
            .field("generation", &self.generation)
            .field("pending", &self.tx.is_some())
            .finish()
    }
}
