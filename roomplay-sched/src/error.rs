//! Error types for roomplay-sched
//!
//! Failure taxonomy:
//! - `Resolution`: a provider could not resolve a query, playlist or stream
//!   handle. Always recoverable; the room moves on to the next item.
//! - `SinkUnavailable`: no output binding exists or the connection dropped.
//!   Terminal for the room session.
//! - An empty queue is not an error; it is reported as `QueueExhausted`.

use roomplay_common::RoomId;
use thiserror::Error;

use crate::resolver::ResolutionError;
use crate::sink::SinkError;

/// Main error type for roomplay-sched
#[derive(Error, Debug)]
pub enum Error {
    /// Query, playlist or stream-handle resolution failed
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Output sink could not be acquired or dropped its connection
    #[error("Sink unavailable: {0}")]
    SinkUnavailable(#[from] SinkError),

    /// Operation needs a playback session the room does not have
    #[error("No playback session for {0}")]
    NoSession(RoomId),

    /// Scheduler loop has shut down
    #[error("Scheduler is not running")]
    SchedulerClosed,

    /// Error from roomplay-common
    #[error(transparent)]
    Common(#[from] roomplay_common::Error),
}

impl Error {
    /// Whether the room keeps its session after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::SinkUnavailable(_) | Error::SchedulerClosed)
    }
}

/// Convenience Result type using roomplay-sched Error
pub type Result<T> = std::result::Result<T, Error>;
