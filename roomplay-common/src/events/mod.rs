//! Event types for the roomplay event system
//!
//! Provides the outbound event definitions consumed by front-ends and the
//! EventBus that distributes them.

mod playback_types;
mod queue_types;

pub use playback_types::SessionStatus;
pub use queue_types::{QueueChangeTrigger, SessionEndReason};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{RoomId, Track};

/// Outbound room events
///
/// Every event carries the room it concerns so a front-end serving several
/// rooms can route user-facing messages. Serialized with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// A playback session was opened for the room (sink acquired)
    SessionOpened {
        room: RoomId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was bound to the sink and started playing
    NowPlaying {
        room: RoomId,
        track: Track,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A drain step found nothing left to play
    ///
    /// Not an error: the room stays open with an empty queue.
    QueueExhausted {
        room: RoomId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track could not be played
    ///
    /// `recoverable == true` means the queue keeps going with the next item;
    /// `false` means the room session is about to end.
    TrackError {
        room: RoomId,
        track: Track,
        cause: String,
        recoverable: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed (Playing ↔ Paused)
    PlaybackStateChanged {
        room: RoomId,
        old_state: SessionStatus,
        new_state: SessionStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed
    QueueChanged {
        room: RoomId,
        /// Queue length after the change
        len: usize,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A background batch appended another track
    BatchProgress {
        room: RoomId,
        batch_id: Uuid,
        /// Tracks appended by this batch so far
        appended: usize,
        /// Items still waiting for resolution
        remaining: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A background batch ran to completion
    ///
    /// Never emitted for a batch that was halted because its session ended.
    BatchComplete {
        room: RoomId,
        batch_id: Uuid,
        total_appended: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The room session ended and its sink was released
    SessionEnded {
        room: RoomId,
        reason: SessionEndReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RoomEvent {
    /// Room this event concerns
    pub fn room(&self) -> RoomId {
        match self {
            RoomEvent::SessionOpened { room, .. }
            | RoomEvent::NowPlaying { room, .. }
            | RoomEvent::QueueExhausted { room, .. }
            | RoomEvent::TrackError { room, .. }
            | RoomEvent::PlaybackStateChanged { room, .. }
            | RoomEvent::QueueChanged { room, .. }
            | RoomEvent::BatchProgress { room, .. }
            | RoomEvent::BatchComplete { room, .. }
            | RoomEvent::SessionEnded { room, .. } => *room,
        }
    }

    /// Event type name as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::SessionOpened { .. } => "SessionOpened",
            RoomEvent::NowPlaying { .. } => "NowPlaying",
            RoomEvent::QueueExhausted { .. } => "QueueExhausted",
            RoomEvent::TrackError { .. } => "TrackError",
            RoomEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            RoomEvent::QueueChanged { .. } => "QueueChanged",
            RoomEvent::BatchProgress { .. } => "BatchProgress",
            RoomEvent::BatchComplete { .. } => "BatchComplete",
            RoomEvent::SessionEnded { .. } => "SessionEnded",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the scheduler loop)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use roomplay_common::events::{EventBus, RoomEvent};
/// use roomplay_common::RoomId;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(RoomEvent::QueueExhausted {
///     room: RoomId(1),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "QueueExhausted");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RoomEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: RoomEvent) -> Result<usize, broadcast::error::SendError<RoomEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RoomEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured per-subscriber capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
