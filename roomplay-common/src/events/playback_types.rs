//! Playback-related type definitions
//!
//! Supporting types for the per-room playback session state machine.

use serde::{Deserialize, Serialize};

/// Playback session status
///
/// Transitions:
/// - Idle → Draining: a drain step popped a track and is fetching its stream
/// - Draining → Playing: stream bound to the sink
/// - Draining → Idle: queue exhausted or stream fetch failed
/// - Playing ↔ Paused: pause / resume
/// - Playing | Paused → Idle: playback finished, skipped or failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing playing, no drain in flight
    #[default]
    Idle,
    /// A track is bound to the sink and producing output
    Playing,
    /// A track is bound to the sink but output is suspended
    Paused,
    /// The head of the queue is being turned into a stream handle
    Draining,
}

impl SessionStatus {
    /// Whether a track currently occupies the sink
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Playing | SessionStatus::Paused)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Playing => write!(f, "playing"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Draining => write!(f, "draining"),
        }
    }
}
