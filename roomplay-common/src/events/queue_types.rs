//! Queue and session lifecycle type definitions

use serde::{Deserialize, Serialize};

/// Why a room queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// Tracks appended by a request
    UserEnqueue,
    /// Tracks appended by a background enricher
    BackgroundEnrichment,
    /// Head popped by a drain step
    Advance,
    /// Queue emptied by `clear`
    Clear,
    /// Queue permuted by `shuffle`
    Shuffle,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::UserEnqueue => write!(f, "UserEnqueue"),
            QueueChangeTrigger::BackgroundEnrichment => write!(f, "BackgroundEnrichment"),
            QueueChangeTrigger::Advance => write!(f, "Advance"),
            QueueChangeTrigger::Clear => write!(f, "Clear"),
            QueueChangeTrigger::Shuffle => write!(f, "Shuffle"),
        }
    }
}

/// Why a room session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SessionEndReason {
    /// Explicit `stop` request
    Stopped,
    /// The output sink went away; requires reconnection by the host
    SinkLost,
    /// Scheduler shutdown
    Shutdown,
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEndReason::Stopped => write!(f, "Stopped"),
            SessionEndReason::SinkLost => write!(f, "SinkLost"),
            SessionEndReason::Shutdown => write!(f, "Shutdown"),
        }
    }
}
