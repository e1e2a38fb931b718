//! Room and track models shared between the scheduler and its collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identity of one output room (a guild voice channel, a speaker group, ...)
///
/// At most one queue and one playback session exist per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("room-").unwrap_or(s);
        digits
            .parse::<u64>()
            .map(RoomId)
            .map_err(|e| Error::InvalidInput(format!("Invalid room id '{}': {}", s, e)))
    }
}

impl From<u64> for RoomId {
    fn from(value: u64) -> Self {
        RoomId(value)
    }
}

/// A playable track descriptor
///
/// Immutable once constructed. A track has no stable key: its identity is
/// its position in a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Human readable title
    pub title: String,

    /// Opaque locator understood by the resolver (page URL, file path, ...)
    pub source_locator: String,

    /// Whether `source_locator` points at a concrete item (false for loose
    /// search descriptors)
    pub resolved: bool,

    /// Known duration in milliseconds, if the provider reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Create a resolved track
    pub fn new(title: impl Into<String>, source_locator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_locator: source_locator.into(),
            resolved: true,
            duration_ms: None,
        }
    }

    /// Attach a known duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
