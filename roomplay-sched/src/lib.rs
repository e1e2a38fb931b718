//! # roomplay scheduler (roomplay-sched)
//!
//! Per-room sequential playback queue coordinator.
//!
//! **Purpose:** Accept playback requests (search queries, track URLs,
//! playlists), resolve them off the scheduling path, and stream the results
//! one at a time to a single output sink per room, advancing automatically
//! on completion or error.
//!
//! **Architecture:** One scheduler loop task owns every room's queue and
//! session. Provider calls go through a bounded [`ResolverPool`]; large
//! playlists are resolved in the background by supervised enrichers tied to
//! the room's session token.

pub mod config;
pub mod error;
pub mod playback;
pub mod resolver;
pub mod sink;

pub use config::SchedulerConfig;
pub use error::{Error, Result};
pub use playback::{
    AdvanceOutcome, BatchHandle, BatchState, ControlOutcome, EnrichmentPolicy, QueueSnapshot,
    RoomScheduler, SchedulerHandle, SessionToken, SubmitOutcome,
};
pub use resolver::{ResolutionError, ResolverPool, TrackResolver};
pub use sink::{OutputSink, PlaybackCompletion, PlaybackOutcome, SinkError, SinkHost};
