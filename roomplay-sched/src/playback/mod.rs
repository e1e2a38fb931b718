//! Room playback: queues, sessions, the scheduler loop and background
//! enrichment

pub mod enricher;
pub(crate) mod events;
pub mod queue;
pub mod request;
pub mod scheduler;
pub mod session;

pub use enricher::{BackgroundEnricher, BatchHandle, BatchState, DeferredBatch};
pub use queue::RoomQueue;
pub use request::{EnrichmentPolicy, SubmitOutcome};
pub use scheduler::{AdvanceOutcome, ControlOutcome, QueueSnapshot, RoomScheduler, SchedulerHandle};
pub use session::{PlaybackSession, SessionToken};
