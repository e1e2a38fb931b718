//! Background enrichment of deferred playlists
//!
//! An enricher walks a [`DeferredBatch`] one item at a time (a single
//! resolution in flight, so provider rate limits are respected) and appends
//! each resolved track to its room through the scheduler. Appends are tagged
//! with the session epoch the batch was started under: once that session is
//! stopped every further append is rejected and the enricher halts quietly.

use roomplay_common::events::{QueueChangeTrigger, RoomEvent};
use roomplay_common::RoomId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::scheduler::SchedulerHandle;
use super::session::SessionToken;
use crate::error::Error;
use crate::resolver::{BatchItem, ResolverPool};

/// Loose descriptors waiting for background resolution
#[derive(Debug, Clone)]
pub struct DeferredBatch {
    pub id: Uuid,
    pub room: RoomId,
    pub items: Vec<BatchItem>,
}

impl DeferredBatch {
    pub fn new(room: RoomId, items: Vec<BatchItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room,
            items,
        }
    }
}

/// Progress of a background batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Running { appended: usize, remaining: usize },
    /// Every item was attempted
    Completed { appended: usize },
    /// The room session ended (or the batch was cancelled) mid-run
    Halted { appended: usize },
}

impl BatchState {
    /// Tracks appended so far
    pub fn appended(&self) -> usize {
        match self {
            BatchState::Running { appended, .. }
            | BatchState::Completed { appended }
            | BatchState::Halted { appended } => *appended,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, BatchState::Running { .. })
    }
}

/// Supervision handle for one background batch
pub struct BatchHandle {
    id: Uuid,
    room: RoomId,
    state: watch::Receiver<BatchState>,
    cancel: CancellationToken,
    task: JoinHandle<BatchState>,
}

impl BatchHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    /// Latest reported state
    pub fn state(&self) -> BatchState {
        *self.state.borrow()
    }

    /// Stop this batch without touching the room session
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the batch to finish and return its final state
    pub async fn wait(self) -> BatchState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                warn!(batch_id = %self.id, "Enrichment task failed: {}", e);
                let appended = self.state.borrow().appended();
                BatchState::Halted { appended }
            }
        }
    }
}

impl std::fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHandle")
            .field("id", &self.id)
            .field("room", &self.room)
            .field("state", &self.state())
            .finish()
    }
}

/// Resolves a deferred batch and feeds the room queue
pub struct BackgroundEnricher {
    batch: DeferredBatch,
    epoch: u64,
    cancel: CancellationToken,
    pool: ResolverPool,
    scheduler: SchedulerHandle,
    state: watch::Sender<BatchState>,
}

impl BackgroundEnricher {
    /// Start enriching `batch` under the session identified by `token`
    ///
    /// The batch is cancelled together with the session.
    pub fn spawn(
        batch: DeferredBatch,
        token: &SessionToken,
        pool: ResolverPool,
        scheduler: SchedulerHandle,
    ) -> BatchHandle {
        let initial = BatchState::Running {
            appended: 0,
            remaining: batch.items.len(),
        };
        let (state_tx, state_rx) = watch::channel(initial);
        let cancel = token.child_token();
        let id = batch.id;
        let room = batch.room;

        let enricher = BackgroundEnricher {
            batch,
            epoch: token.epoch(),
            cancel: cancel.clone(),
            pool,
            scheduler,
            state: state_tx,
        };
        let task = tokio::spawn(enricher.run());

        BatchHandle {
            id,
            room,
            state: state_rx,
            cancel,
            task,
        }
    }

    async fn run(self) -> BatchState {
        let room = self.batch.room;
        let batch_id = self.batch.id;
        let total = self.batch.items.len();
        let mut appended = 0;

        info!(room = %room, %batch_id, items = total, "Background enrichment started");

        for (index, item) in self.batch.items.iter().enumerate() {
            let remaining = total - index - 1;
            if self.cancel.is_cancelled() {
                return self.halt(appended);
            }

            let resolved = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.halt(appended),
                result = self.pool.resolve_one(item.search_query()) => result,
            };

            let track = match resolved {
                Ok(track) => track,
                Err(e) => {
                    warn!(room = %room, %batch_id, item = %item.title, "Skipping unresolvable item: {}", e);
                    self.state.send_replace(BatchState::Running { appended, remaining });
                    continue;
                }
            };

            match self
                .scheduler
                .append_for_session(room, self.epoch, vec![track], QueueChangeTrigger::BackgroundEnrichment)
                .await
            {
                Ok(_) => {
                    appended += 1;
                    self.state.send_replace(BatchState::Running { appended, remaining });
                    self.scheduler.events().emit_lossy(RoomEvent::BatchProgress {
                        room,
                        batch_id,
                        appended,
                        remaining,
                        timestamp: roomplay_common::time::now(),
                    });
                }
                Err(Error::NoSession(_)) | Err(Error::SchedulerClosed) => {
                    return self.halt(appended);
                }
                Err(e) => {
                    warn!(room = %room, %batch_id, "Append rejected: {}", e);
                }
            }
        }

        info!(room = %room, %batch_id, appended, total, "Background enrichment completed");
        let done = BatchState::Completed { appended };
        self.state.send_replace(done);
        self.scheduler.events().emit_lossy(RoomEvent::BatchComplete {
            room,
            batch_id,
            total_appended: appended,
            timestamp: roomplay_common::time::now(),
        });
        done
    }

    fn halt(&self, appended: usize) -> BatchState {
        debug!(room = %self.batch.room, batch_id = %self.batch.id, appended, "Background enrichment halted");
        let halted = BatchState::Halted { appended };
        self.state.send_replace(halted);
        halted
    }
}
