//! Cloneable front door to the scheduler loop
//!
//! Every method sends one [`Command`] and awaits its reply. Provider calls
//! made on behalf of a request (`submit_request`) run here, on the caller's
//! task and through the resolver pool, never inside the loop.

use std::sync::Arc;

use roomplay_common::events::{EventBus, QueueChangeTrigger, RoomEvent, SessionStatus};
use roomplay_common::{RoomId, Track};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use super::{AdvanceOutcome, Command, ControlOutcome, QueueSnapshot};
use crate::error::{Error, Result};
use crate::playback::enricher::{BackgroundEnricher, DeferredBatch};
use crate::playback::request::{EnrichmentPolicy, SubmitOutcome};
use crate::playback::session::SessionToken;
use crate::resolver::{RequestKind, ResolutionError, ResolverPool};
use crate::sink::SinkHost;

/// Handle to a running [`RoomScheduler`](super::RoomScheduler)
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
    events: EventBus,
    pool: ResolverPool,
    sinks: Arc<dyn SinkHost>,
    policy: EnrichmentPolicy,
}

impl SchedulerHandle {
    pub(super) fn new(
        commands: mpsc::Sender<Command>,
        events: EventBus,
        pool: ResolverPool,
        sinks: Arc<dyn SinkHost>,
        policy: EnrichmentPolicy,
    ) -> Self {
        Self {
            commands,
            events,
            pool,
            sinks,
            policy,
        }
    }

    /// Subscribe to room events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn policy(&self) -> EnrichmentPolicy {
        self.policy
    }

    /// Open a session for `room`, acquiring a sink if it has none
    pub async fn join(&self, room: RoomId) -> Result<SessionToken> {
        if let Some(token) = self.session_token(room).await? {
            return Ok(token);
        }
        let sink = self.sinks.acquire(room).await?;
        self.request(|reply| Command::Open { room, sink, reply }).await
    }

    /// Resolve a query or URL and queue the result
    ///
    /// Opens a session when the room has none. Deferred playlists are split
    /// by the enrichment policy; the returned outcome carries the handle of
    /// the background batch resolving the remainder.
    pub async fn submit_request(&self, room: RoomId, query: &str) -> Result<SubmitOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(roomplay_common::Error::InvalidInput("empty request".to_string()).into());
        }

        let token = self.join(room).await?;
        let kind = self.pool.classify(query);
        info!(room = %room, ?kind, query, "Request received");

        let tracks = match kind {
            RequestKind::Search | RequestKind::Direct => {
                vec![self.pool.resolve_one(query.to_string()).await?]
            }
            RequestKind::Playlist => {
                let tracks = self.pool.resolve_playlist(query.to_string()).await?;
                if tracks.is_empty() {
                    return Err(ResolutionError::not_found(format!(
                        "playlist {} has no playable tracks",
                        query
                    ))
                    .into());
                }
                tracks
            }
            RequestKind::DeferredPlaylist => {
                return self.submit_deferred(room, &token, query).await;
            }
        };

        let appended = self
            .append_for_session(room, token.epoch(), tracks, QueueChangeTrigger::UserEnqueue)
            .await?;
        Ok(SubmitOutcome {
            kind,
            appended,
            deferred: None,
        })
    }

    async fn submit_deferred(
        &self,
        room: RoomId,
        token: &SessionToken,
        url: &str,
    ) -> Result<SubmitOutcome> {
        let items = self.pool.expand_batch(url.to_string()).await?;
        if items.is_empty() {
            return Err(ResolutionError::not_found(format!("playlist {} is empty", url)).into());
        }

        let (eager, deferred) = self.policy.split(items);
        let mut tracks = Vec::with_capacity(eager.len());
        let mut last_error = None;
        for item in &eager {
            match self.pool.resolve_one(item.search_query()).await {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    warn!(room = %room, item = %item.title, "Skipping unresolvable item: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if tracks.is_empty() && deferred.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }

        let appended = if tracks.is_empty() {
            0
        } else {
            self.append_for_session(room, token.epoch(), tracks, QueueChangeTrigger::UserEnqueue)
                .await?
        };

        let batch = if deferred.is_empty() {
            None
        } else {
            let batch = DeferredBatch::new(room, deferred);
            info!(room = %room, batch_id = %batch.id, items = batch.items.len(), "Deferring playlist tail");
            Some(BackgroundEnricher::spawn(batch, token, self.pool.clone(), self.clone()))
        };

        Ok(SubmitOutcome {
            kind: RequestKind::DeferredPlaylist,
            appended,
            deferred: batch,
        })
    }

    /// Append already-resolved tracks to an open session
    pub async fn enqueue(&self, room: RoomId, tracks: Vec<Track>) -> Result<usize> {
        self.request(|reply| Command::Enqueue {
            room,
            tracks,
            trigger: QueueChangeTrigger::UserEnqueue,
            epoch: None,
            reply,
        })
        .await?
    }

    /// Append only if `room` is still in session `epoch`
    pub(crate) async fn append_for_session(
        &self,
        room: RoomId,
        epoch: u64,
        tracks: Vec<Track>,
        trigger: QueueChangeTrigger,
    ) -> Result<usize> {
        self.request(|reply| Command::Enqueue {
            room,
            tracks,
            trigger,
            epoch: Some(epoch),
            reply,
        })
        .await?
    }

    /// Run a drain step if the room is idle
    pub async fn advance(&self, room: RoomId) -> Result<AdvanceOutcome> {
        self.request(|reply| Command::Advance { room, reply }).await?
    }

    pub async fn skip(&self, room: RoomId) -> Result<ControlOutcome> {
        self.request(|reply| Command::Skip { room, reply }).await?
    }

    pub async fn pause(&self, room: RoomId) -> Result<ControlOutcome> {
        self.request(|reply| Command::Pause { room, reply }).await?
    }

    pub async fn resume(&self, room: RoomId) -> Result<ControlOutcome> {
        self.request(|reply| Command::Resume { room, reply }).await?
    }

    /// Empty the queue, returning how many tracks were removed
    pub async fn clear(&self, room: RoomId) -> Result<usize> {
        self.request(|reply| Command::Clear { room, reply }).await?
    }

    /// Shuffle the queue; false when there was nothing to permute
    pub async fn shuffle(&self, room: RoomId) -> Result<bool> {
        self.request(|reply| Command::Shuffle { room, reply }).await?
    }

    /// End the room session; false when the room had none
    pub async fn stop(&self, room: RoomId) -> Result<bool> {
        self.request(|reply| Command::Stop { room, reply }).await
    }

    /// Current track plus the first `limit` queued tracks
    pub async fn queue(&self, room: RoomId, limit: usize) -> Result<QueueSnapshot> {
        self.request(|reply| Command::Snapshot { room, limit, reply })
            .await?
            .ok_or(Error::NoSession(room))
    }

    /// Session status, `None` when the room has no session
    pub async fn status(&self, room: RoomId) -> Result<Option<SessionStatus>> {
        Ok(self
            .request(|reply| Command::Snapshot {
                room,
                limit: 0,
                reply,
            })
            .await?
            .map(|snapshot| snapshot.status))
    }

    pub async fn session_token(&self, room: RoomId) -> Result<Option<SessionToken>> {
        self.request(|reply| Command::Token { room, reply }).await
    }

    /// Rooms with an open session, in id order
    pub async fn rooms(&self) -> Result<Vec<RoomId>> {
        self.request(|reply| Command::Rooms { reply }).await
    }

    /// End every session and stop the loop
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| Error::SchedulerClosed)?;
        response.await.map_err(|_| Error::SchedulerClosed)
    }
}
