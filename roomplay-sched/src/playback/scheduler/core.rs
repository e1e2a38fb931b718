//! Scheduler loop - room table, drain step and loop-event handling
//!
//! **Responsibilities:**
//! - RoomScheduler struct definition and startup
//! - The single loop task that serializes every room mutation
//! - Drain step (pop head → fetch stream → bind) and its re-entry on
//!   `PlaybackFinished`
//! - Session teardown (stop, sink loss, shutdown)

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use roomplay_common::events::{EventBus, RoomEvent, SessionEndReason, SessionStatus};
use roomplay_common::{RoomId, Track};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::handle::SchedulerHandle;
use super::{AdvanceOutcome, Command};
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::playback::events::LoopEvent;
use crate::playback::queue::RoomQueue;
use crate::playback::session::PlaybackSession;
use crate::resolver::{ResolverPool, TrackResolver};
use crate::sink::{PlaybackOutcome, SinkError, SinkHost};

/// Queue and session of one room
pub(super) struct Room {
    pub(super) queue: RoomQueue,
    pub(super) session: PlaybackSession,
}

/// Owner of all room state
///
/// Created by [`RoomScheduler::start`], which moves it into its own task
/// and returns a [`SchedulerHandle`]. The loop ends on
/// [`SchedulerHandle::shutdown`] or when every handle is dropped; either
/// way every open session is ended with `SessionEnded { Shutdown }`.
pub struct RoomScheduler {
    pub(super) rooms: HashMap<RoomId, Room>,
    pub(super) events: EventBus,
    pub(super) pool: ResolverPool,
    pub(super) loop_tx: mpsc::UnboundedSender<LoopEvent>,
    loop_rx: mpsc::UnboundedReceiver<LoopEvent>,
    commands: mpsc::Receiver<Command>,
    pub(super) next_epoch: u64,
    pub(super) rng: StdRng,
}

impl RoomScheduler {
    /// Spawn the scheduler loop and return a handle to it
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: SchedulerConfig,
        resolver: Arc<dyn TrackResolver>,
        sinks: Arc<dyn SinkHost>,
    ) -> SchedulerHandle {
        let (scheduler, handle) = Self::new(config, resolver, sinks);
        tokio::spawn(scheduler.run());
        handle
    }

    pub(super) fn new(
        config: SchedulerConfig,
        resolver: Arc<dyn TrackResolver>,
        sinks: Arc<dyn SinkHost>,
    ) -> (Self, SchedulerHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let events = EventBus::new(config.event_capacity);
        let pool = ResolverPool::new(resolver, config.resolver_workers, config.resolver_timeout);

        info!(
            workers = pool.workers(),
            policy = ?config.policy,
            "Room scheduler initialized"
        );

        let handle = SchedulerHandle::new(command_tx, events.clone(), pool.clone(), sinks, config.policy);
        let scheduler = Self {
            rooms: HashMap::new(),
            events,
            pool,
            loop_tx,
            loop_rx,
            commands: command_rx,
            next_epoch: 1,
            rng: StdRng::from_entropy(),
        };
        (scheduler, handle)
    }

    async fn run(mut self) {
        info!("Room scheduler loop started");
        loop {
            tokio::select! {
                biased;
                // Always Some: the scheduler keeps its own sender
                Some(event) = self.loop_rx.recv() => self.handle_loop_event(event),
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => {
                        debug!("All scheduler handles dropped");
                        self.shutdown_all();
                        break;
                    }
                },
            }
        }
        info!("Room scheduler loop stopped");
    }

    /// Apply one command; false once the loop should stop
    fn handle_command(&mut self, command: Command) -> bool {
        debug!(command = command.name(), "Scheduler command");
        // A dropped reply receiver means the caller gave up waiting
        match command {
            Command::Open { room, sink, reply } => {
                let _ = reply.send(self.open(room, sink));
            }
            Command::Enqueue {
                room,
                tracks,
                trigger,
                epoch,
                reply,
            } => {
                let _ = reply.send(self.enqueue(room, tracks, trigger, epoch));
            }
            Command::Advance { room, reply } => {
                let _ = reply.send(self.drain(room));
            }
            Command::Skip { room, reply } => {
                let _ = reply.send(self.skip(room));
            }
            Command::Pause { room, reply } => {
                let _ = reply.send(self.pause(room));
            }
            Command::Resume { room, reply } => {
                let _ = reply.send(self.resume(room));
            }
            Command::Clear { room, reply } => {
                let _ = reply.send(self.clear(room));
            }
            Command::Shuffle { room, reply } => {
                let _ = reply.send(self.shuffle(room));
            }
            Command::Stop { room, reply } => {
                let _ = reply.send(self.stop(room));
            }
            Command::Snapshot { room, limit, reply } => {
                let _ = reply.send(self.snapshot(room, limit));
            }
            Command::Token { room, reply } => {
                let _ = reply.send(self.rooms.get(&room).map(|r| r.session.token().clone()));
            }
            Command::Rooms { reply } => {
                let mut rooms: Vec<RoomId> = self.rooms.keys().copied().collect();
                rooms.sort();
                let _ = reply.send(rooms);
            }
            Command::Shutdown { reply } => {
                self.shutdown_all();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    pub(super) fn handle_loop_event(&mut self, event: LoopEvent) {
        let room = event.room();
        let live_epoch = self.rooms.get(&room).map(|r| r.session.epoch());

        match event {
            LoopEvent::StreamResolved {
                epoch,
                attempt,
                track,
                result,
                ..
            } => {
                if live_epoch != Some(epoch) {
                    debug!(room = %room, epoch, "Dropping stream for ended session");
                    return;
                }
                self.on_stream_resolved(room, attempt, track, result);
            }
            LoopEvent::PlaybackFinished {
                epoch,
                generation,
                outcome,
                ..
            } => {
                if live_epoch != Some(epoch) {
                    debug!(room = %room, epoch, "Dropping completion for ended session");
                    return;
                }
                self.on_playback_finished(room, generation, outcome);
            }
        }
    }

    /// Drain step: pop the head and start fetching its stream
    ///
    /// At most one drain is in flight per room: anything but Idle is `Busy`.
    pub(super) fn drain(&mut self, room: RoomId) -> Result<AdvanceOutcome> {
        let entry = self.rooms.get_mut(&room).ok_or(Error::NoSession(room))?;
        if entry.session.status() != SessionStatus::Idle {
            return Ok(AdvanceOutcome::Busy);
        }

        let Some(track) = entry.queue.pop_front() else {
            info!(room = %room, "Queue exhausted");
            self.emit(RoomEvent::QueueExhausted {
                room,
                timestamp: roomplay_common::time::now(),
            });
            return Ok(AdvanceOutcome::Exhausted);
        };

        let attempt = entry.session.begin_drain(track.clone());
        let epoch = entry.session.epoch();
        let cancel = entry.session.token().child_token();
        let len = entry.queue.len();
        debug!(room = %room, track = %track, attempt, "Fetching stream");

        let pool = self.pool.clone();
        let loop_tx = self.loop_tx.clone();
        let fetch = track.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = pool.stream_handle(fetch.clone()) => result,
            };
            let _ = loop_tx.send(LoopEvent::StreamResolved {
                room,
                epoch,
                attempt,
                track: fetch,
                result,
            });
        });

        self.emit(RoomEvent::QueueChanged {
            room,
            len,
            trigger: roomplay_common::events::QueueChangeTrigger::Advance,
            timestamp: roomplay_common::time::now(),
        });
        Ok(AdvanceOutcome::Started(track))
    }

    /// Drain from inside the loop, where there is no caller to report to
    pub(super) fn drain_next(&mut self, room: RoomId) {
        if let Err(e) = self.drain(room) {
            error!(room = %room, "Drain failed: {}", e);
        }
    }

    fn on_stream_resolved(
        &mut self,
        room: RoomId,
        attempt: u64,
        track: Track,
        result: std::result::Result<crate::resolver::StreamHandle, crate::resolver::ResolutionError>,
    ) {
        let Some(entry) = self.rooms.get_mut(&room) else {
            return;
        };
        if !entry.session.is_current_drain(attempt) {
            debug!(room = %room, attempt, "Ignoring stale stream");
            return;
        }

        match result {
            Ok(stream) => match entry.session.bind(stream, &self.loop_tx) {
                Ok(()) => {
                    info!(room = %room, track = %track, "Now playing");
                    self.emit(RoomEvent::NowPlaying {
                        room,
                        track,
                        timestamp: roomplay_common::time::now(),
                    });
                }
                Err(e) => self.sink_lost(room, Some(track), e),
            },
            Err(e) => {
                entry.session.abort_drain();
                warn!(room = %room, track = %track, "Stream unavailable, skipping: {}", e);
                self.emit(RoomEvent::TrackError {
                    room,
                    track,
                    cause: e.to_string(),
                    recoverable: true,
                    timestamp: roomplay_common::time::now(),
                });
                self.drain_next(room);
            }
        }
    }

    fn on_playback_finished(&mut self, room: RoomId, generation: u64, outcome: PlaybackOutcome) {
        let Some(entry) = self.rooms.get_mut(&room) else {
            return;
        };
        // A completion for an older bind, or a second report for this one
        if !entry.session.is_current_playback(generation) {
            debug!(room = %room, generation, "Ignoring stale completion");
            return;
        }

        let finished = entry.session.finish_playback();
        match outcome {
            PlaybackOutcome::Finished => debug!(room = %room, "Track finished"),
            PlaybackOutcome::Halted => debug!(room = %room, "Track halted"),
            PlaybackOutcome::Failed(cause) => {
                warn!(room = %room, "Playback failed: {}", cause);
                if let Some(track) = finished {
                    self.emit(RoomEvent::TrackError {
                        room,
                        track,
                        cause,
                        recoverable: true,
                        timestamp: roomplay_common::time::now(),
                    });
                }
            }
        }
        self.drain_next(room);
    }

    /// The sink failed: report once and end the session without retrying
    pub(super) fn sink_lost(&mut self, room: RoomId, track: Option<Track>, cause: SinkError) {
        error!(room = %room, "Output sink lost: {}", cause);
        if let Some(track) = track {
            self.emit(RoomEvent::TrackError {
                room,
                track,
                cause: cause.to_string(),
                recoverable: false,
                timestamp: roomplay_common::time::now(),
            });
        }
        self.end_session(room, SessionEndReason::SinkLost);
    }

    /// Remove the room, cancel its token and release the sink
    pub(super) fn end_session(&mut self, room: RoomId, reason: SessionEndReason) -> bool {
        let Some(entry) = self.rooms.remove(&room) else {
            return false;
        };
        let dropped = entry.queue.len();
        entry.session.close();
        info!(room = %room, %reason, dropped, "Session ended");
        self.emit(RoomEvent::SessionEnded {
            room,
            reason,
            timestamp: roomplay_common::time::now(),
        });
        true
    }

    fn shutdown_all(&mut self) {
        let mut rooms: Vec<RoomId> = self.rooms.keys().copied().collect();
        rooms.sort();
        info!(rooms = rooms.len(), "Shutting down room scheduler");
        for room in rooms {
            self.end_session(room, SessionEndReason::Shutdown);
        }
    }

    pub(super) fn emit(&self, event: RoomEvent) {
        self.events.emit_lossy(event);
    }
}
