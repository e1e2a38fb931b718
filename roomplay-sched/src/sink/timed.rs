//! Simulated output used by the demo host
//!
//! "Plays" a stream by waiting for the track's duration on a background
//! task. Halt, pause and resume are delivered to that task over a watch
//! channel, so none of the sink methods block.

use std::time::Duration;

use async_trait::async_trait;
use roomplay_common::RoomId;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{OutputSink, PlaybackCompletion, PlaybackOutcome, SinkError, SinkHost};
use crate::resolver::StreamHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputControl {
    Run,
    Pause,
    Halt,
}

/// Hands out [`TimedSink`]s
#[derive(Debug, Clone)]
pub struct TimedSinkHost {
    default_duration: Duration,
}

impl TimedSinkHost {
    /// `default_duration` is used for tracks without a known duration
    pub fn new(default_duration: Duration) -> Self {
        Self { default_duration }
    }
}

impl Default for TimedSinkHost {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl SinkHost for TimedSinkHost {
    async fn acquire(&self, room: RoomId) -> Result<Box<dyn OutputSink>, SinkError> {
        info!(room = %room, "Timed output connected");
        Ok(Box::new(TimedSink {
            room,
            default_duration: self.default_duration,
            control: None,
        }))
    }
}

/// Output that waits out each track's duration
pub struct TimedSink {
    room: RoomId,
    default_duration: Duration,
    control: Option<watch::Sender<OutputControl>>,
}

impl TimedSink {
    /// Whether a playback task is still attached
    fn is_playing(&self) -> bool {
        self.control.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false)
    }

    /// Halt is final for the current stream; nothing overrides it
    fn signal(&self, state: OutputControl) {
        if let Some(tx) = &self.control {
            tx.send_if_modified(|current| {
                if *current == OutputControl::Halt || *current == state {
                    return false;
                }
                *current = state;
                true
            });
        }
    }
}

impl OutputSink for TimedSink {
    fn bind(&mut self, stream: StreamHandle, completion: PlaybackCompletion) -> Result<(), SinkError> {
        if self.is_playing() {
            return Err(SinkError::Busy);
        }

        let duration = stream
            .track
            .duration_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_duration);
        let (tx, rx) = watch::channel(OutputControl::Run);
        self.control = Some(tx);

        let room = self.room;
        debug!(room = %room, url = %stream.stream_url, ?duration, "Timed playback started");
        tokio::spawn(async move {
            // The receiver is dropped before reporting so the sink reads as
            // free by the time the scheduler binds the next stream
            let outcome = play_for(duration, rx).await;
            debug!(room = %room, ?outcome, "Timed playback ended");
            completion.complete(outcome);
        });
        Ok(())
    }

    fn halt_output(&mut self) {
        self.signal(OutputControl::Halt);
    }

    fn pause_output(&mut self) -> Result<(), SinkError> {
        self.signal(OutputControl::Pause);
        Ok(())
    }

    fn resume_output(&mut self) -> Result<(), SinkError> {
        self.signal(OutputControl::Run);
        Ok(())
    }

    fn release(&mut self) {
        // Dropping the sender halts any running playback
        self.control = None;
        info!(room = %self.room, "Timed output released");
    }
}

async fn play_for(duration: Duration, mut control: watch::Receiver<OutputControl>) -> PlaybackOutcome {
    let mut remaining = duration;
    loop {
        let state = *control.borrow_and_update();
        match state {
            OutputControl::Halt => return PlaybackOutcome::Halted,
            OutputControl::Pause => {
                if control.changed().await.is_err() {
                    return PlaybackOutcome::Halted;
                }
            }
            OutputControl::Run => {
                let started = Instant::now();
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => return PlaybackOutcome::Finished,
                    changed = control.changed() => {
                        if changed.is_err() {
                            return PlaybackOutcome::Halted;
                        }
                        remaining = remaining.saturating_sub(started.elapsed());
                    }
                }
            }
        }
    }
}
