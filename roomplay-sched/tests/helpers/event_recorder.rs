//! Bounded waits on the room event stream

use std::time::Duration;

use roomplay_common::events::RoomEvent;
use roomplay_sched::SchedulerHandle;
use tokio::sync::broadcast::{self, error::RecvError};

use super::WAIT;

/// Records every event received while waiting
pub struct EventRecorder {
    rx: broadcast::Receiver<RoomEvent>,
    seen: Vec<RoomEvent>,
}

impl EventRecorder {
    /// Subscribe before issuing the commands under test
    pub fn new(scheduler: &SchedulerHandle) -> Self {
        Self {
            rx: scheduler.subscribe(),
            seen: Vec::new(),
        }
    }

    /// Wait for the first event (from now on) matching `predicate`
    pub async fn wait_for<F>(&mut self, what: &str, predicate: F) -> RoomEvent
    where
        F: Fn(&RoomEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let received = tokio::time::timeout_at(deadline, self.rx.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {}; saw {:?}", what, self.types()));
            match received {
                Ok(event) => {
                    self.seen.push(event.clone());
                    if predicate(&event) {
                        return event;
                    }
                }
                Err(RecvError::Lagged(n)) => panic!("recorder lagged by {} events", n),
                Err(RecvError::Closed) => panic!("event bus closed waiting for {}", what),
            }
        }
    }

    /// Wait for `NowPlaying` of the track titled `title`
    pub async fn wait_now_playing(&mut self, title: &str) {
        self.wait_for(&format!("NowPlaying({})", title), |e| {
            matches!(e, RoomEvent::NowPlaying { track, .. } if track.title == title)
        })
        .await;
    }

    /// Wait for the next event of the given type
    pub async fn wait_type(&mut self, event_type: &str) -> RoomEvent {
        self.wait_for(event_type, |e| e.event_type() == event_type).await
    }

    /// Collect whatever arrives within `window`
    pub async fn collect_for(&mut self, window: Duration) -> Vec<RoomEvent> {
        let deadline = tokio::time::Instant::now() + window;
        let mut collected = Vec::new();
        while let Ok(received) = tokio::time::timeout_at(deadline, self.rx.recv()).await {
            match received {
                Ok(event) => {
                    self.seen.push(event.clone());
                    collected.push(event);
                }
                Err(RecvError::Lagged(n)) => panic!("recorder lagged by {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
        collected
    }

    /// Everything recorded so far
    pub fn seen(&self) -> &[RoomEvent] {
        &self.seen
    }

    /// Number of recorded events of the given type
    pub fn count(&self, event_type: &str) -> usize {
        self.seen.iter().filter(|e| e.event_type() == event_type).count()
    }

    fn types(&self) -> Vec<&'static str> {
        self.seen.iter().map(|e| e.event_type()).collect()
    }
}

/// Titles of every `NowPlaying` in `events`, in order
pub fn now_playing_titles(events: &[RoomEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RoomEvent::NowPlaying { track, .. } => Some(track.title.clone()),
            _ => None,
        })
        .collect()
}
