//! Test helper modules for roomplay-sched integration tests
//!
//! Provides reusable test infrastructure components:
//! - ScriptedResolver: in-memory resolver with injectable failures and gates
//! - MockSinkHost: sinks whose tracks only end when the test says so
//! - EventRecorder: bounded waits on the scheduler's event stream

#![allow(dead_code)]

pub mod event_recorder;
pub mod mock_sink;
pub mod scripted_resolver;

pub use event_recorder::{now_playing_titles, EventRecorder};
pub use mock_sink::MockSinkHost;
pub use scripted_resolver::ScriptedResolver;

use std::sync::Arc;
use std::time::Duration;

use roomplay_common::Track;
use roomplay_sched::{EnrichmentPolicy, RoomScheduler, SchedulerConfig, SchedulerHandle};

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(3);

/// Start a scheduler over the given resolver and a fresh mock sink host
pub fn start_scheduler(
    resolver: Arc<ScriptedResolver>,
    policy: EnrichmentPolicy,
) -> (SchedulerHandle, Arc<MockSinkHost>) {
    let config = SchedulerConfig::default()
        .with_policy(policy)
        .with_resolver_timeout(Some(Duration::from_secs(10)));
    start_scheduler_with(resolver, config)
}

/// Start a scheduler with an explicit configuration
pub fn start_scheduler_with(
    resolver: Arc<ScriptedResolver>,
    config: SchedulerConfig,
) -> (SchedulerHandle, Arc<MockSinkHost>) {
    let sinks = Arc::new(MockSinkHost::new());
    let handle = RoomScheduler::start(config, resolver, sinks.clone());
    (handle, sinks)
}

/// Tracks with the given titles
pub fn tracks(titles: &[&str]) -> Vec<Track> {
    titles
        .iter()
        .map(|t| Track::new(*t, format!("mem://{}", t)))
        .collect()
}

/// Poll `condition` until it holds, panicking after [`WAIT`]
pub async fn eventually<F: FnMut() -> bool>(what: &str, mut condition: F) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
