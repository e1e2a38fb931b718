//! Scheduler runtime configuration
//!
//! Built from the bootstrap [`TomlConfig`] loaded by `roomplay_common`.

use std::time::Duration;

use roomplay_common::config::TomlConfig;

use crate::playback::EnrichmentPolicy;

/// Runtime settings for [`RoomScheduler`](crate::RoomScheduler)
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// How much of a deferred playlist is resolved before a request returns
    pub policy: EnrichmentPolicy,
    /// Capacity of the command channel
    pub command_buffer: usize,
    /// Per-subscriber event buffer
    pub event_capacity: usize,
    /// Concurrent provider calls
    pub resolver_workers: usize,
    /// Per provider call; `None` waits forever
    pub resolver_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

impl From<&TomlConfig> for SchedulerConfig {
    fn from(config: &TomlConfig) -> Self {
        Self {
            policy: EnrichmentPolicy::from_eager_count(config.scheduler.eager_first),
            command_buffer: config.scheduler.command_buffer,
            event_capacity: config.scheduler.event_capacity,
            resolver_workers: config.resolver.workers,
            resolver_timeout: roomplay_common::time::optional_millis(config.resolver.timeout_ms),
        }
    }
}

impl SchedulerConfig {
    pub fn with_policy(mut self, policy: EnrichmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.resolver_timeout = timeout;
        self
    }
}
