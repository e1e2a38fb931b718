//! Request submission types
//!
//! A request string is classified by the resolver, resolved, and appended.
//! Deferred playlists are split by the [`EnrichmentPolicy`]: the eager head
//! is resolved before the request returns, the tail goes to a
//! [`BackgroundEnricher`](super::enricher::BackgroundEnricher).

use serde::{Deserialize, Serialize};

use super::enricher::BatchHandle;
use crate::resolver::{BatchItem, RequestKind};

/// How much of a deferred playlist is resolved before a request returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrichmentPolicy {
    /// Resolve the first `n` items up front, the rest in the background
    EagerFirst(usize),
    /// Resolve everything in the background
    FullyDeferred,
}

impl Default for EnrichmentPolicy {
    fn default() -> Self {
        EnrichmentPolicy::EagerFirst(1)
    }
}

impl EnrichmentPolicy {
    /// Policy for an `eager_first` setting (0 means fully deferred)
    pub fn from_eager_count(n: usize) -> Self {
        if n == 0 {
            EnrichmentPolicy::FullyDeferred
        } else {
            EnrichmentPolicy::EagerFirst(n)
        }
    }

    /// Number of items resolved up front
    pub fn eager_count(&self) -> usize {
        match self {
            EnrichmentPolicy::EagerFirst(n) => *n,
            EnrichmentPolicy::FullyDeferred => 0,
        }
    }

    /// Split expanded items into (eager, deferred), preserving order
    pub fn split(&self, mut items: Vec<BatchItem>) -> (Vec<BatchItem>, Vec<BatchItem>) {
        let eager = self.eager_count().min(items.len());
        let deferred = items.split_off(eager);
        (items, deferred)
    }
}

/// Result of `submit_request`
#[derive(Debug)]
pub struct SubmitOutcome {
    /// How the request string was classified
    pub kind: RequestKind,
    /// Tracks appended before returning
    pub appended: usize,
    /// Background batch still resolving the rest of a deferred playlist
    pub deferred: Option<BatchHandle>,
}
