//! Bounded resolver worker pool
//!
//! Every provider call is dispatched to its own task, gated by a semaphore
//! sized to the configured worker count, and bounded by an optional
//! timeout. Callers await the result without ever running provider code on
//! their own task. Dropping the caller's future aborts the worker task and
//! frees its slot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use roomplay_common::Track;
use tokio::sync::Semaphore;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use super::{BatchItem, RequestKind, ResolutionError, StreamHandle, TrackResolver};

/// Bounded pool in front of a [`TrackResolver`]
#[derive(Clone)]
pub struct ResolverPool {
    resolver: Arc<dyn TrackResolver>,
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Option<Duration>,
}

impl ResolverPool {
    /// Create a pool allowing `workers` concurrent provider calls
    pub fn new(resolver: Arc<dyn TrackResolver>, workers: usize, timeout: Option<Duration>) -> Self {
        let workers = workers.max(1);
        Self {
            resolver,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout,
        }
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Classification is pure and cheap; it runs inline
    pub fn classify(&self, query: &str) -> RequestKind {
        self.resolver.classify(query)
    }

    pub async fn resolve_one(&self, query: String) -> Result<Track, ResolutionError> {
        self.dispatch("resolve_one", move |resolver| async move {
            resolver.resolve_one(&query).await
        })
        .await
    }

    pub async fn resolve_playlist(&self, url: String) -> Result<Vec<Track>, ResolutionError> {
        self.dispatch("resolve_playlist", move |resolver| async move {
            resolver.resolve_playlist(&url).await
        })
        .await
    }

    pub async fn expand_batch(&self, url: String) -> Result<Vec<BatchItem>, ResolutionError> {
        self.dispatch("expand_batch", move |resolver| async move {
            resolver.expand_batch(&url).await
        })
        .await
    }

    pub async fn stream_handle(&self, track: Track) -> Result<StreamHandle, ResolutionError> {
        self.dispatch("stream_handle", move |resolver| async move {
            resolver.stream_handle(&track).await
        })
        .await
    }

    async fn dispatch<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T, ResolutionError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn TrackResolver>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ResolutionError>> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ResolutionError::other("resolver pool is closed"))?;

        let resolver = Arc::clone(&self.resolver);
        let timeout = self.timeout;

        let task = AbortOnDropHandle::new(tokio::spawn(async move {
            let _permit = permit;
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, call(resolver)).await {
                    Ok(result) => result,
                    Err(_) => Err(ResolutionError::timeout(format!(
                        "{} exceeded {}ms",
                        op,
                        limit.as_millis()
                    ))),
                },
                None => call(resolver).await,
            }
        }));

        match task.await {
            Ok(result) => {
                if let Err(ref e) = result {
                    debug!(op, error = %e, "Resolver call failed");
                }
                result
            }
            Err(join_err) => {
                warn!(op, "Resolver worker task failed: {}", join_err);
                Err(ResolutionError::other(format!("{} worker failed: {}", op, join_err)))
            }
        }
    }
}
