//! Adapter for synchronous providers
//!
//! Many provider SDKs only offer blocking calls. [`BlockingResolver`] wraps
//! such a provider and runs each call on tokio's blocking thread pool, so
//! the async side only ever awaits a join handle.

use std::sync::Arc;

use async_trait::async_trait;
use roomplay_common::Track;

use super::{BatchItem, RequestKind, ResolutionError, StreamHandle, TrackResolver};

/// Synchronous counterpart of [`TrackResolver`]
pub trait BlockingTrackResolver: Send + Sync + 'static {
    fn classify(&self, query: &str) -> RequestKind {
        RequestKind::from_query(query)
    }

    fn resolve_one(&self, query: &str) -> Result<Track, ResolutionError>;

    fn resolve_playlist(&self, url: &str) -> Result<Vec<Track>, ResolutionError>;

    fn expand_batch(&self, url: &str) -> Result<Vec<BatchItem>, ResolutionError> {
        Err(ResolutionError::unsupported(format!(
            "playlist expansion is not supported for {}",
            url
        )))
    }

    fn stream_handle(&self, track: &Track) -> Result<StreamHandle, ResolutionError>;
}

/// Runs a [`BlockingTrackResolver`] on the blocking thread pool
pub struct BlockingResolver<R> {
    inner: Arc<R>,
}

impl<R: BlockingTrackResolver> BlockingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Wrapped provider
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

async fn run_blocking<T, F>(op: &'static str, call: F) -> Result<T, ResolutionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ResolutionError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ResolutionError::other(format!("{} blocking worker failed: {}", op, e)))?
}

#[async_trait]
impl<R: BlockingTrackResolver> TrackResolver for BlockingResolver<R> {
    fn classify(&self, query: &str) -> RequestKind {
        self.inner.classify(query)
    }

    async fn resolve_one(&self, query: &str) -> Result<Track, ResolutionError> {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        run_blocking("resolve_one", move || inner.resolve_one(&query)).await
    }

    async fn resolve_playlist(&self, url: &str) -> Result<Vec<Track>, ResolutionError> {
        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        run_blocking("resolve_playlist", move || inner.resolve_playlist(&url)).await
    }

    async fn expand_batch(&self, url: &str) -> Result<Vec<BatchItem>, ResolutionError> {
        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        run_blocking("expand_batch", move || inner.expand_batch(&url)).await
    }

    async fn stream_handle(&self, track: &Track) -> Result<StreamHandle, ResolutionError> {
        let inner = Arc::clone(&self.inner);
        let track = track.clone();
        run_blocking("stream_handle", move || inner.stream_handle(&track)).await
    }
}
