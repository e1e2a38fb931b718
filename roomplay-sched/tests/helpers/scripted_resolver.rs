//! In-memory resolver with scripted failures
//!
//! Queries resolve to a track titled after the query (a trailing " Audio",
//! as produced by batch item searches, is dropped). Gates hold calls until
//! the test hands out permits.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use roomplay_common::Track;
use roomplay_sched::resolver::{BatchItem, RequestKind, ResolutionError, StreamHandle, TrackResolver};
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct ScriptedResolver {
    failing_queries: HashSet<String>,
    failing_streams: HashSet<String>,
    playlists: HashMap<String, Vec<Track>>,
    deferred: HashMap<String, Vec<BatchItem>>,
    resolve_gate: Option<Arc<Semaphore>>,
    stream_gate: Option<Arc<Semaphore>>,
    resolve_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `resolve_one(query)` fails with NotFound
    pub fn fail_query(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }

    /// Fetching the stream of the track titled `title` fails
    pub fn fail_stream(mut self, title: &str) -> Self {
        self.failing_streams.insert(title.to_string());
        self
    }

    /// Concrete playlist at `url`
    pub fn playlist(mut self, url: &str, titles: &[&str]) -> Self {
        self.playlists.insert(url.to_string(), super::tracks(titles));
        self
    }

    /// Deferred playlist at `url` whose items are searched by title
    pub fn deferred(mut self, url: &str, titles: &[&str]) -> Self {
        let items = titles.iter().map(|t| BatchItem::new(*t, None)).collect();
        self.deferred.insert(url.to_string(), items);
        self
    }

    /// Each `resolve_one` consumes one permit of `gate`
    pub fn gate_resolves(mut self, gate: Arc<Semaphore>) -> Self {
        self.resolve_gate = Some(gate);
        self
    }

    /// Each `stream_handle` consumes one permit of `gate`
    pub fn gate_streams(mut self, gate: Arc<Semaphore>) -> Self {
        self.stream_gate = Some(gate);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    async fn pass(gate: &Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }
}

#[async_trait]
impl TrackResolver for ScriptedResolver {
    fn classify(&self, query: &str) -> RequestKind {
        if self.playlists.contains_key(query) {
            RequestKind::Playlist
        } else if self.deferred.contains_key(query) {
            RequestKind::DeferredPlaylist
        } else {
            RequestKind::from_query(query)
        }
    }

    async fn resolve_one(&self, query: &str) -> Result<Track, ResolutionError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.resolve_gate).await;
        if self.failing_queries.contains(query) {
            return Err(ResolutionError::not_found(format!("no results for '{}'", query)));
        }
        let title = query.strip_suffix(" Audio").unwrap_or(query);
        Ok(Track::new(title, format!("mem://{}", title)))
    }

    async fn resolve_playlist(&self, url: &str) -> Result<Vec<Track>, ResolutionError> {
        self.playlists
            .get(url)
            .cloned()
            .ok_or_else(|| ResolutionError::not_found(url))
    }

    async fn expand_batch(&self, url: &str) -> Result<Vec<BatchItem>, ResolutionError> {
        self.deferred
            .get(url)
            .cloned()
            .ok_or_else(|| ResolutionError::not_found(url))
    }

    async fn stream_handle(&self, track: &Track) -> Result<StreamHandle, ResolutionError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.stream_gate).await;
        if self.failing_streams.contains(&track.title) {
            return Err(ResolutionError::network(format!("{} is unavailable", track.title)));
        }
        Ok(StreamHandle {
            track: track.clone(),
            stream_url: format!("stream:{}", track.title),
        })
    }
}
