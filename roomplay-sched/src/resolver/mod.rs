//! Track resolution interface
//!
//! The scheduler never talks to search engines, playlist providers or stream
//! fetchers directly. It consumes the [`TrackResolver`] trait and always
//! calls it through a [`ResolverPool`], which keeps provider I/O off the
//! scheduling loop.
//!
//! - `pool`: bounded worker pool with per-call timeout
//! - `blocking`: adapter for synchronous providers (runs on the blocking pool)
//! - `catalog`: TOML-backed provider used by the demo host

mod blocking;
mod catalog;
mod pool;

pub use blocking::{BlockingResolver, BlockingTrackResolver};
pub use catalog::CatalogResolver;
pub use pool::ResolverPool;

use async_trait::async_trait;
use roomplay_common::Track;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a resolution failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionErrorKind {
    NotFound,
    Network,
    RateLimited,
    Timeout,
    Unsupported,
    Other,
}

impl std::fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionErrorKind::NotFound => write!(f, "not found"),
            ResolutionErrorKind::Network => write!(f, "network error"),
            ResolutionErrorKind::RateLimited => write!(f, "rate limited"),
            ResolutionErrorKind::Timeout => write!(f, "timed out"),
            ResolutionErrorKind::Unsupported => write!(f, "unsupported"),
            ResolutionErrorKind::Other => write!(f, "resolver error"),
        }
    }
}

/// A provider failed to resolve a query, playlist or stream handle
///
/// Never fatal to the scheduler: it degrades to "try the next item".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {cause}")]
pub struct ResolutionError {
    pub kind: ResolutionErrorKind,
    /// Human-readable cause, suitable for a user-facing message
    pub cause: String,
}

impl ResolutionError {
    pub fn new(kind: ResolutionErrorKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }

    pub fn not_found(cause: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::NotFound, cause)
    }

    pub fn network(cause: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::Network, cause)
    }

    pub fn rate_limited(cause: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::RateLimited, cause)
    }

    pub fn timeout(cause: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::Timeout, cause)
    }

    pub fn unsupported(cause: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::Unsupported, cause)
    }

    pub fn other(cause: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::Other, cause)
    }
}

/// How a request string should be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Free-text search, resolves to the best single match
    Search,
    /// URL of a single track
    Direct,
    /// URL of a playlist whose entries are already concrete tracks
    Playlist,
    /// URL of a playlist whose entries are loose descriptors that each need
    /// a search (expanded by [`TrackResolver::expand_batch`])
    DeferredPlaylist,
}

impl RequestKind {
    /// Provider-agnostic classification: URLs are direct tracks, anything
    /// else is a search
    pub fn from_query(query: &str) -> Self {
        if is_url(query) {
            RequestKind::Direct
        } else {
            RequestKind::Search
        }
    }
}

/// Whether a request string looks like an http(s) URL
pub fn is_url(query: &str) -> bool {
    let query = query.trim();
    query.starts_with("https://") || query.starts_with("http://")
}

/// Loose descriptor produced by a playlist-expansion provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
}

impl BatchItem {
    pub fn new(title: impl Into<String>, artist: Option<&str>) -> Self {
        Self {
            title: title.into(),
            artist: artist.map(str::to_string),
        }
    }

    /// Search query used to find a playable version of this item
    pub fn search_query(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} {} Audio", self.title, artist),
            None => format!("{} Audio", self.title),
        }
    }
}

/// Streamable handle for a track, handed to the output sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    /// Track this stream plays
    pub track: Track,
    /// Direct media URL (or any locator the sink understands)
    pub stream_url: String,
}

/// External resolution provider
///
/// Every method may perform slow network I/O. The scheduler only calls these
/// from worker tasks owned by a [`ResolverPool`].
#[async_trait]
pub trait TrackResolver: Send + Sync + 'static {
    /// Decide how a request string is resolved
    fn classify(&self, query: &str) -> RequestKind {
        RequestKind::from_query(query)
    }

    /// Resolve a search query or single-track URL
    async fn resolve_one(&self, query: &str) -> Result<Track, ResolutionError>;

    /// Resolve a playlist URL into concrete tracks
    async fn resolve_playlist(&self, url: &str) -> Result<Vec<Track>, ResolutionError>;

    /// Expand a playlist URL into loose descriptors that still need a search
    async fn expand_batch(&self, url: &str) -> Result<Vec<BatchItem>, ResolutionError> {
        Err(ResolutionError::unsupported(format!(
            "playlist expansion is not supported for {}",
            url
        )))
    }

    /// Fetch a streamable handle for a track
    async fn stream_handle(&self, track: &Track) -> Result<StreamHandle, ResolutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classification() {
        assert_eq!(RequestKind::from_query("never gonna"), RequestKind::Search);
        assert_eq!(
            RequestKind::from_query("https://tube.example/watch?v=1"),
            RequestKind::Direct
        );
        assert_eq!(RequestKind::from_query("  http://x.example "), RequestKind::Direct);
        assert_eq!(RequestKind::from_query("ftp://x.example"), RequestKind::Search);
    }

    #[test]
    fn test_batch_item_search_query() {
        assert_eq!(
            BatchItem::new("Song", Some("Band")).search_query(),
            "Song Band Audio"
        );
        assert_eq!(BatchItem::new("Song", None).search_query(), "Song Audio");
    }

    #[test]
    fn test_error_display() {
        let err = ResolutionError::rate_limited("slow down");
        assert_eq!(err.to_string(), "rate limited: slow down");
        assert_eq!(err.kind, ResolutionErrorKind::RateLimited);
    }
}
