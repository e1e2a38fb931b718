//! TOML-backed track catalog
//!
//! A synchronous provider used by the demo host and for manual testing. The
//! catalog file lists tracks, concrete playlists and "deferred" playlists
//! whose entries are loose `title artist` descriptors:
//!
//! ```toml
//! latency_ms = 150
//!
//! [[tracks]]
//! title = "Harbour Lights"
//! url = "https://media.example/harbour-lights"
//! artist = "The Tidewater Band"
//! duration_ms = 8000
//!
//! [[playlists]]
//! url = "https://media.example/list/evening"
//! tracks = ["https://media.example/harbour-lights"]
//!
//! [[deferred]]
//! url = "https://lists.example/road-trip"
//! items = [{ title = "Harbour Lights", artist = "The Tidewater Band" }]
//! ```

use std::path::Path;
use std::thread;
use std::time::Duration;

use roomplay_common::{Error, Result, Track};
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    is_url, BatchItem, BlockingTrackResolver, RequestKind, ResolutionError, StreamHandle,
};

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    latency_ms: u64,
    #[serde(default)]
    tracks: Vec<CatalogTrack>,
    #[serde(default)]
    playlists: Vec<CatalogPlaylist>,
    #[serde(default)]
    deferred: Vec<DeferredPlaylist>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogTrack {
    title: String,
    url: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
    /// Media URL handed to the sink; defaults to `url`
    #[serde(default)]
    stream_url: Option<String>,
    /// Resolvable, but fetching its stream fails
    #[serde(default)]
    unavailable: bool,
}

impl CatalogTrack {
    fn to_track(&self) -> Track {
        let track = Track::new(self.title.clone(), self.url.clone());
        match self.duration_ms {
            Some(ms) => track.with_duration_ms(ms),
            None => track,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        let title = self.title.to_lowercase();
        if title.contains(needle) || needle.contains(&title) {
            return true;
        }
        self.artist
            .as_deref()
            .map(|artist| artist.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogPlaylist {
    url: String,
    tracks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeferredPlaylist {
    url: String,
    items: Vec<BatchItem>,
}

/// In-memory catalog loaded from a TOML file
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    latency: Option<Duration>,
    tracks: Vec<CatalogTrack>,
    playlists: Vec<CatalogPlaylist>,
    deferred: Vec<DeferredPlaylist>,
}

impl CatalogResolver {
    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            tracks = catalog.tracks.len(),
            playlists = catalog.playlists.len() + catalog.deferred.len(),
            "Loaded track catalog"
        );
        Ok(catalog)
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Ok(Self {
            latency: roomplay_common::time::optional_millis(file.latency_ms),
            tracks: file.tracks,
            playlists: file.playlists,
            deferred: file.deferred,
        })
    }

    /// Number of tracks in the catalog
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
    }

    fn by_url(&self, url: &str) -> Option<&CatalogTrack> {
        self.tracks.iter().find(|t| t.url == url)
    }
}

impl BlockingTrackResolver for CatalogResolver {
    fn classify(&self, query: &str) -> RequestKind {
        let query = query.trim();
        if self.playlists.iter().any(|p| p.url == query) {
            RequestKind::Playlist
        } else if self.deferred.iter().any(|p| p.url == query) {
            RequestKind::DeferredPlaylist
        } else {
            RequestKind::from_query(query)
        }
    }

    fn resolve_one(&self, query: &str) -> std::result::Result<Track, ResolutionError> {
        self.simulate_latency();
        let query = query.trim();

        if is_url(query) {
            return self
                .by_url(query)
                .map(CatalogTrack::to_track)
                .ok_or_else(|| ResolutionError::not_found(format!("no track at {}", query)));
        }

        let needle = query.to_lowercase();
        let found = self.tracks.iter().find(|t| t.matches(&needle));
        debug!(query, found = found.is_some(), "Catalog search");
        found
            .map(CatalogTrack::to_track)
            .ok_or_else(|| ResolutionError::not_found(format!("no results for '{}'", query)))
    }

    fn resolve_playlist(&self, url: &str) -> std::result::Result<Vec<Track>, ResolutionError> {
        self.simulate_latency();
        let playlist = self
            .playlists
            .iter()
            .find(|p| p.url == url.trim())
            .ok_or_else(|| ResolutionError::not_found(format!("no playlist at {}", url)))?;

        // Dangling entries are dropped, as a provider would drop deleted videos
        Ok(playlist
            .tracks
            .iter()
            .filter_map(|entry| self.by_url(entry))
            .map(CatalogTrack::to_track)
            .collect())
    }

    fn expand_batch(&self, url: &str) -> std::result::Result<Vec<BatchItem>, ResolutionError> {
        self.simulate_latency();
        self.deferred
            .iter()
            .find(|p| p.url == url.trim())
            .map(|p| p.items.clone())
            .ok_or_else(|| ResolutionError::not_found(format!("no playlist at {}", url)))
    }

    fn stream_handle(&self, track: &Track) -> std::result::Result<StreamHandle, ResolutionError> {
        self.simulate_latency();
        match self.by_url(&track.source_locator) {
            Some(entry) if entry.unavailable => Err(ResolutionError::network(format!(
                "stream for '{}' is unavailable",
                entry.title
            ))),
            Some(entry) => Ok(StreamHandle {
                track: track.clone(),
                stream_url: entry.stream_url.clone().unwrap_or_else(|| entry.url.clone()),
            }),
            None => Err(ResolutionError::not_found(format!(
                "'{}' is not in the catalog",
                track.title
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionErrorKind;

    const CATALOG: &str = r#"
        [[tracks]]
        title = "Harbour Lights"
        url = "https://media.example/harbour"
        artist = "Tidewater"
        duration_ms = 4000

        [[tracks]]
        title = "Night Ferry"
        url = "https://media.example/ferry"
        stream_url = "https://cdn.example/ferry.opus"

        [[tracks]]
        title = "Broken Record"
        url = "https://media.example/broken"
        unavailable = true

        [[playlists]]
        url = "https://media.example/list/evening"
        tracks = ["https://media.example/harbour", "https://media.example/gone", "https://media.example/ferry"]

        [[deferred]]
        url = "https://lists.example/road-trip"
        items = [
            { title = "Night Ferry" },
            { title = "Harbour Lights", artist = "Tidewater" },
        ]
    "#;

    fn catalog() -> CatalogResolver {
        CatalogResolver::from_toml_str(CATALOG).unwrap()
    }

    #[test]
    fn test_classification_uses_catalog_urls() {
        let c = catalog();
        assert_eq!(c.classify("https://media.example/list/evening"), RequestKind::Playlist);
        assert_eq!(
            c.classify("https://lists.example/road-trip"),
            RequestKind::DeferredPlaylist
        );
        assert_eq!(c.classify("https://media.example/ferry"), RequestKind::Direct);
        assert_eq!(c.classify("ferry"), RequestKind::Search);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let track = catalog().resolve_one("night FERRY").unwrap();
        assert_eq!(track.source_locator, "https://media.example/ferry");

        // expanded batch items search with "<title> <artist> Audio"
        let query = BatchItem::new("Harbour Lights", Some("Tidewater")).search_query();
        let track = catalog().resolve_one(&query).unwrap();
        assert_eq!(track.title, "Harbour Lights");
        assert_eq!(track.duration_ms, Some(4000));
    }

    #[test]
    fn test_unknown_query_is_not_found() {
        let err = catalog().resolve_one("nothing like this").unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::NotFound);

        let err = catalog().resolve_one("https://media.example/nope").unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::NotFound);
    }

    #[test]
    fn test_playlist_drops_dangling_entries() {
        let tracks = catalog()
            .resolve_playlist("https://media.example/list/evening")
            .unwrap();
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Harbour Lights", "Night Ferry"]);
    }

    #[test]
    fn test_expand_batch() {
        let items = catalog().expand_batch("https://lists.example/road-trip").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].artist.as_deref(), Some("Tidewater"));
    }

    #[test]
    fn test_stream_handles() {
        let c = catalog();
        let ferry = c.resolve_one("Night Ferry").unwrap();
        assert_eq!(
            c.stream_handle(&ferry).unwrap().stream_url,
            "https://cdn.example/ferry.opus"
        );

        let broken = c.resolve_one("broken record").unwrap();
        let err = c.stream_handle(&broken).unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::Network);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let c = CatalogResolver::load(file.path()).unwrap();
        assert_eq!(c.len(), 3);
        assert!(CatalogResolver::load(Path::new("/nonexistent/catalog.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(CatalogResolver::from_toml_str("[[tracks]]\ntitle = 3").is_err());
    }
}
