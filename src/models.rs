use std::env;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Album placeholder for tracks whose source gives no album.
pub const UNKNOWN_ALBUM: &str = "unknown";

/// Default pause between successive catalog calls.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;

/// A candidate track, numbered in discovery order before any catalog lookup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub number: u32,
    pub title: String,
    pub artist: String,
    pub album: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Start,
    Resolve,
    Launch,
    Navigate,
    Content,
    Description,
    Expand,
    Parse,
    Tracks,
    Done,
    Close,
    Error,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::Resolve => "resolve",
            Step::Launch => "launch",
            Step::Navigate => "navigate",
            Step::Content => "content",
            Step::Description => "description",
            Step::Expand => "expand",
            Step::Parse => "parse",
            Step::Tracks => "tracks",
            Step::Done => "done",
            Step::Close => "close",
            Step::Error => "error",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogEntry {
    pub step: Step,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Successful extraction response.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub tracks: Vec<Track>,
    pub logs: Vec<LogEntry>,
    pub video_title: String,
}

/// Top search hit as reported by the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMatch {
    pub original: Track,
    pub catalog_name: String,
    pub catalog_artist: String,
    pub catalog_album: String,
    pub catalog_uri: String,
}

impl CatalogMatch {
    pub fn new(original: Track, hit: CatalogTrack) -> Self {
        Self {
            original,
            catalog_name: hit.name,
            catalog_artist: hit.artist,
            catalog_album: hit.album,
            catalog_uri: hit.uri,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ReconciliationOutcome {
    pub matches: Vec<CatalogMatch>,
    pub misses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist: Option<PlaylistRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Static,
    Browser,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub access_token: Option<String>,
    pub fetch: FetchMode,
    pub request_delay_ms: u64,
    pub playlist_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            fetch: FetchMode::Static,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            playlist_name: None,
        }
    }
}

impl Config {
    /// The environment variable wins over the stored token.
    pub fn effective_access_token(&self) -> Option<String> {
        env::var("SPOTIFY_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.access_token.clone())
    }
}
