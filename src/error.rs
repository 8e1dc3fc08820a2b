use thiserror::Error;

use crate::models::LogEntry;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidInput(String),

    #[error("failed to fetch video page: {0}")]
    FetchFailure(String),

    #[error("Could not find video description")]
    DescriptionUnavailable,

    #[error("No music tracks found in the video")]
    NoTracksFound,
}

/// A terminal extraction error together with everything logged before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExtractionFailure {
    #[source]
    pub error: ExtractError,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Spotify rejected the access token (HTTP 401); log in again")]
    Unauthorized,

    #[error("Spotify returned HTTP {0}")]
    Status(u16),

    #[error("failed to reach Spotify: {0}")]
    Transport(String),

    #[error("unexpected Spotify response: {0}")]
    Malformed(String),
}

impl CatalogError {
    /// Errors that abort a whole batch instead of becoming a per-track miss.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Unauthorized)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No active Spotify device found. Please open Spotify and start playing.")]
    NoActiveDevice,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
