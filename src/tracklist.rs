use std::collections::HashSet;

use crate::error::{ExtractError, ExtractionFailure};
use crate::fetch::{PageSource, RawPage};
use crate::models::{Extraction, LogEntry, Step, Track, UNKNOWN_ALBUM};
use crate::{description, section, youtube};

use chrono::Utc;
use scraper::{Html, Selector};

/// Append-only step log for one extraction run.
#[derive(Debug, Default)]
pub struct ExtractionLog {
    entries: Vec<LogEntry>,
}

impl ExtractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step, message: impl Into<String>) {
        let message = message.into();
        log::info!("{step}: {message}");
        self.entries.push(LogEntry {
            step,
            message,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// A track as read from the page, before validation and numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
}

impl Candidate {
    pub fn new(title: &str, artist: &str, album: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.map(str::to_string),
        }
    }
}

/// Validates, de-duplicates and numbers candidates. Numbers are handed out only
/// to accepted candidates, so they stay contiguous from 1.
#[derive(Debug, Default)]
pub struct TrackCollector {
    tracks: Vec<Track>,
    seen: HashSet<(String, String)>,
    last_number: u32,
}

impl TrackCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the candidate was accepted.
    pub fn offer(&mut self, candidate: Candidate, log: &mut ExtractionLog) -> bool {
        let title = candidate.title.trim();
        let artist = candidate.artist.trim();

        if title.is_empty() || artist.is_empty() {
            log.push(
                Step::Tracks,
                format!("Skipping incomplete entry: title {title:?}, artist {artist:?}"),
            );
            return false;
        }

        if !self.seen.insert((identity(title), identity(artist))) {
            log.push(
                Step::Tracks,
                format!("Skipping duplicate track: {title} by {artist}"),
            );
            return false;
        }

        self.last_number += 1;
        let number = self.last_number;
        let album = candidate
            .album
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_ALBUM);

        log.push(
            Step::Tracks,
            format!("Found track {number}: {title} by {artist}"),
        );
        self.tracks.push(Track {
            number,
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

/// Case and whitespace insensitive form used for duplicate detection.
fn identity(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Extracts the tracklist from a fetched page. Pure in the page: the same
/// snapshot always yields the same tracks in the same order.
pub fn extract(page: &RawPage, log: &mut ExtractionLog) -> Result<Vec<Track>, ExtractError> {
    let tracks = match page {
        RawPage::Rendered(html) => {
            log.push(Step::Parse, "Parsing rendered page for the music section");
            section::extract(html, section::SECTION_PROBES, log)
        }
        RawPage::Static(html) => {
            log.push(Step::Parse, "Parsing embedded page data for the description");
            description::extract(html, log)?
        }
    };

    if tracks.is_empty() {
        return Err(ExtractError::NoTracksFound);
    }

    log.push(
        Step::Tracks,
        format!("Successfully found {} unique tracks", tracks.len()),
    );
    Ok(tracks)
}

/// Page title without the site suffix.
pub fn video_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|el| {
            let text = el.text().collect::<String>();
            let text = text.trim();
            text.strip_suffix("- YouTube").unwrap_or(text).trim().to_string()
        })
        .unwrap_or_default()
}

/// Full extraction run: resolve the URL, fetch through `source`, extract.
/// Whatever was logged is returned on both the success and the failure path.
pub fn run(url: &str, source: &dyn PageSource) -> Result<Extraction, ExtractionFailure> {
    let mut log = ExtractionLog::new();
    log.push(Step::Start, "Starting track extraction process");

    match run_steps(url, source, &mut log) {
        Ok((tracks, video_title)) => {
            log.push(Step::Done, "Process completed successfully");
            Ok(Extraction {
                tracks,
                logs: log.into_entries(),
                video_title,
            })
        }
        Err(error) => {
            log.push(Step::Error, format!("Error in track extraction: {error}"));
            Err(ExtractionFailure {
                error,
                logs: log.into_entries(),
            })
        }
    }
}

fn run_steps(
    url: &str,
    source: &dyn PageSource,
    log: &mut ExtractionLog,
) -> Result<(Vec<Track>, String), ExtractError> {
    log.push(Step::Resolve, format!("Extracting video ID from: {url}"));
    let id = youtube::resolve(url)?;
    log.push(Step::Resolve, format!("Video ID extracted: {id}"));

    let page = source.fetch(&id, log)?;
    let tracks = extract(&page, log)?;
    Ok((tracks, video_title(page.html())))
}
