use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ExtractionFailure, ReconcileError};
use crate::fetch::{PageSource, StaticFetcher};
use crate::models::{
    CatalogMatch, Config, Extraction, FetchMode, LogEntry, ReconciliationOutcome, Track,
};
use crate::reconcile::Reconciler;
use crate::spotify::SpotifyClient;
use crate::{paths, store, tracklist};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Serialize;

const FALLBACK_PLAYLIST_NAME: &str = "ytmix playlist";
const NO_DEVICE_HINT: &str = "No active Spotify device. Open Spotify and start playing music first.";

/// Where the tracks for a reconciliation come from.
pub enum TrackSource {
    Url(String),
    File(PathBuf),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<&'a [LogEntry]>,
}

/// Queue-mode failure when no device can receive tracks.
#[derive(Serialize)]
struct NoDeviceResponse {
    error: String,
    matches: Vec<CatalogMatch>,
    misses: Vec<String>,
}

impl NoDeviceResponse {
    fn new(error: String) -> Self {
        Self {
            error,
            matches: Vec::new(),
            misses: vec![NO_DEVICE_HINT.to_string()],
        }
    }
}

fn page_source(mode: FetchMode) -> Result<Box<dyn PageSource>> {
    match mode {
        FetchMode::Static => Ok(Box::new(StaticFetcher::new())),
        #[cfg(feature = "browser")]
        FetchMode::Browser => Ok(Box::new(crate::browser::BrowserFetcher::new())),
        #[cfg(not(feature = "browser"))]
        FetchMode::Browser => {
            bail!("this build has no browser support; rebuild with `--features browser`")
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one extraction and reports a failure in the requested format.
fn run_extraction(url: &str, mode: FetchMode, json: bool) -> Result<Extraction> {
    let source = page_source(mode)?;

    match tracklist::run(url, source.as_ref()) {
        Ok(extraction) => Ok(extraction),
        Err(failure) => {
            log::error!("track extraction failed: {failure}");
            report_extraction_failure(&failure, json)?;
            Err(failure.into())
        }
    }
}

fn report_extraction_failure(failure: &ExtractionFailure, json: bool) -> Result<()> {
    if json {
        return print_json(&ErrorResponse {
            error: failure.to_string(),
            logs: Some(&failure.logs),
        });
    }
    print_logs(&failure.logs);
    Ok(())
}

fn print_logs(logs: &[LogEntry]) {
    for entry in logs {
        eprintln!(
            "  {} {:<12} {}",
            entry.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
            entry.step.as_str(),
            entry.message
        );
    }
}

fn print_tracks(tracks: &[Track]) {
    let title_width = tracks
        .iter()
        .map(|t| t.title.chars().count())
        .max()
        .unwrap_or(5)
        .clamp(5, 50);
    let artist_width = tracks
        .iter()
        .map(|t| t.artist.chars().count())
        .max()
        .unwrap_or(6)
        .clamp(6, 30);

    println!(
        "  {:<4} {:<title_w$}  {:<artist_w$}  Album",
        "#",
        "Title",
        "Artist",
        title_w = title_width,
        artist_w = artist_width,
    );
    for t in tracks {
        println!(
            "  {:<4} {:<title_w$}  {:<artist_w$}  {}",
            t.number,
            truncate(&t.title, title_width),
            truncate(&t.artist, artist_width),
            t.album,
            title_w = title_width,
            artist_w = artist_width,
        );
    }
}

/// Truncates a string to a maximum character width, appending "..." if truncated.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

pub fn tracks(url: &str, fetch: Option<FetchMode>, json: bool, save: Option<&Path>) -> Result<()> {
    let paths = paths::AppPaths::init()?;
    let cfg = store::load_config(&paths.config_file);

    let extraction = run_extraction(url, fetch.unwrap_or(cfg.fetch), json)?;

    if let Some(path) = save {
        store::save_tracks(path, &extraction.tracks)?;
    }

    if json {
        return print_json(&extraction);
    }

    println!(
        "{} {} tracks in {}",
        "Found".green(),
        extraction.tracks.len(),
        extraction.video_title.bold()
    );
    print_tracks(&extraction.tracks);
    if let Some(path) = save {
        println!("{} {}", "Saved:".blue(), path.display());
    }
    Ok(())
}

/// Tracks plus the video title when they came from a URL.
fn load_source(
    source: &TrackSource,
    cfg: &Config,
    fetch: Option<FetchMode>,
    json: bool,
) -> Result<(Vec<Track>, Option<String>)> {
    match source {
        TrackSource::File(path) => Ok((store::load_tracks(path)?, None)),
        TrackSource::Url(url) => {
            let extraction = run_extraction(url, fetch.unwrap_or(cfg.fetch), json)?;
            if !json {
                eprintln!(
                    "{} {} tracks in {}",
                    "Found".green(),
                    extraction.tracks.len(),
                    extraction.video_title
                );
            }
            Ok((extraction.tracks, Some(extraction.video_title)))
        }
    }
}

fn resolve_token(cli_token: Option<&str>, cfg: &Config) -> Result<String> {
    cli_token
        .map(str::to_string)
        .or_else(|| cfg.effective_access_token())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no Spotify access token available.\n\
                 Pass --token <token>, set SPOTIFY_ACCESS_TOKEN,\n\
                 or store one via: ytmix config access_token <token>"
            )
        })
}

pub fn queue(
    source: TrackSource,
    fetch: Option<FetchMode>,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let paths = paths::AppPaths::init()?;
    let cfg = store::load_config(&paths.config_file);
    let token = resolve_token(token, &cfg)?;

    let (tracks, _) = load_source(&source, &cfg, fetch, json)?;
    if !json {
        eprintln!("Queueing {} tracks...", tracks.len());
    }

    let client = SpotifyClient::new(token);
    let reconciler = Reconciler::new(&client, Duration::from_millis(cfg.request_delay_ms));

    match reconciler.queue(&tracks) {
        Ok(outcome) => print_outcome(&outcome, json),
        Err(ReconcileError::NoActiveDevice) => {
            let error = ReconcileError::NoActiveDevice.to_string();
            if json {
                print_json(&NoDeviceResponse::new(error.clone()))?;
            } else {
                println!("{} {error}", "No device:".yellow());
                println!("  Open Spotify on any device, start playback, then run this again.");
            }
            bail!(error)
        }
        Err(e) => {
            log::error!("failed to process tracks: {e}");
            if json {
                print_json(&ErrorResponse {
                    error: format!("Failed to process tracks: {e}"),
                    logs: None,
                })?;
            }
            Err(e).context("failed to process tracks")
        }
    }
}

pub fn playlist(
    source: TrackSource,
    name: Option<&str>,
    fetch: Option<FetchMode>,
    token: Option<&str>,
    open_after: bool,
    json: bool,
) -> Result<()> {
    let paths = paths::AppPaths::init()?;
    let cfg = store::load_config(&paths.config_file);
    let token = resolve_token(token, &cfg)?;

    let (tracks, video_title) = load_source(&source, &cfg, fetch, json)?;
    let name = name
        .map(str::to_string)
        .or_else(|| cfg.playlist_name.clone())
        .or(video_title)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_PLAYLIST_NAME.to_string());
    if !json {
        eprintln!("Creating playlist {} from {} tracks...", name.bold(), tracks.len());
    }

    let client = SpotifyClient::new(token);
    let reconciler = Reconciler::new(&client, Duration::from_millis(cfg.request_delay_ms));

    let outcome = match reconciler.playlist(&tracks, &name) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("failed to create playlist: {e}");
            if json {
                print_json(&ErrorResponse {
                    error: format!("Failed to create playlist: {e}"),
                    logs: None,
                })?;
            }
            return Err(e).context("failed to create playlist");
        }
    };

    print_outcome(&outcome, json)?;

    if open_after && let Some(playlist) = &outcome.playlist {
        open::that(&playlist.url)?;
    }
    Ok(())
}

fn print_outcome(outcome: &ReconciliationOutcome, json: bool) -> Result<()> {
    if json {
        return print_json(outcome);
    }

    for m in &outcome.matches {
        println!(
            "  {} {:>3}. {} - {}  {}",
            "ok".green(),
            m.original.number,
            m.catalog_artist,
            m.catalog_name,
            m.catalog_uri.dimmed()
        );
    }
    for miss in &outcome.misses {
        println!("  {} {miss}", "miss".red());
    }

    println!(
        "{} {} matched, {} missed",
        "Done.".green(),
        outcome.matches.len(),
        outcome.misses.len()
    );
    if let Some(playlist) = &outcome.playlist {
        println!("{} {} {}", "Playlist:".blue(), playlist.name.bold(), playlist.url);
    }
    Ok(())
}

pub fn config(key: &str, value: &str) -> Result<()> {
    let paths = paths::AppPaths::init()?;
    let mut cfg = store::load_config(&paths.config_file);

    match key {
        "access_token" => {
            cfg.access_token = Some(value.to_string()).filter(|v| !v.is_empty());
        }
        "fetch" => match value.to_lowercase().as_str() {
            "static" => cfg.fetch = FetchMode::Static,
            "browser" => cfg.fetch = FetchMode::Browser,
            _ => bail!("invalid fetch value '{value}': use 'static' or 'browser'"),
        },
        "request_delay_ms" => {
            cfg.request_delay_ms = value
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid delay '{value}': expected milliseconds"))?;
        }
        "playlist_name" => {
            cfg.playlist_name = Some(value.to_string()).filter(|v| !v.is_empty());
        }
        _ => bail!(
            "unknown config key '{key}': available keys are 'access_token', 'fetch', \
             'request_delay_ms', 'playlist_name'"
        ),
    }

    store::save_config(&paths.config_file, &cfg)?;
    println!("{}", "Config updated.".green());
    Ok(())
}

pub fn info() -> Result<()> {
    let paths = paths::AppPaths::init()?;
    let cfg = store::load_config(&paths.config_file);

    println!("{}", "Data Paths".bold());
    println!("---------------");
    println!("Config dir:  {}", paths.config_dir.display());
    println!("Config file: {}", paths.config_file.display());
    println!();
    println!("{}", "Settings".bold());
    println!("---------------");
    println!("Fetch:        {:?}", cfg.fetch);
    println!("Delay (ms):   {}", cfg.request_delay_ms);
    println!(
        "Access token: {}",
        if cfg.effective_access_token().is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("Browser support: {}", cfg!(feature = "browser"));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("Night Drive", 20), "Night Drive");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("A very long track title", 10), "A very ...");
    }

    #[test]
    fn cli_token_wins_over_config() {
        let cfg = Config {
            access_token: Some("stored".to_string()),
            ..Config::default()
        };
        assert_eq!(resolve_token(Some("cli"), &cfg).unwrap(), "cli");
    }

    #[test]
    fn blank_cli_token_is_rejected() {
        // A blank --token must not become an empty bearer header.
        assert!(resolve_token(Some("  "), &Config::default()).is_err());
    }

    #[test]
    fn error_response_omits_absent_logs() {
        let json = serde_json::to_value(ErrorResponse {
            error: "boom".to_string(),
            logs: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "error": "boom" }));
    }

    #[test]
    fn no_device_response_has_empty_matches_and_one_miss() {
        let json = serde_json::to_value(NoDeviceResponse::new(
            ReconcileError::NoActiveDevice.to_string(),
        ))
        .unwrap();
        assert_eq!(json["matches"], serde_json::json!([]));
        assert_eq!(json["misses"], serde_json::json!([NO_DEVICE_HINT]));
        assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));
    }
}
