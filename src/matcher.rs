use std::thread;
use std::time::Duration;

use crate::error::CatalogError;
use crate::models::{CatalogMatch, Track};
use crate::spotify::Catalog;

/// Outcome of looking up one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Found(CatalogMatch),
    Miss(String),
}

/// Matches and misses of one batch, both in track order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub matches: Vec<CatalogMatch>,
    pub misses: Vec<String>,
}

pub fn search_query(track: &Track) -> String {
    format!("{} {}", track.title, track.artist)
}

pub fn not_found_message(track: &Track) -> String {
    format!("Could not find \"{}\" on Spotify", track.title)
}

/// Sequential, paced catalog lookups. Tracks are never searched concurrently.
pub struct Matcher<'a> {
    catalog: &'a dyn Catalog,
    delay: Duration,
}

impl<'a> Matcher<'a> {
    pub fn new(catalog: &'a dyn Catalog, delay: Duration) -> Self {
        Self { catalog, delay }
    }

    /// One top-1 search; the first hit is accepted as is.
    pub fn match_one(&self, track: &Track) -> Result<MatchResult, CatalogError> {
        let query = search_query(track);
        match self.catalog.search_track(&query)? {
            Some(hit) => {
                log::info!("Found \"{}\" by {} for {query:?}", hit.name, hit.artist);
                Ok(MatchResult::Found(CatalogMatch::new(track.clone(), hit)))
            }
            None => {
                log::warn!("No track found for query {query:?}");
                Ok(MatchResult::Miss(not_found_message(track)))
            }
        }
    }

    /// Looks up every track in order, waiting `delay` between calls. A failed
    /// lookup becomes a miss and the batch moves on; only a rejected token
    /// stops it.
    pub fn match_all(&self, tracks: &[Track]) -> Result<MatchReport, CatalogError> {
        let mut report = MatchReport::default();

        for (i, track) in tracks.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }

            match self.match_one(track) {
                Ok(MatchResult::Found(found)) => report.matches.push(found),
                Ok(MatchResult::Miss(message)) => report.misses.push(message),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("Error processing {:?}: {e}", track.title);
                    report
                        .misses
                        .push(format!("Error processing \"{}\": {e}", track.title));
                }
            }
        }

        Ok(report)
    }
}
