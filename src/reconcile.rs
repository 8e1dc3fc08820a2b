use std::thread;
use std::time::Duration;

use crate::error::ReconcileError;
use crate::matcher::{MatchReport, Matcher};
use crate::models::{ReconciliationOutcome, Track};
use crate::spotify::Catalog;

/// Turns candidate tracks into queue entries or a new playlist.
pub struct Reconciler<'a> {
    catalog: &'a dyn Catalog,
    delay: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a dyn Catalog, delay: Duration) -> Self {
        Self { catalog, delay }
    }

    fn matcher(&self) -> Matcher<'a> {
        Matcher::new(self.catalog, self.delay)
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    /// Queue mode. The active-device check comes first; without a device
    /// nothing is searched or enqueued.
    pub fn queue(&self, tracks: &[Track]) -> Result<ReconciliationOutcome, ReconcileError> {
        self.ensure_active_device()?;
        let report = self.matcher().match_all(tracks)?;
        self.append_to_queue(report)
    }

    pub fn ensure_active_device(&self) -> Result<(), ReconcileError> {
        if self.catalog.has_active_device()? {
            Ok(())
        } else {
            log::warn!("No active device found. Please open Spotify and start playing.");
            Err(ReconcileError::NoActiveDevice)
        }
    }

    /// Appends matches one at a time. A failed append becomes a miss and
    /// the remaining appends still run.
    pub fn append_to_queue(
        &self,
        report: MatchReport,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let MatchReport {
            matches: found,
            mut misses,
        } = report;
        let mut matches = Vec::with_capacity(found.len());

        for (i, m) in found.into_iter().enumerate() {
            if i > 0 {
                self.pause();
            }
            match self.catalog.add_to_queue(&m.catalog_uri) {
                Ok(()) => {
                    log::info!("Added \"{}\" to queue", m.catalog_name);
                    matches.push(m);
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    log::warn!("Failed to add {:?} to queue: {e}", m.original.title);
                    misses.push(format!("Failed to add \"{}\" to queue", m.original.title));
                }
            }
        }

        log::info!(
            "Final results: {} added, {} failed",
            matches.len(),
            misses.len()
        );
        Ok(ReconciliationOutcome {
            matches,
            misses,
            playlist: None,
        })
    }

    /// Playlist mode.
    pub fn playlist(
        &self,
        tracks: &[Track],
        name: &str,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let report = self.matcher().match_all(tracks)?;
        self.build_playlist(report, name)
    }

    /// Creates one playlist and inserts every matched URI in a single batch.
    /// With no matches, nothing is created.
    pub fn build_playlist(
        &self,
        report: MatchReport,
        name: &str,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let MatchReport {
            matches,
            mut misses,
        } = report;

        if matches.is_empty() {
            log::warn!("No tracks matched; playlist {name:?} not created");
            return Ok(ReconciliationOutcome {
                matches,
                misses,
                playlist: None,
            });
        }

        log::info!("Creating playlist {name:?}");
        let user_id = self.catalog.current_user_id()?;
        let playlist = self.catalog.create_playlist(&user_id, name)?;

        let uris: Vec<String> = matches.iter().map(|m| m.catalog_uri.clone()).collect();
        match self.catalog.add_to_playlist(&playlist.id, &uris) {
            Ok(()) => log::info!("Added {} tracks to {}", uris.len(), playlist.url),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                log::warn!("Failed to fill playlist {}: {e}", playlist.id);
                misses.push(format!(
                    "Failed to add {} tracks to playlist \"{}\": {e}",
                    uris.len(),
                    playlist.name
                ));
            }
        }

        Ok(ReconciliationOutcome {
            matches,
            misses,
            playlist: Some(playlist),
        })
    }
}
