use std::time::Duration;

use crate::error::ExtractError;
use crate::models::Step;
use crate::tracklist::ExtractionLog;
use crate::youtube;

use ureq::Agent;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw representation of a video page, tagged by how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPage {
    /// Markup read back from a browser after the description was expanded.
    Rendered(String),
    /// Server HTML with the embedded initial-data script.
    Static(String),
}

impl RawPage {
    pub fn html(&self) -> &str {
        match self {
            RawPage::Rendered(html) | RawPage::Static(html) => html,
        }
    }
}

/// Retrieves a video page. Implementations never retry.
pub trait PageSource {
    fn fetch(&self, video_id: &str, log: &mut ExtractionLog) -> Result<RawPage, ExtractError>;
}

/// Plain GET of the watch page with a browser user agent.
pub struct StaticFetcher {
    agent: Agent,
}

impl StaticFetcher {
    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build()
            .into();
        Self { agent }
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for StaticFetcher {
    fn fetch(&self, video_id: &str, log: &mut ExtractionLog) -> Result<RawPage, ExtractError> {
        let url = youtube::build_canonical_url(video_id);
        log.push(Step::Navigate, format!("Fetching page HTML: {url}"));

        // ureq 3.x returns Err for non-2xx status codes
        let mut response = match self
            .agent
            .get(&url)
            .header("User-Agent", youtube::USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .call()
        {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(code)) => {
                log.push(Step::Navigate, format!("Page request returned HTTP {code}"));
                return Err(ExtractError::FetchFailure(format!("HTTP {code}")));
            }
            Err(e) => {
                log.push(Step::Navigate, format!("Page request failed: {e}"));
                return Err(ExtractError::FetchFailure(e.to_string()));
            }
        };

        let html = response
            .body_mut()
            .with_config()
            .limit(20 * 1024 * 1024)
            .read_to_string()
            .map_err(|e| ExtractError::FetchFailure(format!("failed to read page body: {e}")))?;

        log.push(
            Step::Navigate,
            format!("Page loaded successfully ({} bytes)", html.len()),
        );
        Ok(RawPage::Static(html))
    }
}
