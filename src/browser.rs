use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::ExtractError;
use crate::fetch::{PageSource, RawPage};
use crate::models::Step;
use crate::tracklist::ExtractionLog;
use crate::youtube;

use headless_chrome::{Browser, LaunchOptions, Tab};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const CONTENT_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTOR_TIMEOUT: Duration = Duration::from_secs(2);
const SCROLL_SETTLE: Duration = Duration::from_millis(1500);
const EXPAND_SETTLE: Duration = Duration::from_millis(2500);

/// Probed in order; the first one to appear means the description is on the page.
pub const DESCRIPTION_SELECTORS: [&str; 5] = [
    "ytd-text-inline-expander",
    "tp-yt-paper-button#expand",
    ".ytd-text-inline-expander #expand",
    "button[id=\"expand\"]",
    "tp-yt-paper-button[id=\"expand\"]",
];

/// Clicks the expander, or any button whose label reads like "show more".
/// Evaluates to whether something was clicked.
const EXPAND_SCRIPT: &str = r#"(() => {
    const expand = document.querySelector('tp-yt-paper-button#expand');
    if (expand) { expand.click(); return true; }
    const labels = ['더보기', 'Show more', '...more'];
    const buttons = Array.from(document.querySelectorAll('button, tp-yt-paper-button'));
    const more = buttons.find(b => labels.some(l => (b.textContent || '').includes(l)));
    if (more) { more.click(); return true; }
    return false;
})()"#;

/// One headless Chrome instance with a single tab. Dropping the session
/// terminates the browser process.
struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    fn launch() -> Result<Self, String> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .idle_browser_timeout(NAVIGATION_TIMEOUT * 2)
            .build()
            .map_err(|e| e.to_string())?;
        let browser = Browser::new(options).map_err(|e| e.to_string())?;
        let tab = browser.new_tab().map_err(|e| e.to_string())?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);
        tab.set_user_agent(youtube::USER_AGENT, None, None)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

/// Acquires a session, runs `f` against it and releases the session on
/// every exit path, unwinding included.
fn with_session<S, T>(
    log: &mut ExtractionLog,
    acquire: impl FnOnce() -> Result<S, String>,
    f: impl FnOnce(&S, &mut ExtractionLog) -> Result<T, ExtractError>,
) -> Result<T, ExtractError> {
    log.push(Step::Launch, "Launching headless browser");
    let session = acquire().map_err(|e| {
        log.push(Step::Launch, format!("Browser launch failed: {e}"));
        ExtractError::FetchFailure(format!("could not launch browser: {e}"))
    })?;

    let result = f(&session, log);

    log.push(Step::Close, "Closing browser");
    drop(session);
    result
}

/// Renders the watch page in headless Chrome and expands the description so
/// the music section is present in the markup.
#[derive(Debug)]
pub struct BrowserFetcher {
    selectors: &'static [&'static str],
}

impl Default for BrowserFetcher {
    fn default() -> Self {
        Self {
            selectors: &DESCRIPTION_SELECTORS,
        }
    }
}

impl BrowserFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageSource for BrowserFetcher {
    fn fetch(&self, video_id: &str, log: &mut ExtractionLog) -> Result<RawPage, ExtractError> {
        let url = youtube::build_canonical_url(video_id);
        with_session(log, BrowserSession::launch, |session, log| {
            render(&session.tab, &url, self.selectors, log)
        })
    }
}

/// Tries each selector in order and returns the first one `present` accepts.
fn locate_description<'s>(
    selectors: &[&'s str],
    log: &mut ExtractionLog,
    mut present: impl FnMut(&str) -> bool,
) -> Result<&'s str, ExtractError> {
    log.push(Step::Description, "Looking for description container");
    for &selector in selectors {
        log.push(Step::Description, format!("Trying selector: {selector}"));
        if present(selector) {
            log.push(
                Step::Description,
                format!("Found description with selector: {selector}"),
            );
            return Ok(selector);
        }
        log.push(Step::Description, format!("Selector {selector} not found"));
    }
    Err(ExtractError::DescriptionUnavailable)
}

fn render(
    tab: &Tab,
    url: &str,
    selectors: &[&str],
    log: &mut ExtractionLog,
) -> Result<RawPage, ExtractError> {
    log.push(Step::Navigate, "Navigating to YouTube page");
    tab.navigate_to(url)
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(|e| {
            log.push(Step::Navigate, format!("Navigation failed: {e}"));
            ExtractError::FetchFailure(e.to_string())
        })?;
    log.push(Step::Navigate, "Page loaded successfully");

    log.push(Step::Content, "Waiting for content to load");
    tab.wait_for_element_with_custom_timeout("#content", CONTENT_TIMEOUT)
        .map_err(|e| {
            log.push(Step::Content, format!("Content container missing: {e}"));
            ExtractError::FetchFailure(format!("page content did not load: {e}"))
        })?;
    log.push(Step::Content, "Content loaded");

    locate_description(selectors, log, |selector| {
        tab.wait_for_element_with_custom_timeout(selector, SELECTOR_TIMEOUT)
            .is_ok()
    })?;

    log.push(Step::Expand, "Scrolling to make description visible");
    // Scroll failures only cost visibility; expansion is what matters.
    if let Err(e) = tab.evaluate("window.scrollBy(0, 700)", false) {
        log.push(Step::Expand, format!("Scroll failed: {e}"));
    }
    thread::sleep(SCROLL_SETTLE);

    log.push(Step::Expand, "Attempting to expand description");
    match tab.evaluate(EXPAND_SCRIPT, false) {
        Ok(result) => {
            let clicked = result
                .value
                .as_ref()
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if clicked {
                log.push(Step::Expand, "Successfully clicked expand button");
            } else {
                log.push(Step::Expand, "No expand control found, reading page as-is");
            }
        }
        Err(e) => {
            log.push(Step::Expand, format!("Failed to click expand button: {e}"));
            return Err(ExtractError::DescriptionUnavailable);
        }
    }
    thread::sleep(EXPAND_SETTLE);

    log.push(Step::Parse, "Getting page content");
    let html = tab
        .get_content()
        .map_err(|e| ExtractError::FetchFailure(format!("could not read page content: {e}")))?;
    Ok(RawPage::Rendered(html))
}
