//! Track extraction from the description embedded in the static watch page.
//!
//! The page carries its initial data as a JSON object assigned inside a
//! `<script>`. The description lives at a fixed path in that object as a list
//! of text runs; when it yields nothing, the structured "Music" cards stored
//! alongside it are used.

use std::sync::LazyLock;

use crate::error::ExtractError;
use crate::models::{Step, Track};
use crate::tracklist::{Candidate, ExtractionLog, TrackCollector};

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

const DATA_MARKERS: [&str; 2] = ["var ytInitialData = ", "window[\"ytInitialData\"] = "];

const SECONDARY_INFO_PATH: &str = "/contents/twoColumnWatchNextResults/results/results/contents";

/// Leading list marker: "(3)", a timestamp, "3." / "3)" / "3:", a
/// zero-padded "03", or a bullet. A bare "3" is not a marker: it starts
/// names like "3 Doors Down".
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:\(\d{1,3}\)|\d{1,2}(?::\d{2}){1,2}|\d{1,3}[.):]|0\d{1,2}|[-*•·▪►])\s+(\S.*)$",
    )
    .unwrap()
});

/// A dash with whitespace on both sides; "Jay-Z" stays whole.
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[-–—]\s+").unwrap());

pub fn extract(html: &str, log: &mut ExtractionLog) -> Result<Vec<Track>, ExtractError> {
    log.push(Step::Parse, "Looking for embedded initial data");
    let Some(data) = initial_data(html) else {
        log.push(Step::Parse, "Embedded initial data not found");
        return Err(ExtractError::DescriptionUnavailable);
    };
    log.push(Step::Parse, "Parsed embedded initial data");

    let fragments = description_fragments(&data);
    log.push(
        Step::Description,
        format!("Description has {} text fragments", fragments.len()),
    );

    let joined = fragments.concat();
    let candidates = scan_lines(joined.lines());
    log.push(
        Step::Description,
        format!("Description lines produced {} candidates", candidates.len()),
    );

    let mut collector = TrackCollector::new();
    for candidate in candidates {
        collector.offer(candidate, log);
    }
    if !collector.is_empty() {
        return Ok(collector.into_tracks());
    }

    log.push(
        Step::Tracks,
        "No tracks in description, trying structured music metadata",
    );
    for candidate in rich_metadata(&data) {
        collector.offer(candidate, log);
    }
    Ok(collector.into_tracks())
}

/// Finds the script carrying the initial data and parses the first JSON
/// value after the assignment.
fn initial_data(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;

    document.select(&selector).find_map(|script| {
        let text = script.text().collect::<String>();
        DATA_MARKERS.iter().find_map(|&marker| {
            let start = text.find(marker)? + marker.len();
            serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<Value>()
                .next()?
                .ok()
        })
    })
}

fn description_fragments(data: &Value) -> Vec<String> {
    let Some(contents) = data.pointer(SECONDARY_INFO_PATH).and_then(Value::as_array) else {
        return Vec::new();
    };
    let Some(info) = contents
        .iter()
        .find_map(|item| item.get("videoSecondaryInfoRenderer"))
    else {
        return Vec::new();
    };

    if let Some(runs) = info.pointer("/description/runs").and_then(Value::as_array) {
        return runs
            .iter()
            .filter_map(|run| run["text"].as_str().map(str::to_string))
            .collect();
    }

    info.pointer("/attributedDescription/content")
        .and_then(Value::as_str)
        .map(|content| vec![content.to_string()])
        .unwrap_or_default()
}

enum Line {
    /// A list-marker line; carries the text after the marker.
    Marker(String),
    /// An unmarked "Artist - Title" line.
    Pair { artist: String, title: String },
    Other,
}

fn classify(line: &str) -> Line {
    if let Some(caps) = MARKER_RE.captures(line) {
        return Line::Marker(caps[1].trim().to_string());
    }
    match SEPARATOR_RE.splitn(line.trim(), 2).collect::<Vec<_>>().as_slice() {
        [artist, title] if !artist.is_empty() && !title.is_empty() => Line::Pair {
            artist: artist.to_string(),
            title: title.to_string(),
        },
        _ => Line::Other,
    }
}

/// Marker text becomes a pending candidate: artist before the first
/// separator, title after it. Without a separator the whole text is the
/// title and the artist stays empty.
fn pending_from(remainder: &str) -> Candidate {
    match SEPARATOR_RE.splitn(remainder, 2).collect::<Vec<_>>().as_slice() {
        [artist, title] => Candidate::new(title.trim(), artist.trim(), None),
        _ => Candidate::new(remainder.trim(), "", None),
    }
}

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    Idle,
    Pending(Candidate),
}

#[derive(Debug, Default)]
struct Scan {
    state: ScanState,
    emitted: Vec<Candidate>,
}

impl Scan {
    fn step(mut self, line: &str) -> Self {
        match classify(line) {
            Line::Marker(remainder) => {
                if let ScanState::Pending(previous) = self.state {
                    self.emitted.push(previous);
                }
                self.state = ScanState::Pending(pending_from(&remainder));
            }
            Line::Pair { artist, title } => {
                self.emitted.push(Candidate::new(&title, &artist, None));
            }
            Line::Other => {}
        }
        self
    }

    fn finish(mut self) -> Vec<Candidate> {
        if let ScanState::Pending(last) = self.state {
            self.emitted.push(last);
        }
        self.emitted
    }
}

/// Single pass over description lines. A marker line's track is only emitted
/// when the next marker line or the end of input closes it; unmarked pair
/// lines are emitted as soon as they are seen.
pub fn scan_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<Candidate> {
    lines
        .into_iter()
        .fold(Scan::default(), Scan::step)
        .finish()
}

fn rich_metadata(data: &Value) -> Vec<Candidate> {
    let Some(panels) = data["engagementPanels"].as_array() else {
        return Vec::new();
    };

    panels
        .iter()
        .filter_map(|panel| {
            panel
                .pointer(
                    "/engagementPanelSectionListRenderer/content/structuredDescriptionContentRenderer/items",
                )
                .and_then(Value::as_array)
        })
        .flatten()
        .filter_map(|item| item.pointer("/horizontalCardListRenderer/cards"))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|card| card.get("videoAttributeViewModel"))
        .map(|vm| Candidate {
            title: text_of(&vm["title"]).unwrap_or_default(),
            artist: text_of(&vm["subtitle"]).unwrap_or_default(),
            album: text_of(&vm["secondarySubtitle"]),
        })
        .collect()
}

/// Text from a plain string or any of the wrapped text shapes.
fn text_of(value: &Value) -> Option<String> {
    if let Some(s) = value.as_str() {
        return Some(s.to_string());
    }
    if let Some(s) = value["content"].as_str().or(value["simpleText"].as_str()) {
        return Some(s.to_string());
    }
    value["runs"].as_array().map(|runs| {
        runs.iter()
            .filter_map(|r| r["text"].as_str())
            .collect::<String>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn watch_page(data: &Value) -> String {
        format!(
            "<html><head><title>Mix - YouTube</title>\
             <script>var ytcfg = {{}};</script></head><body>\
             <script>var ytInitialData = {data};</script>\
             <script>var other = 1;</script></body></html>"
        )
    }

    fn with_runs(runs: &[&str]) -> Value {
        let runs: Vec<Value> = runs.iter().map(|t| json!({ "text": t })).collect();
        json!({
            "contents": { "twoColumnWatchNextResults": { "results": { "results": { "contents": [
                { "videoPrimaryInfoRenderer": { "title": { "runs": [{ "text": "Mix" }] } } },
                { "videoSecondaryInfoRenderer": { "description": { "runs": runs } } }
            ]}}}}
        })
    }

    fn pairs(candidates: &[Candidate]) -> Vec<(&str, &str)> {
        candidates
            .iter()
            .map(|c| (c.artist.as_str(), c.title.as_str()))
            .collect()
    }

    #[test]
    fn marker_line_splits_artist_and_title() {
        let out = scan_lines(["1. Artist Name - Track Title"]);
        assert_eq!(pairs(&out), vec![("Artist Name", "Track Title")]);
    }

    #[test]
    fn unmarked_pair_line_is_emitted_immediately() {
        let out = scan_lines(["DJ Snake - Night Drive"]);
        assert_eq!(pairs(&out), vec![("DJ Snake", "Night Drive")]);
    }

    #[test]
    fn pending_marker_track_closes_on_next_marker_or_end() {
        let out = scan_lines(["1. A - B", "Some B-side chatter", "2. C - D", "E - F"]);
        // The pair line is emitted while track 2 is still pending.
        assert_eq!(pairs(&out), vec![("A", "B"), ("E", "F"), ("C", "D")]);
    }

    #[test]
    fn recognises_marker_shapes() {
        let out = scan_lines([
            "(1) A - B",
            "2) C - D",
            "• E - F",
            "- G - H",
            "00:00 I - J",
            "1:02:03 K - L",
            "07 M - N",
        ]);
        assert_eq!(
            pairs(&out),
            vec![
                ("A", "B"),
                ("C", "D"),
                ("E", "F"),
                ("G", "H"),
                ("I", "J"),
                ("K", "L"),
                ("M", "N")
            ]
        );
    }

    #[test]
    fn artist_starting_with_a_number_is_not_a_marker() {
        let out = scan_lines(["1. A - B", "3 Doors Down - Kryptonite", "50 Cent - In Da Club"]);
        // Both are pair lines, so they land before the still-pending track 1.
        assert_eq!(
            pairs(&out),
            vec![
                ("3 Doors Down", "Kryptonite"),
                ("50 Cent", "In Da Club"),
                ("A", "B")
            ]
        );
    }

    #[test]
    fn marker_without_separator_keeps_title_only() {
        let out = scan_lines(["1. Untitled Interlude"]);
        assert_eq!(out, vec![Candidate::new("Untitled Interlude", "", None)]);
    }

    #[test]
    fn hyphenated_names_are_not_split() {
        let out = scan_lines(["Jay-Z - Run This Town", "Lo-fi beats to study to"]);
        assert_eq!(pairs(&out), vec![("Jay-Z", "Run This Town")]);
    }

    #[test]
    fn ignores_lines_matching_neither_pattern() {
        assert!(scan_lines(["", "Tracklist:", "Follow me https://example.com"]).is_empty());
    }

    #[test]
    fn extracts_tracks_from_joined_fragments() {
        // Runs split lines mid-way; re-joining restores them.
        let data = with_runs(&["Tracklist:\n1. A", " - B\n2. C - D\n", "Thanks!"]);
        let tracks = extract(&watch_page(&data), &mut ExtractionLog::new()).unwrap();

        let got: Vec<(u32, &str, &str, &str)> = tracks
            .iter()
            .map(|t| (t.number, t.artist.as_str(), t.title.as_str(), t.album.as_str()))
            .collect();
        assert_eq!(got, vec![(1, "A", "B", "unknown"), (2, "C", "D", "unknown")]);
    }

    #[test]
    fn title_only_marker_entry_is_rejected_without_a_number_gap() {
        let data = with_runs(&["1. A - B\n2. Interlude\n3. C - D"]);
        let mut log = ExtractionLog::new();
        let tracks = extract(&watch_page(&data), &mut log).unwrap();

        let numbers: Vec<u32> = tracks.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(tracks[1].title, "D");
        assert!(
            log.entries()
                .iter()
                .any(|e| e.message.starts_with("Skipping incomplete entry"))
        );
    }

    #[test]
    fn reads_attributed_description_when_runs_are_absent() {
        let data = json!({
            "contents": { "twoColumnWatchNextResults": { "results": { "results": { "contents": [
                { "videoSecondaryInfoRenderer": {
                    "attributedDescription": { "content": "Artist One - Song One\nArtist Two - Song Two" }
                } }
            ]}}}}
        });
        let tracks = extract(&watch_page(&data), &mut ExtractionLog::new()).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].artist, "Artist Two");
    }

    #[test]
    fn falls_back_to_rich_metadata_cards() {
        let mut data = with_runs(&["No tracklist here, enjoy"]);
        data["engagementPanels"] = json!([
            { "engagementPanelSectionListRenderer": { "content": { "structuredDescriptionContentRenderer": { "items": [
                { "videoDescriptionHeaderRenderer": {} },
                { "horizontalCardListRenderer": { "cards": [
                    { "videoAttributeViewModel": {
                        "title": "Night Drive",
                        "subtitle": "DJ Snake",
                        "secondarySubtitle": { "content": "Carte Blanche" }
                    } },
                    { "videoAttributeViewModel": {
                        "title": { "simpleText": "Midnight City" },
                        "subtitle": { "runs": [{ "text": "M8" }, { "text": "3" }] }
                    } }
                ] } }
            ] } } } }
        ]);
        let tracks = extract(&watch_page(&data), &mut ExtractionLog::new()).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].album, "Carte Blanche");
        assert_eq!(tracks[1].artist, "M83");
        assert_eq!(tracks[1].album, "unknown");
    }

    #[test]
    fn missing_initial_data_is_description_unavailable() {
        let html = "<html><body><script>var ytcfg = {};</script></body></html>";
        assert!(matches!(
            extract(html, &mut ExtractionLog::new()),
            Err(ExtractError::DescriptionUnavailable)
        ));
    }

    #[test]
    fn empty_description_yields_no_tracks() {
        let tracks = extract(&watch_page(&json!({})), &mut ExtractionLog::new()).unwrap();
        assert!(tracks.is_empty());
    }
}
