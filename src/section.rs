//! Track extraction from the rendered "Music" attribution section.

use std::sync::LazyLock;

use crate::models::{Step, Track};
use crate::tracklist::{Candidate, ExtractionLog, TrackCollector};

use scraper::{ElementRef, Html, Selector};

/// One structural probe for the music section. When `heading` is set, only
/// containers whose text includes it count as a match.
#[derive(Debug, Clone, Copy)]
pub struct SectionProbe {
    pub selector: &'static str,
    pub heading: Option<&'static str>,
}

/// Most specific first, "any card list" last.
pub const SECTION_PROBES: &[SectionProbe] = &[
    SectionProbe {
        selector: r#"#items ytd-horizontal-card-list-renderer[section-identifier="music"]"#,
        heading: None,
    },
    SectionProbe {
        selector: r#"#contents ytd-horizontal-card-list-renderer[section-identifier="music"]"#,
        heading: None,
    },
    SectionProbe {
        selector: "ytd-horizontal-card-list-renderer",
        heading: Some("Music"),
    },
    SectionProbe {
        selector: "#contents ytd-horizontal-card-list-renderer",
        heading: None,
    },
];

const PEOPLE_SECTION: &str = "people";

static CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".yt-video-attribute-view-model__link-container").unwrap());
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".yt-video-attribute-view-model__title").unwrap());
static SUBTITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".yt-video-attribute-view-model__subtitle span").unwrap());
static SECONDARY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".yt-video-attribute-view-model__secondary-subtitle span").unwrap()
});

/// Walks `probes` in order and stops at the first one that yields a track.
pub fn extract(
    html: &str,
    probes: &[SectionProbe],
    log: &mut ExtractionLog,
) -> Vec<Track> {
    let document = Html::parse_document(html);
    let mut collector = TrackCollector::new();
    let mut section_found = false;

    for probe in probes {
        log.push(
            Step::Tracks,
            format!("Looking for music section with selector: {}", probe.selector),
        );

        let selector = match Selector::parse(probe.selector) {
            Ok(selector) => selector,
            Err(e) => {
                log.push(
                    Step::Tracks,
                    format!("Failed with selector {} ({e:?}), trying next...", probe.selector),
                );
                continue;
            }
        };

        let sections: Vec<ElementRef> = document
            .select(&selector)
            .filter(|el| probe.heading.is_none_or(|h| el.text().any(|t| t.contains(h))))
            .collect();
        if sections.is_empty() {
            continue;
        }

        log.push(Step::Tracks, "Found music section");
        section_found = true;

        for card in sections.iter().flat_map(|s| s.select(&CARD)) {
            if in_people_section(card) {
                continue;
            }
            let candidate = Candidate {
                title: first_text(card, &TITLE),
                artist: first_text(card, &SUBTITLE),
                album: Some(first_text(card, &SECONDARY)),
            };
            // Cards without both fields are channel or performer cards.
            if candidate.title.is_empty() || candidate.artist.is_empty() {
                continue;
            }
            collector.offer(candidate, log);
        }

        if !collector.is_empty() {
            log.push(
                Step::Tracks,
                format!(
                    "Successfully found {} unique tracks in music section",
                    collector.len()
                ),
            );
            break;
        }
    }

    if !section_found {
        log.push(Step::Tracks, "Could not find music section");
    }

    collector.into_tracks()
}

fn first_text(el: ElementRef, selector: &Selector) -> String {
    el.select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn in_people_section(card: ElementRef) -> bool {
    card.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().attr("section-identifier") == Some(PEOPLE_SECTION))
}
