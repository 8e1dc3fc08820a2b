use std::sync::LazyLock;

use crate::error::ExtractError;

use regex::Regex;
use url::Url;

/// Browser identity sent with every request to the video site.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

/// Path prefixes on the long domain that carry the ID as the next segment.
const PATH_FORMS: [&str; 3] = ["embed", "shorts", "live"];

pub fn build_canonical_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Resolves a share link (`youtu.be/<id>`) or a watch link (`...?v=<id>&...`)
/// into the bare video ID. Anything else is invalid input.
pub fn resolve(input: &str) -> Result<String, ExtractError> {
    let input = input.trim();
    let invalid = || ExtractError::InvalidInput(input.to_string());

    // Handle partial links
    let url_string = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    let parsed = Url::parse(&url_string).map_err(|_| invalid())?;
    let host = parsed.host_str().ok_or_else(invalid)?;

    let id = if host == "youtu.be" || host.ends_with(".youtu.be") {
        // Case: youtu.be/ID?si=...
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        // Case: youtube.com/watch?v=ID&list=...
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.to_string())
            .or_else(|| {
                let mut segments = parsed.path_segments()?;
                let first = segments.next()?;
                PATH_FORMS
                    .contains(&first)
                    .then(|| segments.next().map(str::to_string))
                    .flatten()
            })
    } else {
        None
    };

    match id {
        Some(id) if ID_RE.is_match(&id) => Ok(id),
        _ => Err(invalid()),
    }
}
