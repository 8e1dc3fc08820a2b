use std::time::Duration;

use crate::error::CatalogError;
use crate::models::{CatalogTrack, PlaylistRef};

use serde_json::{Value, json};
use ureq::Agent;
use ureq::http::Response;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Maximum number of URIs per playlist insertion (Spotify API limit).
const PLAYLIST_BATCH_SIZE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const PLAYLIST_DESCRIPTION: &str = "Created by ytmix";

/// The catalog calls the reconciliation pipeline depends on.
pub trait Catalog {
    /// Top-1 free-text search.
    fn search_track(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError>;

    fn has_active_device(&self) -> Result<bool, CatalogError>;

    fn add_to_queue(&self, uri: &str) -> Result<(), CatalogError>;

    fn current_user_id(&self) -> Result<String, CatalogError>;

    fn create_playlist(&self, user_id: &str, name: &str) -> Result<PlaylistRef, CatalogError>;

    fn add_to_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError>;
}

/// Spotify Web API client. The bearer token is supplied by the caller and
/// never refreshed here.
pub struct SpotifyClient {
    agent: Agent,
    token: String,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(token: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            token: token.into(),
            base_url: SPOTIFY_API_BASE.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response<ureq::Body>, CatalogError> {
        let mut request = self
            .agent
            .get(&self.url(path))
            .header("Authorization", &self.bearer());
        for (k, v) in query {
            request = request.query(*k, *v);
        }
        request.call().map_err(map_error)
    }

    fn read_json(response: &mut Response<ureq::Body>) -> Result<Value, CatalogError> {
        response
            .body_mut()
            .read_json()
            .map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}

// ureq 3.x returns Err for non-2xx status codes
fn map_error(e: ureq::Error) -> CatalogError {
    match e {
        ureq::Error::StatusCode(401) => CatalogError::Unauthorized,
        ureq::Error::StatusCode(code) => CatalogError::Status(code),
        e => CatalogError::Transport(e.to_string()),
    }
}

impl Catalog for SpotifyClient {
    fn search_track(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError> {
        log::debug!("searching Spotify for {query:?}");
        let mut response = self.get(
            "/search",
            &[("q", query), ("type", "track"), ("limit", "1")],
        )?;
        let body = Self::read_json(&mut response)?;
        Ok(parse_search(&body))
    }

    fn has_active_device(&self) -> Result<bool, CatalogError> {
        let mut response = self.get("/me/player", &[])?;
        // 204 No Content: nothing is playing anywhere
        if response.status().as_u16() == 204 {
            return Ok(false);
        }
        let body = Self::read_json(&mut response)?;
        Ok(device_is_active(&body))
    }

    fn add_to_queue(&self, uri: &str) -> Result<(), CatalogError> {
        log::debug!("adding {uri} to queue");
        self.agent
            .post(&self.url("/me/player/queue"))
            .header("Authorization", &self.bearer())
            .query("uri", uri)
            .send_empty()
            .map_err(map_error)?;
        Ok(())
    }

    fn current_user_id(&self) -> Result<String, CatalogError> {
        let mut response = self.get("/me", &[])?;
        let body = Self::read_json(&mut response)?;
        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CatalogError::Malformed("missing user 'id'".to_string()))
    }

    fn create_playlist(&self, user_id: &str, name: &str) -> Result<PlaylistRef, CatalogError> {
        let mut response = self
            .agent
            .post(&self.url(&format!("/users/{user_id}/playlists")))
            .header("Authorization", &self.bearer())
            .send_json(json!({
                "name": name,
                "description": PLAYLIST_DESCRIPTION,
                "public": false,
            }))
            .map_err(map_error)?;
        let body = Self::read_json(&mut response)?;
        parse_playlist(&body)
    }

    fn add_to_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        for chunk in uris.chunks(PLAYLIST_BATCH_SIZE) {
            self.agent
                .post(&self.url(&format!("/playlists/{playlist_id}/tracks")))
                .header("Authorization", &self.bearer())
                .send_json(json!({ "uris": chunk }))
                .map_err(map_error)?;
        }
        Ok(())
    }
}

/// A player state without an explicit `device.is_active` counts as inactive.
fn device_is_active(body: &Value) -> bool {
    body["device"]["is_active"].as_bool().unwrap_or(false)
}

fn parse_search(body: &Value) -> Option<CatalogTrack> {
    let item = body["tracks"]["items"].as_array()?.first()?;
    Some(CatalogTrack {
        name: item["name"].as_str().unwrap_or_default().to_string(),
        artist: item["artists"][0]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        album: item["album"]["name"].as_str().unwrap_or_default().to_string(),
        uri: item["uri"].as_str()?.to_string(),
    })
}

fn parse_playlist(body: &Value) -> Result<PlaylistRef, CatalogError> {
    let id = body["id"]
        .as_str()
        .ok_or_else(|| CatalogError::Malformed("missing playlist 'id'".to_string()))?;
    Ok(PlaylistRef {
        id: id.to_string(),
        name: body["name"].as_str().unwrap_or_default().to_string(),
        url: body["external_urls"]["spotify"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{id}")),
    })
}

/// Scripted in-memory catalog that records every call it receives.
#[cfg(test)]
pub mod fake {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use super::Catalog;
    use crate::error::CatalogError;
    use crate::models::{CatalogTrack, PlaylistRef};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Search(String),
        Device,
        Queue(String),
        User,
        CreatePlaylist(String),
        AddToPlaylist(Vec<String>),
    }

    #[derive(Default)]
    pub struct FakeCatalog {
        pub hits: HashMap<String, CatalogTrack>,
        pub failing_queries: HashSet<String>,
        pub unauthorized_queries: HashSet<String>,
        pub failing_queue_uris: HashSet<String>,
        pub no_device: bool,
        pub fail_playlist_insert: bool,
        pub calls: RefCell<Vec<Call>>,
    }

    impl FakeCatalog {
        pub fn with_hits(titles: &[&str]) -> Self {
            let hits = titles
                .iter()
                .map(|t| {
                    (
                        t.to_string(),
                        CatalogTrack {
                            name: t.to_string(),
                            artist: format!("{t} artist"),
                            album: format!("{t} album"),
                            uri: format!("spotify:track:{}", t.replace(' ', "")),
                        },
                    )
                })
                .collect();
            Self {
                hits,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: Call) {
            self.calls.borrow_mut().push(call);
        }
    }

    /// Queries are "<title> <artist>"; the fake keys on the title prefix.
    fn lookup<'a, T>(map: &'a HashMap<String, T>, query: &str) -> Option<&'a T> {
        map.iter()
            .find(|(title, _)| query.starts_with(&format!("{title} ")))
            .map(|(_, v)| v)
    }

    fn keyed(set: &HashSet<String>, query: &str) -> bool {
        set.iter().any(|title| query.starts_with(&format!("{title} ")))
    }

    impl Catalog for FakeCatalog {
        fn search_track(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError> {
            self.record(Call::Search(query.to_string()));
            if keyed(&self.unauthorized_queries, query) {
                return Err(CatalogError::Unauthorized);
            }
            if keyed(&self.failing_queries, query) {
                return Err(CatalogError::Transport("connection reset".to_string()));
            }
            Ok(lookup(&self.hits, query).cloned())
        }

        fn has_active_device(&self) -> Result<bool, CatalogError> {
            self.record(Call::Device);
            Ok(!self.no_device)
        }

        fn add_to_queue(&self, uri: &str) -> Result<(), CatalogError> {
            self.record(Call::Queue(uri.to_string()));
            if self.failing_queue_uris.contains(uri) {
                return Err(CatalogError::Status(404));
            }
            Ok(())
        }

        fn current_user_id(&self) -> Result<String, CatalogError> {
            self.record(Call::User);
            Ok("listener".to_string())
        }

        fn create_playlist(&self, user_id: &str, name: &str) -> Result<PlaylistRef, CatalogError> {
            self.record(Call::CreatePlaylist(name.to_string()));
            Ok(PlaylistRef {
                id: "pl1".to_string(),
                name: name.to_string(),
                url: format!("https://open.spotify.com/playlist/pl1?owner={user_id}"),
            })
        }

        fn add_to_playlist(&self, _playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
            self.record(Call::AddToPlaylist(uris.to_vec()));
            if self.fail_playlist_insert {
                return Err(CatalogError::Status(500));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_state_requires_explicit_active_flag() {
        assert!(device_is_active(&json!({ "device": { "is_active": true } })));
        assert!(!device_is_active(&json!({ "device": { "is_active": false } })));
        assert!(!device_is_active(&json!({ "device": { "name": "Kitchen" } })));
        assert!(!device_is_active(&json!({ "is_playing": true })));
    }

    #[test]
    fn parse_search_takes_first_item() {
        let body = json!({ "tracks": { "items": [
            {
                "name": "Night Drive",
                "uri": "spotify:track:1",
                "artists": [{ "name": "DJ Snake" }, { "name": "Guest" }],
                "album": { "name": "Carte Blanche" }
            },
            { "name": "Other", "uri": "spotify:track:2", "artists": [], "album": {} }
        ]}});
        assert_eq!(
            parse_search(&body),
            Some(CatalogTrack {
                name: "Night Drive".to_string(),
                artist: "DJ Snake".to_string(),
                album: "Carte Blanche".to_string(),
                uri: "spotify:track:1".to_string(),
            })
        );
    }

    #[test]
    fn parse_search_empty_items_is_none() {
        assert_eq!(parse_search(&json!({ "tracks": { "items": [] } })), None);
        assert_eq!(parse_search(&json!({})), None);
    }

    #[test]
    fn parse_search_requires_uri() {
        let body = json!({ "tracks": { "items": [{ "name": "No Uri" }] } });
        assert_eq!(parse_search(&body), None);
    }

    #[test]
    fn parse_playlist_reads_external_url() {
        let body = json!({
            "id": "abc",
            "name": "Sunset Mix",
            "external_urls": { "spotify": "https://open.spotify.com/playlist/abc" }
        });
        let playlist = parse_playlist(&body).unwrap();
        assert_eq!(playlist.id, "abc");
        assert_eq!(playlist.name, "Sunset Mix");
        assert_eq!(playlist.url, "https://open.spotify.com/playlist/abc");
    }

    #[test]
    fn parse_playlist_without_id_is_malformed() {
        assert!(matches!(
            parse_playlist(&json!({ "name": "x" })),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            map_error(ureq::Error::StatusCode(401)),
            CatalogError::Unauthorized
        ));
        assert!(matches!(
            map_error(ureq::Error::StatusCode(429)),
            CatalogError::Status(429)
        ));
    }
}
