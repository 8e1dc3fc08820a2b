use std::fs;
use std::path::Path;

use crate::models::{Config, Track};

use anyhow::{Context, Result};

/// Missing or unreadable config falls back to defaults.
pub fn load_config(path: &Path) -> Config {
    if let Ok(data) = fs::read_to_string(path) {
        serde_json::from_str(&data).unwrap_or_default()
    } else {
        Config::default()
    }
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let data = serde_json::to_string_pretty(config)?;
    fs::write(path, data)?;
    Ok(())
}

/// Writes a tracklist so a later `queue` or `playlist` run can reuse it.
pub fn save_tracks(path: &Path, tracks: &[Track]) -> Result<()> {
    let data = serde_json::to_string_pretty(tracks)?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Unlike the config, a tracks file the user pointed at must parse.
pub fn load_tracks(path: &Path) -> Result<Vec<Track>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} is not a valid tracks file", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchMode, UNKNOWN_ALBUM};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ytmix-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_config_is_default() {
        let cfg = load_config(&temp_path("does-not-exist.json"));
        assert!(cfg.access_token.is_none());
        assert_eq!(cfg.fetch, FetchMode::Static);
        assert_eq!(cfg.request_delay_ms, 1000);
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_keys() {
        let path = temp_path("partial.json");
        fs::write(&path, r#"{ "fetch": "browser" }"#).unwrap();
        let cfg = load_config(&path);
        fs::remove_file(&path).ok();

        assert_eq!(cfg.fetch, FetchMode::Browser);
        assert_eq!(cfg.request_delay_ms, 1000);
    }

    #[test]
    fn tracks_file_roundtrip() {
        let path = temp_path("tracks.json");
        let tracks = vec![Track {
            number: 1,
            title: "B".to_string(),
            artist: "A".to_string(),
            album: UNKNOWN_ALBUM.to_string(),
        }];
        save_tracks(&path, &tracks).unwrap();
        let loaded = load_tracks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, tracks);
    }

    #[test]
    fn invalid_tracks_file_is_an_error() {
        let path = temp_path("bad-tracks.json");
        fs::write(&path, "not json").unwrap();
        let result = load_tracks(&path);
        fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
