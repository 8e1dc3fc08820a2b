#[cfg(feature = "browser")]
mod browser;
mod commands;
mod description;
mod error;
mod fetch;
mod matcher;
mod models;
mod paths;
mod reconcile;
mod section;
mod spotify;
mod store;
mod tracklist;
mod youtube;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use crate::commands::TrackSource;
use crate::models::FetchMode;

#[derive(Parser)]
#[command(name = "ytmix", version, about = "Turn a YouTube mix into a Spotify queue or playlist")]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FetchArgs {
    /// Render the page in headless Chrome and read the music section
    #[arg(long, conflicts_with = "static_html")]
    browser: bool,

    /// Fetch plain HTML and parse the embedded description
    #[arg(long = "static")]
    static_html: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl FetchArgs {
    fn mode(&self) -> Option<FetchMode> {
        if self.browser {
            Some(FetchMode::Browser)
        } else if self.static_html {
            Some(FetchMode::Static)
        } else {
            None
        }
    }
}

#[derive(Args)]
struct SourceArgs {
    /// YouTube URL (share link or watch link)
    url: Option<String>,

    /// Read tracks from a file written by `ytmix tracks --save`
    #[arg(long, value_name = "FILE", conflicts_with = "url")]
    tracks: Option<PathBuf>,

    /// Spotify access token (overrides SPOTIFY_ACCESS_TOKEN and config)
    #[arg(long)]
    token: Option<String>,
}

impl SourceArgs {
    fn source(self) -> Result<(TrackSource, Option<String>)> {
        let source = match (self.url, self.tracks) {
            (Some(url), None) => TrackSource::Url(url),
            (None, Some(path)) => TrackSource::File(path),
            _ => bail!("provide a YouTube URL or --tracks <FILE>"),
        };
        Ok((source, self.token))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the tracklist of a video
    #[command(visible_alias = "ls")]
    Tracks {
        /// YouTube URL (share link or watch link)
        url: String,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Also write the tracks as JSON to this file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },

    /// Add the tracks to the live Spotify queue
    #[command(alias = "q")]
    Queue {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Create a new Spotify playlist from the tracks
    #[command(alias = "pl")]
    Playlist {
        #[command(flatten)]
        source: SourceArgs,

        /// Playlist name (defaults to the video title)
        #[arg(long, short)]
        name: Option<String>,

        /// Open the playlist in the browser when done
        #[arg(long)]
        open: bool,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Set a config value
    Config { key: String, value: String },

    /// Show config paths and settings
    Info,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tracks { url, fetch, save } => {
            commands::tracks(&url, fetch.mode(), fetch.json, save.as_deref())
        }
        Commands::Queue { source, fetch } => {
            let (source, token) = source.source()?;
            commands::queue(source, fetch.mode(), token.as_deref(), fetch.json)
        }
        Commands::Playlist {
            source,
            name,
            open,
            fetch,
        } => {
            let (source, token) = source.source()?;
            commands::playlist(
                source,
                name.as_deref(),
                fetch.mode(),
                token.as_deref(),
                open,
                fetch.json,
            )
        }
        Commands::Config { key, value } => commands::config(&key, &value),
        Commands::Info => commands::info(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn playlist_accepts_tracks_file() {
        let cli = Cli::try_parse_from([
            "ytmix", "playlist", "--tracks", "mix.json", "--name", "Sunset", "--json",
        ])
        .unwrap();
        let Commands::Playlist {
            source, name, fetch, ..
        } = cli.command
        else {
            panic!("expected playlist");
        };
        assert_eq!(source.tracks, Some(PathBuf::from("mix.json")));
        assert_eq!(name.as_deref(), Some("Sunset"));
        assert!(fetch.json);
    }

    #[test]
    fn queue_rejects_url_and_file_together() {
        let result = Cli::try_parse_from([
            "ytmix",
            "queue",
            "https://youtu.be/abcdefghijk",
            "--tracks",
            "mix.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn browser_and_static_conflict() {
        let result = Cli::try_parse_from([
            "ytmix",
            "tracks",
            "https://youtu.be/abcdefghijk",
            "--browser",
            "--static",
        ]);
        assert!(result.is_err());
    }
}
