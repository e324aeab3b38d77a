use std::env;
use std::ffi::OsString;

use clap::ValueEnum;
use serde::Deserialize;

use crate::app::episode::Episode;

pub(crate) trait Player {
    fn name(&self) -> &str;

    /// Full argv, binary first, playable path last.
    fn build_command(&self, episode: &Episode) -> Vec<String>;
}

/// Buffers the whole episode (`-cache` is in KiB) but starts after the first percent.
pub(crate) struct Mplayer {
    binary: String,
}

impl Player for Mplayer {
    fn name(&self) -> &str {
        "mplayer"
    }

    fn build_command(&self, episode: &Episode) -> Vec<String> {
        vec![
            self.binary.clone(),
            "-cache-min".to_string(),
            "1".to_string(),
            "-cache".to_string(),
            (episode.duration_seconds * 10).to_string(),
            "-ss".to_string(),
            episode.start.clone(),
            episode.path.clone(),
        ]
    }
}

pub(crate) struct Mpv {
    binary: String,
}

impl Player for Mpv {
    fn name(&self) -> &str {
        "mpv"
    }

    fn build_command(&self, episode: &Episode) -> Vec<String> {
        vec![
            self.binary.clone(),
            "--cache=yes".to_string(),
            format!("--cache-secs={}", episode.duration_seconds),
            format!("--start={}", episode.start),
            episode.path.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    #[default]
    Mplayer,
    Mpv,
}

impl PlayerKind {
    fn default_binary(self) -> &'static str {
        match self {
            Self::Mplayer => "mplayer",
            Self::Mpv => "mpv",
        }
    }

    /// `binary` wins over `RAC1_PLAYER_BIN`, which wins over the player's usual name.
    pub(crate) fn build(self, binary: Option<&str>) -> Box<dyn Player> {
        let binary = match binary {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => {
                resolve_player_bin_from_env(env::var_os("RAC1_PLAYER_BIN"), self.default_binary())
            }
        };
        match self {
            Self::Mplayer => Box::new(Mplayer { binary }),
            Self::Mpv => Box::new(Mpv { binary }),
        }
    }
}

pub(crate) fn resolve_player_bin_from_env(env_value: Option<OsString>, fallback: &str) -> String {
    match env_value {
        Some(value) if !value.is_empty() => value.to_string_lossy().into_owned(),
        _ => fallback.to_string(),
    }
}
