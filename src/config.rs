use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use crate::app::{FilterConfig, Mode, PlayerKind, parse_exclusions};
use crate::cli::Cli;
use crate::http::DEFAULT_USER_AGENT;
use crate::paths::config_file_path;

pub(crate) const DEFAULT_FROM_HOUR: u32 = 8;
pub(crate) const DEFAULT_TO_HOUR: u32 = 14;
pub(crate) const DEFAULT_START_FIRST: &str = "0";
pub(crate) const DEFAULT_EXCLUDES: &[&str] = &["SEGONA HORA,PRIMER TOC"];

/// Optional `config.toml`. Anything set on the command line wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) from: Option<u32>,
    pub(crate) to: Option<u32>,
    pub(crate) start_first: Option<String>,
    /// Replaces the built-in exclusions; `-x` adds to it, `-c` drops it.
    pub(crate) exclude: Option<Vec<String>>,
    pub(crate) player: Option<PlayerKind>,
    pub(crate) player_path: Option<String>,
    pub(crate) user_agent: Option<String>,
}

pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Ok(path) if path.exists() => path,
            Ok(path) => {
                debug!(path = %path.display(), "no config file");
                return Ok(FileConfig::default());
            }
            Err(err) => {
                debug!("skipping config file: {err:#}");
                return Ok(FileConfig::default());
            }
        },
    };

    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_file_config(&text).with_context(|| format!("invalid config file {}", path.display()))
}

pub(crate) fn parse_file_config(text: &str) -> Result<FileConfig> {
    Ok(toml::from_str(text)?)
}

#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) filter: FilterConfig,
    pub(crate) mode: Mode,
    pub(crate) player: PlayerKind,
    pub(crate) player_path: Option<String>,
    pub(crate) user_agent: String,
}

impl Settings {
    pub(crate) fn resolve(cli: &Cli, file: FileConfig, today: NaiveDate) -> Result<Self> {
        let date = parse_date(&cli.date, today)?;
        let from_hour = cli.from_hour.or(file.from).unwrap_or(DEFAULT_FROM_HOUR);
        let to_hour = cli.to_hour.or(file.to).unwrap_or(DEFAULT_TO_HOUR);
        if from_hour > 23 || to_hour > 23 {
            bail!("hours must be between 0 and 23 (got {from_hour}..{to_hour})");
        }
        if from_hour > to_hour {
            bail!("--from ({from_hour}) is after --to ({to_hour})");
        }

        let mut raw_excludes = if cli.excludes_cleared {
            Vec::new()
        } else {
            file.exclude.unwrap_or_else(|| {
                DEFAULT_EXCLUDES
                    .iter()
                    .map(|value| value.to_string())
                    .collect()
            })
        };
        raw_excludes.extend(cli.exclude.iter().cloned());

        let mode = if cli.print {
            Mode::PrintCommand
        } else if cli.print_url {
            Mode::PrintUrl
        } else {
            Mode::Play
        };

        Ok(Self {
            filter: FilterConfig {
                date,
                from_hour,
                to_hour,
                excludes: parse_exclusions(&raw_excludes),
                start_first: cli
                    .start_first
                    .clone()
                    .or(file.start_first)
                    .unwrap_or_else(|| DEFAULT_START_FIRST.to_string()),
            },
            mode,
            player: cli.player.or(file.player).unwrap_or_default(),
            player_path: file.player_path,
            user_agent: file
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

/// Accepts today/avui, yesterday/ahir, -N (days back), YYYY-MM-DD, DD/MM/YYYY and DD-MM-YYYY.
pub(crate) fn parse_date(raw: &str, today: NaiveDate) -> Result<NaiveDate> {
    let value = raw.trim().to_lowercase();
    match value.as_str() {
        "today" | "avui" => return Ok(today),
        "yesterday" | "ahir" => return today.pred_opt().context("date out of range"),
        _ => {}
    }

    if let Some(days) = value.strip_prefix('-').and_then(|n| n.parse::<u64>().ok()) {
        return today
            .checked_sub_days(Days::new(days))
            .context("date out of range");
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&value, format) {
            return Ok(date);
        }
    }
    bail!("unrecognised date '{raw}' (try today, yesterday, -2, 2024-03-05 or 05/03/2024)")
}
