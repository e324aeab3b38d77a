use chrono::NaiveDate;
use tracing::debug;

use super::episode::{Episode, NO_SEEK, normalize_title};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Exclusion {
    Hour(u32),
    /// Already normalized; matched as a substring of the normalized title.
    Title(String),
}

impl Exclusion {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }
        match token.parse::<u32>() {
            Ok(hour) => Some(Self::Hour(hour)),
            Err(_) => Some(Self::Title(normalize_title(token))),
        }
    }

    fn matches(&self, hour: u32, normalized_title: &str) -> bool {
        match self {
            Self::Hour(excluded) => *excluded == hour,
            Self::Title(fragment) => normalized_title.contains(fragment.as_str()),
        }
    }
}

/// Parses comma separated exclusion lists, skipping empty entries.
pub(crate) fn parse_exclusions<S: AsRef<str>>(values: &[S]) -> Vec<Exclusion> {
    values
        .iter()
        .flat_map(|value| value.as_ref().split(','))
        .filter_map(Exclusion::parse)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FilterConfig {
    pub(crate) date: NaiveDate,
    pub(crate) from_hour: u32,
    pub(crate) to_hour: u32,
    pub(crate) excludes: Vec<Exclusion>,
    pub(crate) start_first: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Play,
    OtherDate,
    OutOfWindow,
    Excluded,
}

impl FilterConfig {
    fn judge(&self, episode: &Episode) -> Verdict {
        if episode.date != self.date {
            return Verdict::OtherDate;
        }
        if !(self.from_hour..=self.to_hour).contains(&episode.hour) {
            return Verdict::OutOfWindow;
        }
        let title = normalize_title(&episode.title);
        if self
            .excludes
            .iter()
            .any(|exclusion| exclusion.matches(episode.hour, &title))
        {
            return Verdict::Excluded;
        }
        Verdict::Play
    }
}

/// Keeps the playable part of an hour-ordered day.
///
/// Stops pulling from `episodes` right after the first episode at or past `to_hour`.
pub(crate) struct EpisodeFilter<'c, I> {
    episodes: I,
    config: &'c FilterConfig,
    survivors: usize,
    exhausted: bool,
}

impl<'c, I> EpisodeFilter<'c, I>
where
    I: Iterator<Item = Episode>,
{
    pub(crate) fn new(episodes: I, config: &'c FilterConfig) -> Self {
        Self {
            episodes,
            config,
            survivors: 0,
            exhausted: false,
        }
    }
}

impl<I> Iterator for EpisodeFilter<'_, I>
where
    I: Iterator<Item = Episode>,
{
    type Item = Episode;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let mut episode = self.episodes.next()?;
            if episode.hour >= self.config.to_hour {
                self.exhausted = true;
            }

            let verdict = self.config.judge(&episode);
            if verdict != Verdict::Play {
                debug!(title = %episode.title, hour = episode.hour, ?verdict, "skipping");
                continue;
            }

            episode.start = if self.survivors == 0 {
                self.config.start_first.clone()
            } else {
                NO_SEEK.to_string()
            };
            self.survivors += 1;
            return Some(episode);
        }
        None
    }
}
