use std::fmt;

use chrono::NaiveDate;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Opaque catalog token naming one episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ItemId(pub(crate) String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing page number as exposed by the search results pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageToken(pub(crate) String);

pub(crate) const NO_SEEK: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Episode {
    pub(crate) id: ItemId,
    pub(crate) title: String,
    pub(crate) path: String,
    pub(crate) date: NaiveDate,
    pub(crate) time: String,
    pub(crate) hour: u32,
    pub(crate) duration_seconds: u64,
    /// Seek offset in the player's own syntax. Only the first survivor of a pass seeks.
    pub(crate) start: String,
}

/// Hour of day from "HH:MM" or "HH:MM:SS".
pub(crate) fn parse_hour(time: &str) -> Option<u32> {
    let hour = time.trim().split(':').next()?.trim();
    let hour = hour.parse::<u32>().ok()?;
    (hour < 24).then_some(hour)
}

/// Uppercase, diacritic-free form used to compare titles against exclusions.
pub(crate) fn normalize_title(raw: &str) -> String {
    raw.nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .to_uppercase()
}

pub(crate) fn format_listing_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
pub(crate) fn sample_episode(id: &str, hour: u32, title: &str, date: NaiveDate) -> Episode {
    Episode {
        id: ItemId(id.to_string()),
        title: title.to_string(),
        path: format!("https://audio.example.test/{id}.mp3"),
        date,
        time: format!("{hour:02}:00:00"),
        hour,
        duration_seconds: 3600,
        start: NO_SEEK.to_string(),
    }
}
