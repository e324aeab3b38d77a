use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::app::episode::{Episode, ItemId, NO_SEEK, parse_hour};
use crate::error::DownloadError;
use crate::http::{Fetch, page_url};

pub(crate) const METADATA_HOST: &str = "api.audioteca.rac1.cat";

#[derive(Debug, Deserialize)]
struct AudioRecord {
    audio: AudioInfo,
    path: String,
    #[serde(rename = "durationSeconds")]
    duration_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct AudioInfo {
    title: String,
    time: String,
    date: String,
}

/// Resolves identifiers into episodes, remembering every answer for the rest of the run.
#[derive(Debug, Default)]
pub(crate) struct EpisodeResolver {
    cache: HashMap<ItemId, Episode>,
}

impl EpisodeResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn resolve<F: Fetch + ?Sized>(
        &mut self,
        fetcher: &F,
        id: &ItemId,
    ) -> Result<Episode, DownloadError> {
        if let Some(episode) = self.cache.get(id) {
            debug!(%id, "metadata cache hit");
            return Ok(episode.clone());
        }

        let path = metadata_path(id);
        let url = page_url(METADATA_HOST, &path, true);
        info!(%id, "downloading podcast metadata");
        let page = fetcher.fetch(METADATA_HOST, &path, true)?;
        if page.status != 200 {
            return Err(DownloadError::Status {
                url,
                status: page.status,
                body: page.body,
            });
        }

        let episode = parse_record(id, &page.body).map_err(|reason| DownloadError::Payload {
            url,
            reason,
        })?;
        self.cache.insert(id.clone(), episode.clone());
        Ok(episode)
    }

    #[cfg(test)]
    pub(crate) fn cached(&self) -> usize {
        self.cache.len()
    }
}

pub(crate) fn metadata_path(id: &ItemId) -> String {
    format!("/piece/audio?id={id}")
}

fn parse_record(id: &ItemId, body: &str) -> Result<Episode, String> {
    let record: AudioRecord =
        serde_json::from_str(body).map_err(|err| format!("invalid metadata JSON: {err}"))?;
    let hour = parse_hour(&record.audio.time)
        .ok_or_else(|| format!("invalid time '{}'", record.audio.time))?;
    let date = NaiveDate::parse_from_str(record.audio.date.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date '{}': {err}", record.audio.date))?;

    Ok(Episode {
        id: id.clone(),
        title: record.audio.title.trim().to_string(),
        path: record.path,
        date,
        time: record.audio.time,
        hour,
        duration_seconds: record.duration_seconds,
        start: NO_SEEK.to_string(),
    })
}
