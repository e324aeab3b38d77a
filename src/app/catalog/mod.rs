mod listing;
mod resolver;
mod walker;

use chrono::NaiveDate;

pub(crate) use resolver::EpisodeResolver;
#[cfg(test)]
pub(crate) use resolver::{METADATA_HOST, metadata_path};
#[cfg(test)]
pub(crate) use walker::{IdentifierWalk, LISTING_HOST, listing_path};
pub(crate) use walker::walk;

use super::episode::Episode;
use crate::error::DownloadError;
use crate::http::Fetch;

/// Whole day, ascending by hour.
///
/// Pages are not guaranteed to be contiguous in time, so the walk is buffered and sorted.
pub(crate) fn day_in_hour_order<F: Fetch + ?Sized>(
    fetcher: &F,
    resolver: &mut EpisodeResolver,
    date: NaiveDate,
) -> Result<Vec<Episode>, DownloadError> {
    let mut episodes = walk(fetcher, resolver, date).collect::<Result<Vec<_>, _>>()?;
    // Newest-first listing; reversed so equal hours stay in publication order.
    episodes.reverse();
    episodes.sort_by_key(|episode| episode.hour);
    Ok(episodes)
}
