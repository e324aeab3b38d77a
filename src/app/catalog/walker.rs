use std::collections::{HashSet, VecDeque};

use chrono::NaiveDate;
use tracing::info;

use super::listing;
use super::resolver::EpisodeResolver;
use crate::app::episode::{Episode, ItemId, PageToken, format_listing_date};
use crate::error::DownloadError;
use crate::http::{Fetch, page_url};

pub(crate) const LISTING_HOST: &str = "www.rac1.cat";

pub(crate) fn listing_path(date: &str, page: &str) -> String {
    format!(
        "/a-la-carta/cerca?text=&programId=&sectionId=HOUR&from={date}&to={date}&pageNumber={page}&btn-search="
    )
}

/// Every identifier listed for one day, each exactly once, in first-seen order.
///
/// Page 0 is fetched on the first pull and tells us which other pages exist; the rest are
/// fetched only as the consumer keeps pulling. After an error the walk is over.
pub(crate) struct IdentifierWalk<'a, F: ?Sized> {
    fetcher: &'a F,
    date: String,
    started: bool,
    finished: bool,
    pending: VecDeque<ItemId>,
    pages: VecDeque<PageToken>,
    seen: HashSet<ItemId>,
}

impl<'a, F: Fetch + ?Sized> IdentifierWalk<'a, F> {
    pub(crate) fn new(fetcher: &'a F, date: NaiveDate) -> Self {
        Self {
            fetcher,
            date: format_listing_date(date),
            started: false,
            finished: false,
            pending: VecDeque::new(),
            pages: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    fn load_page(&mut self, page: &str, want_pagination: bool) -> Result<(), DownloadError> {
        let path = listing_path(&self.date, page);
        info!(date = %self.date, page, "downloading podcast listing");
        let fetched = self.fetcher.fetch(LISTING_HOST, &path, true)?;
        if fetched.status != 200 {
            return Err(DownloadError::Status {
                url: page_url(LISTING_HOST, &path, true),
                status: fetched.status,
                body: fetched.body,
            });
        }

        let (items, tokens) = listing::parse(&fetched.body, want_pagination);
        self.pending.extend(items);
        // The first token names the page we just read.
        self.pages.extend(tokens.into_iter().skip(1));
        Ok(())
    }
}

impl<F: Fetch + ?Sized> Iterator for IdentifierWalk<'_, F> {
    type Item = Result<ItemId, DownloadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            while let Some(id) = self.pending.pop_front() {
                if self.seen.insert(id.clone()) {
                    return Some(Ok(id));
                }
            }

            let loaded = if !self.started {
                self.started = true;
                self.load_page("0", true)
            } else if let Some(PageToken(page)) = self.pages.pop_front() {
                self.load_page(&page, false)
            } else {
                self.finished = true;
                return None;
            };

            if let Err(err) = loaded {
                self.finished = true;
                return Some(Err(err));
            }
        }
    }
}

/// Resolved episodes of one day, in listing order.
pub(crate) struct CatalogWalk<'a, F: ?Sized> {
    ids: IdentifierWalk<'a, F>,
    resolver: &'a mut EpisodeResolver,
    failed: bool,
}

impl<F: Fetch + ?Sized> Iterator for CatalogWalk<'_, F> {
    type Item = Result<Episode, DownloadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let resolved = match self.ids.next()? {
            Ok(id) => self.resolver.resolve(self.ids.fetcher, &id),
            Err(err) => Err(err),
        };
        self.failed = resolved.is_err();
        Some(resolved)
    }
}

pub(crate) fn walk<'a, F: Fetch + ?Sized>(
    fetcher: &'a F,
    resolver: &'a mut EpisodeResolver,
    date: NaiveDate,
) -> CatalogWalk<'a, F> {
    CatalogWalk {
        ids: IdentifierWalk::new(fetcher, date),
        resolver,
        failed: false,
    }
}
