use std::collections::HashSet;
use std::str::Lines;
use std::sync::LazyLock;

use regex::Regex;

use crate::app::episode::{ItemId, PageToken};

const ITEM_MARKER: &str = "data-audio-id";
const PAGE_MARKER: &str = "data-audioteca-search-page";

static ITEM_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-audio-id="([^"]*)""#).expect("static regex"));
static PAGE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-audioteca-search-page="([^"]*)""#).expect("static regex")
});

/// Identifiers of one listing page, deduplicated within the page, in document order.
pub(crate) struct ListingItems<'a> {
    lines: Lines<'a>,
    seen: HashSet<&'a str>,
}

impl<'a> Iterator for ListingItems<'a> {
    type Item = ItemId;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if !line.contains(ITEM_MARKER) {
                continue;
            }
            let Some(value) = attr_value(&ITEM_ATTR, line) else {
                continue;
            };
            if self.seen.insert(value) {
                return Some(ItemId(value.to_string()));
            }
        }
        None
    }
}

pub(crate) fn parse_items(page: &str) -> ListingItems<'_> {
    ListingItems {
        lines: page.lines(),
        seen: HashSet::new(),
    }
}

pub(crate) fn parse_page_tokens(page: &str) -> Vec<PageToken> {
    page.lines()
        .filter(|line| line.contains(PAGE_MARKER))
        .filter_map(|line| attr_value(&PAGE_ATTR, line))
        .map(|value| PageToken(value.to_string()))
        .collect()
}

/// Splits one page into its identifiers and, for the first page of a walk, its pager tokens.
pub(crate) fn parse(page: &str, want_pagination: bool) -> (ListingItems<'_>, Vec<PageToken>) {
    let tokens = if want_pagination {
        parse_page_tokens(page)
    } else {
        Vec::new()
    };
    (parse_items(page), tokens)
}

fn attr_value<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    let value = pattern.captures(line)?.get(1)?.as_str().trim();
    (!value.is_empty()).then_some(value)
}
