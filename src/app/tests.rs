use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde_json::json;

use super::Session;
use super::catalog::*;
use super::episode::*;
use super::filter::*;
use super::reload::AutoReload;
use crate::error::DownloadError;
use crate::http::{Fetch, FetchedPage};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn target_day() -> NaiveDate {
    day(2024, 3, 5)
}

/// Answers from a script keyed by host + path; the last answer for a key repeats forever.
#[derive(Default)]
struct ScriptedFetcher {
    responses: RefCell<HashMap<String, VecDeque<FetchedPage>>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    fn respond(&self, host: &str, path: &str, status: u16, body: String) {
        self.responses
            .borrow_mut()
            .entry(format!("{host}{path}"))
            .or_default()
            .push_back(FetchedPage { status, body });
    }

    fn listing(&self, page: &str, ids: &[&str], pages: &[&str]) {
        let path = listing_path(&format_listing_date(target_day()), page);
        self.respond(LISTING_HOST, &path, 200, listing_html(ids, pages));
    }

    fn metadata(&self, id: &str, hour: u32, title: &str, date: &str) {
        let body = json!({
            "audio": {"title": title, "time": format!("{hour:02}:00:00"), "date": date},
            "path": format!("https://audio.example.test/{id}.mp3"),
            "durationSeconds": 3600,
        })
        .to_string();
        self.respond(
            METADATA_HOST,
            &metadata_path(&ItemId(id.to_string())),
            200,
            body,
        );
    }

    fn requests_to(&self, host: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|key| key.starts_with(host))
            .count()
    }
}

impl Fetch for ScriptedFetcher {
    fn fetch(&self, host: &str, path: &str, _secure: bool) -> Result<FetchedPage, DownloadError> {
        let key = format!("{host}{path}");
        self.requests.borrow_mut().push(key.clone());
        let mut responses = self.responses.borrow_mut();
        let Some(queue) = responses.get_mut(&key) else {
            return Ok(FetchedPage {
                status: 404,
                body: String::new(),
            });
        };
        let page = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        page.ok_or_else(|| DownloadError::Transport {
            url: key,
            message: "script exhausted".to_string(),
        })
    }
}

fn listing_html(ids: &[&str], pages: &[&str]) -> String {
    let mut html = String::from("<html><body>\n<ul class=\"results\">\n");
    for id in ids {
        html.push_str(&format!(
            "  <li class=\"audio\" data-audio-id=\"{id}\"><span>{id}</span></li>\n"
        ));
    }
    html.push_str("</ul>\n<nav>\n");
    for page in pages {
        html.push_str(&format!(
            "  <a href=\"#\" data-audioteca-search-page=\"{page}\">{page}</a>\n"
        ));
    }
    html.push_str("</nav>\n</body></html>\n");
    html
}

fn filter_config(excludes: &[&str]) -> FilterConfig {
    FilterConfig {
        date: target_day(),
        from_hour: 8,
        to_hour: 14,
        excludes: parse_exclusions(excludes),
        start_first: "10:00".to_string(),
    }
}

fn hours(episodes: &[Episode]) -> Vec<u32> {
    episodes.iter().map(|episode| episode.hour).collect()
}

#[test]
fn parse_hour_reads_leading_component() {
    assert_eq!(parse_hour("09:00:00"), Some(9));
    assert_eq!(parse_hour("23:59"), Some(23));
    assert_eq!(parse_hour(" 7:05 "), Some(7));
    assert_eq!(parse_hour("24:00"), None);
    assert_eq!(parse_hour("noon"), None);
}

#[test]
fn normalize_title_strips_diacritics_and_uppercases() {
    assert_eq!(normalize_title("Notícies"), "NOTICIES");
    assert_eq!(normalize_title("La Competència · Ràdio"), "LA COMPETENCIA · RADIO");
    assert_eq!(normalize_title("NOTICIES MIGDIA"), "NOTICIES MIGDIA");
    let once = normalize_title("Què t'hi jugues");
    assert_eq!(normalize_title(&once), once);
}

#[test]
fn exclusions_split_on_commas_and_classify() {
    assert_eq!(
        parse_exclusions(&["12", "Primer toc,, segona hora ", ""]),
        vec![
            Exclusion::Hour(12),
            Exclusion::Title("PRIMER TOC".to_string()),
            Exclusion::Title("SEGONA HORA".to_string()),
        ]
    );
}

#[test]
fn identifier_walk_dedups_within_and_across_pages() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &["a", "b", "a"], &["0", "1", "2"]);
    fetcher.listing("1", &["b", "c"], &[]);
    fetcher.listing("2", &["c", "d", "a"], &[]);

    let ids = IdentifierWalk::new(&fetcher, target_day())
        .map(|id| id.expect("listing should load").0)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(fetcher.requests_to(LISTING_HOST), 3);
}

#[test]
fn later_pages_do_not_add_page_tokens() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &["a"], &["0", "1"]);
    fetcher.listing("1", &["b"], &["0", "1", "7"]);

    let ids = IdentifierWalk::new(&fetcher, target_day())
        .map(|id| id.expect("listing should load").0)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(fetcher.requests_to(LISTING_HOST), 2);
}

#[test]
fn empty_day_walks_one_page() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &[], &[]);
    let mut resolver = EpisodeResolver::new();

    let day = day_in_hour_order(&fetcher, &mut resolver, target_day()).expect("empty is fine");

    assert!(day.is_empty());
    assert_eq!(fetcher.requests_to(LISTING_HOST), 1);
}

#[test]
fn walk_yields_partial_results_then_the_failure() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &["a", "b"], &["0", "1", "2"]);
    let failing = listing_path(&format_listing_date(target_day()), "1");
    fetcher.respond(LISTING_HOST, &failing, 500, "boom".to_string());
    fetcher.listing("2", &["c"], &[]);
    fetcher.metadata("a", 9, "A", "2024-03-05");
    fetcher.metadata("b", 10, "B", "2024-03-05");
    fetcher.metadata("c", 11, "C", "2024-03-05");
    let mut resolver = EpisodeResolver::new();

    let results = walk(&fetcher, &mut resolver, target_day()).collect::<Vec<_>>();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok() && results[1].is_ok());
    assert!(
        matches!(results[2], Err(DownloadError::Status { status: 500, .. })),
        "{:?}",
        results[2]
    );
    assert_eq!(fetcher.requests_to(LISTING_HOST), 2, "no retry, no page 2");
}

#[test]
fn metadata_failure_aborts_the_pass() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &["a", "b"], &[]);
    fetcher.metadata("a", 9, "A", "2024-03-05");
    let mut session = Session::new(fetcher);

    let err = session
        .pass(&filter_config(&[]))
        .expect_err("metadata for b is missing");

    assert!(
        matches!(err, DownloadError::Status { status: 404, .. }),
        "{err:?}"
    );
}

#[test]
fn day_is_delivered_in_ascending_hour_order() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &["h12", "h13", "h10"], &["0", "1"]);
    fetcher.listing("1", &["h9", "h11", "h8"], &[]);
    for hour in 8..=13 {
        let id = format!("h{hour}");
        fetcher.metadata(&id, hour, &id, "2024-03-05");
    }
    let mut resolver = EpisodeResolver::new();

    let day = day_in_hour_order(&fetcher, &mut resolver, target_day()).expect("day should load");

    assert_eq!(hours(&day), vec![8, 9, 10, 11, 12, 13]);
    assert!(day.windows(2).all(|pair| pair[0].hour <= pair[1].hour));
}

#[test]
fn resolving_twice_fetches_metadata_once() {
    let fetcher = ScriptedFetcher::default();
    fetcher.metadata("a", 9, "A", "2024-03-05");
    let mut resolver = EpisodeResolver::new();
    let id = ItemId("a".to_string());

    let first = resolver.resolve(&fetcher, &id).expect("first resolve");
    let second = resolver.resolve(&fetcher, &id).expect("cached resolve");

    assert_eq!(first, second);
    assert_eq!(fetcher.requests_to(METADATA_HOST), 1);
    assert_eq!(resolver.cached(), 1);
}

#[test]
fn metadata_non_ok_status_is_a_download_error() {
    let fetcher = ScriptedFetcher::default();
    let id = ItemId("gone".to_string());
    fetcher.respond(METADATA_HOST, &metadata_path(&id), 503, "down".to_string());
    let mut resolver = EpisodeResolver::new();

    let err = resolver.resolve(&fetcher, &id).expect_err("503 is fatal");

    assert!(
        matches!(err, DownloadError::Status { status: 503, .. }),
        "{err:?}"
    );
    assert_eq!(resolver.cached(), 0);
}

#[test]
fn filter_applies_rules_in_precedence_order() {
    let config = filter_config(&["12", "NOTICIES"]);
    let date = target_day();
    let yesterday = day(2024, 3, 4);
    let input = vec![
        sample_episode("early", 7, "Matinal", date),
        sample_episode("stray", 9, "El Món", yesterday),
        sample_episode("news", 9, "Notícies Migdia", date),
        sample_episode("mon", 9, "El Món", date),
        sample_episode("noon", 12, "Tot costa", date),
        sample_episode("comp", 13, "La Competència", date),
        sample_episode("late", 15, "La Segona Hora", date),
    ];

    let kept = EpisodeFilter::new(input.into_iter(), &config).collect::<Vec<_>>();

    let ids = kept.iter().map(|e| e.id.0.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["mon", "comp"]);
    assert_eq!(kept[0].start, "10:00");
    assert_eq!(kept[1].start, NO_SEEK);
}

#[test]
fn filter_stops_consuming_once_to_hour_is_reached() {
    let config = filter_config(&[]);
    let date = target_day();
    let pulled = Cell::new(0);
    let input = [8, 10, 14, 14, 16]
        .into_iter()
        .enumerate()
        .map(|(i, hour)| sample_episode(&format!("e{i}"), hour, "Programa", date))
        .inspect(|_| pulled.set(pulled.get() + 1));

    let kept = EpisodeFilter::new(input, &config).collect::<Vec<_>>();

    assert_eq!(hours(&kept), vec![8, 10, 14]);
    assert_eq!(pulled.get(), 3);
}

#[test]
fn filter_truncates_even_when_the_last_episode_is_rejected() {
    let config = filter_config(&["14"]);
    let date = target_day();
    let pulled = Cell::new(0);
    let input = [9, 14, 15]
        .into_iter()
        .enumerate()
        .map(|(i, hour)| sample_episode(&format!("e{i}"), hour, "Programa", date))
        .inspect(|_| pulled.set(pulled.get() + 1));

    let kept = EpisodeFilter::new(input, &config).collect::<Vec<_>>();

    assert_eq!(hours(&kept), vec![9]);
    assert_eq!(pulled.get(), 2);
}

#[test]
fn title_exclusion_matches_substrings() {
    let config = filter_config(&["TOC"]);
    let input = vec![sample_episode("retoc", 9, "El Retoc", target_day())];
    assert_eq!(EpisodeFilter::new(input.into_iter(), &config).count(), 0);
}

#[test]
fn autoreload_stops_after_a_pass_with_nothing_new() {
    let date = target_day();
    let calls = Cell::new(0);
    let pass = || {
        calls.set(calls.get() + 1);
        Ok(vec![
            sample_episode("a", 9, "A", date),
            sample_episode("b", 10, "B", date),
        ])
    };
    let mut reload = AutoReload::new(pass, false);

    let ids = reload
        .by_ref()
        .map(|episode| episode.expect("no errors").id.0)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(reload.passes(), 2);
    assert!(reload.next().is_none());
    assert_eq!(calls.get(), 2, "no walk after the loop stopped");
}

#[test]
fn autoreload_picks_up_newly_published_episodes() {
    let date = target_day();
    let mut script = VecDeque::from([
        vec![sample_episode("a", 9, "A", date)],
        vec![
            sample_episode("a", 9, "A", date),
            sample_episode("b", 10, "B", date),
        ],
    ]);
    let last = script.back().cloned().unwrap_or_default();
    let pass = move || Ok(script.pop_front().unwrap_or_else(|| last.clone()));

    let mut reload = AutoReload::new(pass, false);
    let ids = reload
        .by_ref()
        .map(|episode| episode.expect("no errors").id.0)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(reload.passes(), 3);
}

#[test]
fn autoreload_skips_by_identity_when_the_list_shifts() {
    let date = target_day();
    let mut script = VecDeque::from([
        vec![
            sample_episode("a", 9, "A", date),
            sample_episode("b", 10, "B", date),
        ],
        // "a" vanished; a count-based skip would drop "c".
        vec![
            sample_episode("b", 10, "B", date),
            sample_episode("c", 11, "C", date),
        ],
    ]);
    let pass = move || Ok(script.pop_front().unwrap_or_default());

    let ids = AutoReload::new(pass, false)
        .map(|episode| episode.expect("no errors").id.0)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn single_pass_mode_never_polls_again() {
    let date = target_day();
    let calls = Cell::new(0);
    let pass = || {
        calls.set(calls.get() + 1);
        Ok(vec![sample_episode(&format!("e{}", calls.get()), 9, "A", date)])
    };

    let count = AutoReload::new(pass, true).count();

    assert_eq!(count, 1);
    assert_eq!(calls.get(), 1);
}

#[test]
fn autoreload_yields_a_download_error_once_and_stops() {
    let calls = Cell::new(0);
    let pass = || {
        calls.set(calls.get() + 1);
        Err(DownloadError::Transport {
            url: "https://www.rac1.cat/".to_string(),
            message: "connection refused".to_string(),
        })
    };
    let mut reload = AutoReload::new(pass, false);

    assert!(matches!(
        reload.next(),
        Some(Err(DownloadError::Transport { .. }))
    ));
    assert!(reload.next().is_none());
    assert_eq!(calls.get(), 1);
}

#[test]
fn session_reloads_and_seeks_only_the_first_survivor() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &["nine"], &[]);
    fetcher.listing("0", &["ten", "nine"], &[]);
    fetcher.metadata("nine", 9, "El Món", "2024-03-05");
    fetcher.metadata("ten", 10, "La Competència", "2024-03-05");
    let mut session = Session::new(fetcher);
    let config = filter_config(&[]);

    let played = session
        .episodes(&config, false)
        .map(|episode| episode.expect("no errors"))
        .collect::<Vec<_>>();

    let ids = played.iter().map(|e| e.id.0.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["nine", "ten"]);
    assert_eq!(played[0].start, "10:00");
    assert_eq!(played[1].start, NO_SEEK);
    assert_eq!(session.fetcher().requests_to(LISTING_HOST), 3);
    assert_eq!(session.fetcher().requests_to(METADATA_HOST), 2);
    assert_eq!(session.resolver().cached(), 2);
}

#[test]
fn session_with_empty_day_stops_after_one_pass() {
    let fetcher = ScriptedFetcher::default();
    fetcher.listing("0", &[], &[]);
    let mut session = Session::new(fetcher);
    let config = filter_config(&[]);

    let mut episodes = session.episodes(&config, false);
    assert!(episodes.next().is_none());
    assert_eq!(episodes.passes(), 1);
}
