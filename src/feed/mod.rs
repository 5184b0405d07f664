// src/feed/mod.rs
pub mod civil;
pub mod config;
pub mod history;
pub mod merge;
pub mod pipeline;
pub mod providers;
pub mod scheduler;
pub mod types;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

use crate::feed::types::{
    EventQuery, FeedResult, FeedSource, FilterState, GameEvent, Prediction, RoundError,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_events_total", "Total events fetched from the API.");
        describe_counter!(
            "feed_kept_total",
            "Events kept after normalization + filtering."
        );
        describe_counter!(
            "feed_filtered_total",
            "Events dropped by league whitelist/empty fields."
        );
        describe_counter!("feed_dedup_total", "Events dropped as duplicate ids.");
        describe_counter!(
            "feed_predictions_dropped_total",
            "Predictions dropped for missing ids or non-finite confidence."
        );
        describe_counter!("feed_rounds_total", "Refresh rounds completed.");
        describe_counter!("feed_round_errors_total", "Refresh rounds that failed.");
        describe_counter!(
            "feed_fallback_total",
            "Rounds whose narrow bucket was widened to 'all'."
        );
        describe_counter!(
            "feed_stale_discard_total",
            "Round results discarded because the filter moved on mid-flight."
        );
        describe_histogram!("feed_round_ms", "Fetch + sanitize time per round.");
        describe_gauge!("feed_last_round_ts", "Unix ts when a round last completed.");
        describe_gauge!(
            "feed_scheduler_refreshing",
            "1 while a refresh round is in flight."
        );
    });
}

/// Normalize a free-text field from the API: decode HTML entities, strip
/// tags, straighten quotes, collapse whitespace, cap the length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Team names have no business being longer than this.
    if out.chars().count() > 120 {
        out = out.chars().take(120).collect();
    }

    out
}

pub fn is_supported_league<S: AsRef<str>>(league: S, leagues: &[String]) -> bool {
    let l = league.as_ref();
    leagues.iter().any(|w| w.eq_ignore_ascii_case(l))
}

/// Normalize team names, drop events with empty ids/names or an unsupported
/// league, then drop duplicate ids (first occurrence wins).
/// Returns (kept, filtered_count, dedup_count).
pub fn sanitize_events(
    raw_events: Vec<GameEvent>,
    leagues: &[String],
) -> (Vec<GameEvent>, usize, usize) {
    let mut filtered_out = 0usize;
    let mut filtered = Vec::with_capacity(raw_events.len());
    for mut ev in raw_events {
        ev.home = normalize_text(&ev.home);
        ev.away = normalize_text(&ev.away);
        let keep = !ev.id.trim().is_empty()
            && !ev.home.is_empty()
            && !ev.away.is_empty()
            && (leagues.is_empty() || is_supported_league(&ev.league, leagues));
        if !keep {
            filtered_out += 1;
            continue;
        }
        filtered.push(ev);
    }

    let mut seen_ids: HashSet<String> = HashSet::with_capacity(filtered.len());
    let mut keep = Vec::with_capacity(filtered.len());
    let mut dedup_out = 0usize;
    for ev in filtered.into_iter() {
        if !seen_ids.insert(ev.id.clone()) {
            dedup_out += 1;
            continue;
        }
        keep.push(ev);
    }

    (keep, filtered_out, dedup_out)
}

/// Drop predictions that can't be attached or scored; clamp the rest into
/// [0, 1]. Returns (kept, dropped_count).
pub fn sanitize_predictions(raw: Vec<Prediction>) -> (Vec<Prediction>, usize) {
    let mut dropped = 0usize;
    let mut keep = Vec::with_capacity(raw.len());
    for mut p in raw {
        if p.event_id.trim().is_empty() || !p.confidence.is_finite() {
            dropped += 1;
            continue;
        }
        p.confidence = p.confidence.clamp(0.0, 1.0);
        keep.push(p);
    }
    (keep, dropped)
}

/// Raw collections from one fetch round. Replaced wholesale each round; the
/// scheduler keeps the latest one so search-text changes can re-filter
/// without a network trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub events: Vec<GameEvent>,
    pub predictions: Vec<Prediction>,
    pub fetched_at: u64,
}

impl Snapshot {
    pub fn feed(&self, filter: &FilterState, now: DateTime<Utc>, tz: Tz) -> FeedResult {
        get_feed(&self.events, &self.predictions, filter, now, tz)
    }
}

/// The single synchronous entry point over already-fetched data:
/// merge → filter/sort → fallback. Deterministic for fixed inputs.
pub fn get_feed(
    events: &[GameEvent],
    predictions: &[Prediction],
    filter: &FilterState,
    now: DateTime<Utc>,
    tz: Tz,
) -> FeedResult {
    let merged = merge::merge_predictions(events, predictions);
    pipeline::assemble_feed(&merged, filter, now, tz)
}

/// Run one fetch round against the source and sanitize the result.
/// Fetch and payload failures surface as distinct `RoundError` variants;
/// nothing here is fatal to the process.
pub async fn run_once(
    source: &dyn FeedSource,
    query: &EventQuery,
    leagues: &[String],
) -> Result<Snapshot, RoundError> {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let raw_events = source.fetch_events(query).await?;
    let raw_predictions = if query.include_predictions {
        source.fetch_predictions().await?
    } else {
        Vec::new()
    };

    counter!("feed_events_total").increment(raw_events.len() as u64);
    let (events, filtered_cnt, dedup_cnt) = sanitize_events(raw_events, leagues);
    let (predictions, pred_dropped) = sanitize_predictions(raw_predictions);

    counter!("feed_kept_total").increment(events.len() as u64);
    counter!("feed_filtered_total").increment(filtered_cnt as u64);
    counter!("feed_dedup_total").increment(dedup_cnt as u64);
    counter!("feed_predictions_dropped_total").increment(pred_dropped as u64);

    let now = Utc::now().timestamp().max(0) as u64;
    histogram!("feed_round_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("feed_last_round_ts").set(now as f64);

    Ok(Snapshot {
        events,
        predictions,
        fetched_at: now,
    })
}
