// src/feed/pipeline.rs
//
// Filter/sort pipeline and the fallback resolver. Pure over already-fetched
// data: the reference instant is an explicit argument, never read from the
// ambient clock, so one (records, filter, now) triple always yields the same
// ordered output.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::feed::civil;
use crate::feed::types::{DayBucket, FeedRecord, FeedResult, FilterState, SortDirection};

/// Run the pipeline for one round. When a narrow bucket comes back empty the
/// pass is re-run with the bucket widened to `all` (league and search
/// untouched) and the substitution is flagged, so the caller can say "nothing
/// today — showing everything" instead of mislabeling the list.
pub fn assemble_feed(
    records: &[FeedRecord],
    filter: &FilterState,
    now: DateTime<Utc>,
    tz: Tz,
) -> FeedResult {
    let first = filter_and_sort(records, filter, now, tz);
    if first.is_empty() && filter.bucket != DayBucket::All {
        let widened = FilterState {
            bucket: DayBucket::All,
            ..filter.clone()
        };
        return FeedResult {
            records: filter_and_sort(records, &widened, now, tz),
            used_fallback: true,
        };
    }
    FeedResult {
        records: first,
        used_fallback: false,
    }
}

/// Conjunctive predicates (league, search, day bucket) followed by a
/// chronological sort. Events whose instant doesn't parse can't be ordered
/// and are excluded outright.
fn filter_and_sort(
    records: &[FeedRecord],
    filter: &FilterState,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<FeedRecord> {
    let today = civil::civil_date(now, tz);

    let mut keep: Vec<(i64, FeedRecord)> = Vec::with_capacity(records.len());
    for record in records {
        let Some(instant) = civil::parse_instant(&record.event.start_time) else {
            continue;
        };
        if !league_matches(filter, record) || !search_matches(filter, record) {
            continue;
        }
        let Some(day) = civil::event_civil_date(&record.event, tz) else {
            continue;
        };
        if !civil::bucket_matches(filter.bucket, day, today) {
            continue;
        }
        keep.push((instant.timestamp_millis(), record.clone()));
    }

    // Stable sorts both ways; ties keep merge order.
    match filter.sort {
        SortDirection::Soonest => keep.sort_by_key(|(millis, _)| *millis),
        SortDirection::Latest => keep.sort_by_key(|(millis, _)| Reverse(*millis)),
    }
    keep.into_iter().map(|(_, record)| record).collect()
}

fn league_matches(filter: &FilterState, record: &FeedRecord) -> bool {
    match filter.league.as_deref() {
        None => true,
        Some(league) => record.event.league.eq_ignore_ascii_case(league),
    }
}

fn search_matches(filter: &FilterState, record: &FeedRecord) -> bool {
    let needle = filter.search.trim();
    if needle.is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    record.event.home.to_lowercase().contains(&needle)
        || record.event.away.to_lowercase().contains(&needle)
}
