// src/feed/civil.rs
//
// Civil-date math in the product's one fixed reference timezone. Every bucket
// decision goes through a `NaiveDate` computed here; no caller-local timezone
// or locale formatting is allowed to shift which day an instant lands on.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::feed::types::{DayBucket, GameEvent};

/// Parse an RFC 3339 instant. `None` for anything unparseable; such events
/// are unscheduleable and stay out of bucketed/sorted views.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The calendar day `instant` falls on in `tz`.
pub fn civil_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Canonical `YYYY-MM-DD` string for an instant in `tz`.
pub fn civil_day_string(instant: DateTime<Utc>, tz: Tz) -> String {
    civil_date(instant, tz).format("%Y-%m-%d").to_string()
}

/// Civil day of an event. A pre-supplied `local_day` wins over recomputing
/// from the instant; falls back to the instant when `local_day` is absent or
/// malformed.
pub fn event_civil_date(event: &GameEvent, tz: Tz) -> Option<NaiveDate> {
    if let Some(day) = event.local_day.as_deref() {
        if let Ok(d) = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d") {
            return Some(d);
        }
    }
    parse_instant(&event.start_time).map(|instant| civil_date(instant, tz))
}

/// Bucket membership for a civil day relative to `today`. `tomorrow` and the
/// week window are computed in calendar days, never by hour arithmetic on the
/// instant, so a DST transition can't drift an event across buckets.
pub fn bucket_matches(bucket: DayBucket, day: NaiveDate, today: NaiveDate) -> bool {
    match bucket {
        DayBucket::Today => day == today,
        DayBucket::Tomorrow => today.succ_opt().is_some_and(|t| day == t),
        DayBucket::ThisWeek => {
            day >= today
                && today
                    .checked_add_days(Days::new(7))
                    .is_some_and(|end| day <= end)
        }
        DayBucket::All => true,
    }
}
