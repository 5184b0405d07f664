// src/feed/types.rs
use serde::{Deserialize, Serialize};

/// A schedulable game as returned by the dashboard API.
///
/// Replaced wholesale on every refresh round; nothing patches these in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub id: String,
    /// League key, e.g. "NBA", "NFL".
    pub league: String,
    pub home: String,
    pub away: String,
    /// Tip-off / kickoff instant, RFC 3339. May be unparseable; such events are
    /// kept in the snapshot but never appear in bucketed or sorted output.
    pub start_time: String,
    /// Calendar day pre-computed by the data source in the reference timezone
    /// (`YYYY-MM-DD`). When present it wins over recomputing from `start_time`,
    /// so two timezone implementations can't disagree near midnight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_day: Option<String>,
}

/// Model output attached to a game by id. Zero or one per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub event_id: String,
    /// Win-confidence scalar in [0, 1].
    pub confidence: f32,
    /// Which model produced this number, e.g. "elo-v3".
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// One event paired with its prediction, if any. Rebuilt fresh every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub event: GameEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

/// Coarse temporal filter over an event's civil date in the reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DayBucket {
    Today,
    Tomorrow,
    ThisWeek,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending by start instant.
    Soonest,
    /// Descending by start instant.
    Latest,
}

/// The caller-owned filter value passed into the pipeline each round.
/// The engine holds no mutable copy of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// `None` means "all leagues".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    /// Case-insensitive substring over home/away; empty always passes.
    #[serde(default)]
    pub search: String,
    pub bucket: DayBucket,
    pub sort: SortDirection,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            league: None,
            search: String::new(),
            bucket: DayBucket::Today,
            sort: SortDirection::Soonest,
        }
    }
}

/// Output contract of one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResult {
    pub records: Vec<FeedRecord>,
    /// True when the requested narrow bucket was empty and the result was
    /// widened to `all` on the caller's behalf.
    pub used_fallback: bool,
}

/// Source-side query for `fetch_events`. The `league`/`day` parameters are a
/// pre-filter optimization at the API; the pipeline still filters the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    pub include_predictions: bool,
    pub limit: u32,
}

/// Why a refresh round failed. `Fetch` is a network/transport problem;
/// `Data` means the remote payload didn't match the documented shape.
/// The caller keeps displaying the last-known-good feed either way.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error("feed fetch failed: {0}")]
    Fetch(anyhow::Error),
    #[error("feed payload malformed: {0}")]
    Data(anyhow::Error),
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<GameEvent>, RoundError>;
    async fn fetch_predictions(&self) -> Result<Vec<Prediction>, RoundError>;
    fn name(&self) -> &'static str;
}
