// src/api.rs
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use chrono_tz::Tz;
use tower_http::cors::CorsLayer;

use crate::feed::history::RoundHistory;
use crate::feed::scheduler::{SchedulerHandle, SharedSnapshot};
use crate::feed::types::{DayBucket, FeedResult, FilterState, SortDirection};

/// Read-side state for the dashboard. The scheduler writes the snapshot and
/// last feed; handlers only ever read (except `/filter`, which forwards the
/// renderer's filter change to the scheduler).
#[derive(Clone)]
pub struct AppState {
    pub snapshot: SharedSnapshot,
    pub last_feed: Arc<RwLock<Option<FeedResult>>>,
    pub history: Arc<RoundHistory>,
    pub scheduler: Arc<SchedulerHandle>,
    pub reference_tz: Tz,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feed", get(feed))
        .route("/filter", post(update_filter))
        .route("/debug/snapshot", get(debug_snapshot))
        .route("/debug/last-feed", get(debug_last_feed))
        .route("/debug/history", get(debug_history))
        .route("/debug/scheduler", get(debug_scheduler))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct FeedQuery {
    league: Option<String>,
    /// Search text.
    q: Option<String>,
    bucket: Option<DayBucket>,
    sort: Option<SortDirection>,
}

impl FeedQuery {
    fn into_filter(self) -> FilterState {
        let defaults = FilterState::default();
        FilterState {
            league: self
                .league
                .filter(|l| !l.trim().is_empty() && !l.eq_ignore_ascii_case("all")),
            search: self.q.unwrap_or_default(),
            bucket: self.bucket.unwrap_or(defaults.bucket),
            sort: self.sort.unwrap_or(defaults.sort),
        }
    }
}

/// Compute a feed from the latest snapshot. The reference instant is the
/// server clock, supplied here so the pipeline itself stays pure.
async fn feed(State(state): State<AppState>, Query(q): Query<FeedQuery>) -> Json<FeedResult> {
    let filter = q.into_filter();
    let snap = match state.snapshot.read() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    };
    let result = match snap {
        Some(snap) => snap.feed(&filter, Utc::now(), state.reference_tz),
        None => FeedResult::default(),
    };
    Json(result)
}

async fn update_filter(
    State(state): State<AppState>,
    Json(filter): Json<FilterState>,
) -> &'static str {
    state.scheduler.update_filter(filter);
    "ok"
}

#[derive(serde::Serialize)]
struct SnapshotInfo {
    events: usize,
    predictions: usize,
    fetched_at: u64,
}

async fn debug_snapshot(State(state): State<AppState>) -> Json<Option<SnapshotInfo>> {
    let snap = match state.snapshot.read() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    };
    Json(snap.map(|s| SnapshotInfo {
        events: s.events.len(),
        predictions: s.predictions.len(),
        fetched_at: s.fetched_at,
    }))
}

async fn debug_last_feed(State(state): State<AppState>) -> Json<Option<FeedResult>> {
    let last = match state.last_feed.read() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    };
    Json(last)
}

#[derive(serde::Serialize)]
struct HistoryOut {
    ts_unix: u64,
    phase: String,
    records: usize,
    used_fallback: bool,
    error: Option<String>,
}

async fn debug_history(State(state): State<AppState>) -> Json<Vec<HistoryOut>> {
    let rows = state.history.snapshot_last_n(10);
    let out = rows
        .into_iter()
        .map(|r| HistoryOut {
            ts_unix: r.ts_unix,
            phase: format!("{:?}", r.phase).to_uppercase(),
            records: r.records,
            used_fallback: r.used_fallback,
            error: r.error,
        })
        .collect::<Vec<_>>();
    Json(out)
}

#[derive(serde::Serialize)]
struct SchedulerInfo {
    refreshing: bool,
    stopped: bool,
}

async fn debug_scheduler(State(state): State<AppState>) -> Json<SchedulerInfo> {
    Json(SchedulerInfo {
        refreshing: state.scheduler.is_refreshing(),
        stopped: state.scheduler.is_stopped(),
    })
}
