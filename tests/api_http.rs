// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /feed (empty state and seeded snapshot)
// - POST /filter
// - GET /debug/scheduler

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use chrono_tz::America::New_York;
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use gameday_feed_engine::api::{self, AppState};
use gameday_feed_engine::feed::history::RoundHistory;
use gameday_feed_engine::feed::scheduler::{self, SchedulerCfg};
use gameday_feed_engine::feed::types::{
    EventQuery, FeedSource, FilterState, GameEvent, Prediction, RoundError,
};
use gameday_feed_engine::feed::Snapshot;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct EmptySource;

#[async_trait]
impl FeedSource for EmptySource {
    async fn fetch_events(&self, _query: &EventQuery) -> Result<Vec<GameEvent>, RoundError> {
        Ok(Vec::new())
    }
    async fn fetch_predictions(&self) -> Result<Vec<Prediction>, RoundError> {
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "Empty"
    }
}

fn event(id: &str, league: &str, home: &str, away: &str, start: &str) -> GameEvent {
    GameEvent {
        id: id.to_string(),
        league: league.to_string(),
        home: home.to_string(),
        away: away.to_string(),
        start_time: start.to_string(),
        local_day: None,
    }
}

/// Build the same Router the binary uses, with a stopped scheduler and an
/// optionally pre-seeded snapshot.
fn test_router(snapshot: Option<Snapshot>) -> Router {
    let cell = Arc::new(RwLock::new(snapshot));
    let handle = scheduler::start(
        Arc::new(EmptySource),
        SchedulerCfg {
            interval: Duration::from_secs(3600),
            fetch_limit: 10,
            reference_tz: New_York,
            leagues: Vec::new(),
        },
        FilterState::default(),
        cell.clone(),
        Arc::new(|_| {}),
    );
    // Stopped before it ever runs a round; handlers see only the seed.
    handle.stop();

    let state = AppState {
        snapshot: cell,
        last_feed: Arc::new(RwLock::new(None)),
        history: Arc::new(RoundHistory::with_capacity(16)),
        scheduler: Arc::new(handle),
        reference_tz: New_York,
    };
    api::create_router(state)
}

fn seeded_snapshot() -> Snapshot {
    Snapshot {
        events: vec![
            event("a", "NBA", "Celtics", "Lakers", "2024-01-15T23:30:00-05:00"),
            event("b", "NFL", "Chiefs", "Bills", "2024-01-16T20:00:00-05:00"),
        ],
        predictions: vec![Prediction {
            event_id: "a".into(),
            confidence: 0.8,
            model: "elo-v3".into(),
            generated_at: None,
        }],
        fetched_at: 1_705_340_000,
    }
}

async fn body_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(None);

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn api_feed_is_empty_before_any_round() {
    let app = test_router(None);

    let req = Request::builder()
        .method("GET")
        .uri("/feed?bucket=all&sort=soonest")
        .body(Body::empty())
        .expect("build GET /feed");

    let resp = app.oneshot(req).await.expect("oneshot /feed");
    assert!(resp.status().is_success());

    let v = body_json(resp).await;
    assert_eq!(v["records"].as_array().map(Vec::len), Some(0));
    assert_eq!(v["usedFallback"], Json::Bool(false));
}

#[tokio::test]
async fn api_feed_serves_merged_records_from_the_snapshot() {
    let app = test_router(Some(seeded_snapshot()));

    let req = Request::builder()
        .method("GET")
        .uri("/feed?league=NBA&bucket=all&sort=soonest")
        .body(Body::empty())
        .expect("build GET /feed");

    let resp = app.oneshot(req).await.expect("oneshot /feed");
    assert!(resp.status().is_success());

    let v = body_json(resp).await;
    let records = v["records"].as_array().expect("records array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["event"]["id"], Json::String("a".into()));
    assert_eq!(
        records[0]["event"]["startTime"],
        Json::String("2024-01-15T23:30:00-05:00".into())
    );
    let confidence = records[0]["prediction"]["confidence"]
        .as_f64()
        .expect("confidence present");
    assert!((confidence - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn api_filter_accepts_a_filter_state() {
    let app = test_router(None);

    let payload = serde_json::json!({
        "league": "NBA",
        "search": "",
        "bucket": "today",
        "sort": "soonest"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/filter")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /filter");

    let resp = app.oneshot(req).await.expect("oneshot /filter");
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn api_debug_scheduler_reports_lifecycle() {
    let app = test_router(None);

    let req = Request::builder()
        .method("GET")
        .uri("/debug/scheduler")
        .body(Body::empty())
        .expect("build GET /debug/scheduler");

    let resp = app.oneshot(req).await.expect("oneshot /debug/scheduler");
    let v = body_json(resp).await;
    assert_eq!(v["stopped"], Json::Bool(true));
    assert_eq!(v["refreshing"], Json::Bool(false));
}
