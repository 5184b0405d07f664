//! Gameday Feed Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the refresh scheduler, shared state,
//! and middleware.

use std::sync::{Arc, RwLock};

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gameday_feed_engine::api::{self, AppState};
use gameday_feed_engine::feed::config;
use gameday_feed_engine::feed::history::RoundHistory;
use gameday_feed_engine::feed::providers::ApiFeedSource;
use gameday_feed_engine::feed::scheduler::{self, FeedCallback, FeedEvent, SchedulerCfg};
use gameday_feed_engine::feed::types::FilterState;
use gameday_feed_engine::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FEED_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("FEED_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = config::load_config_default().expect("Failed to load feed config");
    let tz = cfg
        .reference_tz()
        .expect("Failed to parse reference timezone");

    let metrics = Metrics::init(cfg.interval().as_millis() as u64);

    // Caller-owned cells: the latest raw snapshot and the last displayed feed.
    let snapshot: scheduler::SharedSnapshot = Arc::new(RwLock::new(None));
    let last_feed = Arc::new(RwLock::new(None));
    let history = Arc::new(RoundHistory::with_capacity(200));

    let source = Arc::new(ApiFeedSource::new(cfg.api_base_url.as_str()));
    let scheduler_cfg = SchedulerCfg {
        interval: cfg.interval(),
        fetch_limit: cfg.fetch_limit,
        reference_tz: tz,
        leagues: cfg.leagues.clone(),
    };

    let cb_last = last_feed.clone();
    let cb_history = history.clone();
    let on_event: FeedCallback = Arc::new(move |event| match event {
        FeedEvent::Refreshing(phase) => {
            tracing::debug!(target: "feed", phase = ?phase, "round started");
        }
        FeedEvent::Updated { phase, result } => {
            cb_history.push_ok(phase, &result);
            if let Ok(mut guard) = cb_last.write() {
                *guard = Some(result);
            }
        }
        FeedEvent::Failed { phase, error } => {
            cb_history.push_err(phase, &error);
        }
    });

    let handle = Arc::new(scheduler::start(
        source,
        scheduler_cfg,
        FilterState::default(),
        snapshot.clone(),
        on_event,
    ));

    let state = AppState {
        snapshot,
        last_feed,
        history,
        scheduler: handle,
        reference_tz: tz,
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
