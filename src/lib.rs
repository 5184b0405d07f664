// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod feed;
pub mod metrics;

// ---- Re-exports for stable public API ----
// The synchronous pipeline entry point and its value types.
pub use crate::feed::types::{
    DayBucket, EventQuery, FeedRecord, FeedResult, FeedSource, FilterState, GameEvent, Prediction,
    RoundError, SortDirection,
};
pub use crate::feed::{get_feed, run_once, Snapshot};

// The refresh scheduler lifecycle pair.
pub use crate::feed::scheduler::{
    start as start_scheduler, FeedCallback, FeedEvent, RefreshPhase, SchedulerCfg, SchedulerHandle,
    SharedSnapshot,
};

// Router construction: `gameday_feed_engine::api::create_router`.
pub use crate::api::create_router;
