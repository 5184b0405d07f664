// src/feed/scheduler.rs
//
// Recurring refresh driver around `run_once`. Owns the only mutable state in
// the engine: an Idle/Refreshing flag, the filter generation counter, and the
// timer. Rounds run inline on one task, so two can never overlap; a timer
// tick that lands mid-round is dropped, not queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use metrics::{counter, gauge};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::feed::types::{EventQuery, FeedResult, FeedSource, FilterState, RoundError};
use crate::feed::{run_once, Snapshot};

#[derive(Debug, Clone)]
pub struct SchedulerCfg {
    pub interval: Duration,
    pub fetch_limit: u32,
    pub reference_tz: Tz,
    /// League whitelist applied at ingest; empty accepts everything.
    pub leagues: Vec<String>,
}

/// Whether a round should visually replace the feed (first load for the
/// current filter) or update it without clearing what's on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Foreground,
    Background,
}

/// Caller-visible lifecycle of rounds. `Updated` from a search-text re-filter
/// reports `Foreground` (it replaces the list instantly, no loading state).
#[derive(Debug)]
pub enum FeedEvent {
    Refreshing(RefreshPhase),
    Updated {
        phase: RefreshPhase,
        result: FeedResult,
    },
    Failed {
        phase: RefreshPhase,
        error: RoundError,
    },
}

pub type FeedCallback = Arc<dyn Fn(FeedEvent) + Send + Sync>;

/// Latest raw snapshot, shared with whatever serves reads (the API layer).
/// The scheduler is the only writer.
pub type SharedSnapshot = Arc<RwLock<Option<Snapshot>>>;

pub struct SchedulerHandle {
    filter_tx: watch::Sender<FilterState>,
    stop_tx: watch::Sender<bool>,
    stopped: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    refreshing: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerHandle {
    /// Replace the active filter. League/bucket/sort changes start a fresh
    /// foreground round; a search-text-only change re-filters the last
    /// snapshot without touching the network. No-op after `stop`.
    pub fn update_filter(&self, next: FilterState) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        {
            let current = self.filter_tx.borrow();
            if *current == next {
                return;
            }
            if needs_refetch(&current, &next) {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
        }
        let _ = self.filter_tx.send(next);
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Tear the scheduler down. Idempotent; an in-flight round's result is
    /// discarded at completion instead of being applied.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        info!(target: "feed", "scheduler stopped");
    }

    /// Hand out the worker task, e.g. to await it in tests.
    pub fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().expect("scheduler task mutex poisoned").take()
    }
}

fn needs_refetch(current: &FilterState, next: &FilterState) -> bool {
    current.league != next.league || current.bucket != next.bucket || current.sort != next.sort
}

/// Spawn the refresh loop. The first round for the initial filter (and for
/// every later filter change) runs as foreground; timer rounds after that are
/// background.
pub fn start(
    source: Arc<dyn FeedSource>,
    cfg: SchedulerCfg,
    initial_filter: FilterState,
    snapshot: SharedSnapshot,
    on_event: FeedCallback,
) -> SchedulerHandle {
    let (filter_tx, filter_rx) = watch::channel(initial_filter);
    let (stop_tx, stop_rx) = watch::channel(false);
    let stopped = Arc::new(AtomicBool::new(false));
    let generation = Arc::new(AtomicU64::new(0));
    let refreshing = Arc::new(AtomicBool::new(false));

    let worker = Worker {
        source,
        cfg,
        snapshot,
        on_event,
        stopped: stopped.clone(),
        generation: generation.clone(),
        refreshing: refreshing.clone(),
    };
    let task = tokio::spawn(worker.run(filter_rx, stop_rx));

    SchedulerHandle {
        filter_tx,
        stop_tx,
        stopped,
        generation,
        refreshing,
        task: Mutex::new(Some(task)),
    }
}

struct Worker {
    source: Arc<dyn FeedSource>,
    cfg: SchedulerCfg,
    snapshot: SharedSnapshot,
    on_event: FeedCallback,
    stopped: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    refreshing: Arc<AtomicBool>,
}

impl Worker {
    async fn run(
        self,
        mut filter_rx: watch::Receiver<FilterState>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut current = filter_rx.borrow().clone();
        // First transition into Refreshing for the current filter.
        let mut foreground_pending = true;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                res = filter_rx.changed() => {
                    if res.is_err() {
                        break;
                    }
                    let next = filter_rx.borrow_and_update().clone();
                    let refetch = needs_refetch(&current, &next);
                    let search_changed = next.search != current.search;
                    current = next;
                    if refetch {
                        foreground_pending = true;
                        self.round(&current, RefreshPhase::Foreground).await;
                        foreground_pending = false;
                        // Restart the cadence so the next background round is
                        // a full interval away from this one.
                        ticker.reset();
                    } else if search_changed {
                        self.refilter(&current);
                    }
                }
                _ = ticker.tick() => {
                    let phase = if foreground_pending {
                        RefreshPhase::Foreground
                    } else {
                        RefreshPhase::Background
                    };
                    self.round(&current, phase).await;
                    foreground_pending = false;
                }
            }
        }

        self.refreshing.store(false, Ordering::SeqCst);
        gauge!("feed_scheduler_refreshing").set(0.0);
    }

    /// Re-filter the last snapshot client-side; no network round, no
    /// Refreshing notification.
    fn refilter(&self, filter: &FilterState) {
        let snap = match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        if let Some(snap) = snap {
            let result = snap.feed(filter, Utc::now(), self.cfg.reference_tz);
            self.emit(FeedEvent::Updated {
                phase: RefreshPhase::Foreground,
                result,
            });
        }
    }

    async fn round(&self, filter: &FilterState, phase: RefreshPhase) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let gen_at_start = self.generation.load(Ordering::SeqCst);
        self.refreshing.store(true, Ordering::SeqCst);
        gauge!("feed_scheduler_refreshing").set(1.0);
        self.emit(FeedEvent::Refreshing(phase));

        let query = EventQuery {
            league: filter.league.clone(),
            // Never pre-filter by day at the source: the snapshot must stay
            // wide enough for the fallback resolver to widen client-side.
            day: None,
            include_predictions: true,
            limit: self.cfg.fetch_limit,
        };
        let outcome = run_once(self.source.as_ref(), &query, &self.cfg.leagues).await;

        self.refreshing.store(false, Ordering::SeqCst);
        gauge!("feed_scheduler_refreshing").set(0.0);

        if self.stopped.load(Ordering::SeqCst)
            || self.generation.load(Ordering::SeqCst) != gen_at_start
        {
            counter!("feed_stale_discard_total").increment(1);
            info!(target: "feed", "discarding round result; filter or lifecycle moved on");
            return;
        }

        match outcome {
            Ok(snap) => {
                counter!("feed_rounds_total").increment(1);
                let result = snap.feed(filter, Utc::now(), self.cfg.reference_tz);
                if result.used_fallback {
                    counter!("feed_fallback_total").increment(1);
                }
                if let Ok(mut guard) = self.snapshot.write() {
                    *guard = Some(snap);
                }
                info!(
                    target: "feed",
                    records = result.records.len(),
                    fallback = result.used_fallback,
                    phase = ?phase,
                    "feed round complete"
                );
                self.emit(FeedEvent::Updated { phase, result });
            }
            Err(error) => {
                counter!("feed_round_errors_total").increment(1);
                warn!(target: "feed", error = %error, "feed round failed; keeping last-known-good");
                self.emit(FeedEvent::Failed { phase, error });
            }
        }
    }

    fn emit(&self, event: FeedEvent) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        (self.on_event)(event);
    }
}
