// src/feed/history.rs
//
// Bounded in-memory log of refresh rounds for /debug/history.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::feed::scheduler::RefreshPhase;
use crate::feed::types::{FeedResult, RoundError};

#[derive(Debug, Clone)]
pub struct RoundEntry {
    pub ts_unix: u64,
    pub phase: RefreshPhase,
    pub records: usize,
    pub used_fallback: bool,
    /// Round failure text; `None` for successful rounds.
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct RoundHistory {
    inner: Mutex<Vec<RoundEntry>>,
    cap: usize,
}

impl RoundHistory {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push_ok(&self, phase: RefreshPhase, result: &FeedResult) {
        self.push(RoundEntry {
            ts_unix: now_unix(),
            phase,
            records: result.records.len(),
            used_fallback: result.used_fallback,
            error: None,
        });
    }

    pub fn push_err(&self, phase: RefreshPhase, err: &RoundError) {
        self.push(RoundEntry {
            ts_unix: now_unix(),
            phase,
            records: 0,
            used_fallback: false,
            error: Some(err.to_string()),
        });
    }

    fn push(&self, entry: RoundEntry) {
        let mut v = self.inner.lock().expect("round history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<RoundEntry> {
        let v = self.inner.lock().expect("round history mutex poisoned");
        let len = v.len();
        let start = len.saturating_sub(n);
        v[start..].to_vec()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
