//! Windowed rate limiting keyed by (action, identity)
//!
//! Injected into handlers rather than held as module-level state.
//! Attempts older than the window are pruned on every check, so the
//! map never grows unbounded for active keys; [`RateLimiter::sweep`]
//! drops keys that went fully idle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-key attempt bookkeeping with a fixed time window
#[derive(Debug, Default)]
pub struct RateLimiter {
    attempts: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            attempts: DashMap::new(),
        }
    }

    /// Record an attempt for `(action, identity)` and report whether it
    /// is allowed under `max_attempts` per `window`
    pub fn check(&self, action: &str, identity: &str, max_attempts: usize, window: Duration) -> bool {
        let key = format!("{action}:{identity}");
        let now = Instant::now();

        let mut entry = self.attempts.entry(key).or_default();
        entry.retain(|t| now.duration_since(*t) < window);

        if entry.len() >= max_attempts {
            return false;
        }
        entry.push(now);
        true
    }

    /// Drop keys whose every attempt is older than `window`
    pub fn sweep(&self, window: Duration) {
        let now = Instant::now();
        self.attempts
            .retain(|_, attempts| attempts.iter().any(|t| now.duration_since(*t) < window));
    }

    /// Spawn a periodic task sweeping idle keys every `interval`
    ///
    /// `check` only prunes the key it touches; one-shot identities
    /// (a buyer id seen once, a CEP quoted once) would otherwise keep
    /// their stale attempts for the process lifetime.
    pub fn start_sweeper(
        self: &Arc<Self>,
        window: Duration,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                limiter.sweep(window);
            }
        })
    }
}
