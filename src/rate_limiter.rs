//! Per-source sliding window rate limiter
//!
//! Each source keeps the timestamps of the requests it admitted during the
//! trailing 60 seconds. A request is admitted only while that window holds
//! fewer entries than the source's ceiling. Admission never blocks: a denied
//! request is skipped for the current cycle.

use crate::{
    clock::Clock,
    constants::{DEFAULT_RATE_LIMIT, RATE_WINDOW_SECS, SOURCE_RATE_LIMITS},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Admitted request timestamps for one source, oldest first
#[derive(Debug, Default)]
struct RateWindow {
    requests: VecDeque<DateTime<Utc>>,
}

impl RateWindow {
    /// Drops every timestamp that fell out of the window
    fn purge(&mut self, now: DateTime<Utc>) {
        let window = Duration::seconds(RATE_WINDOW_SECS);
        while let Some(oldest) = self.requests.front() {
            if now.signed_duration_since(*oldest) >= window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Sliding window rate limiter keyed by source name
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    limits: HashMap<String, usize>,
    default_limit: usize,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter with the built-in per-source ceilings
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let limits = SOURCE_RATE_LIMITS
            .iter()
            .map(|(source, limit)| (source.to_string(), *limit))
            .collect();
        Self::with_limits(limits, clock)
    }

    /// Creates a limiter with explicit ceilings
    ///
    /// Sources missing from `limits` get [`DEFAULT_RATE_LIMIT`].
    pub fn with_limits(limits: HashMap<String, usize>, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limits,
            default_limit: DEFAULT_RATE_LIMIT,
            clock,
        }
    }

    /// Ceiling for `source` in requests per window
    pub fn limit_for(&self, source: &str) -> usize {
        self.limits.get(source).copied().unwrap_or(self.default_limit)
    }

    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Tries to admit one request for `source`
    ///
    /// Returns true and records the request if the window has room,
    /// false otherwise.
    pub fn admit(&self, source: &str) -> bool {
        let now = self.clock.now();
        let limit = self.limit_for(source);
        let mut windows = self.lock_windows();
        let window = windows.entry(source.to_string()).or_default();

        window.purge(now);

        if window.requests.len() < limit {
            window.requests.push_back(now);
            true
        } else {
            tracing::warn!(
                source = source,
                limit = limit,
                "Rate limit exceeded, skipping request"
            );
            false
        }
    }

    /// Number of requests `source` could still make right now
    pub fn remaining(&self, source: &str) -> usize {
        let now = self.clock.now();
        let limit = self.limit_for(source);
        let mut windows = self.lock_windows();
        match windows.get_mut(source) {
            Some(window) => {
                window.purge(now);
                limit.saturating_sub(window.requests.len())
            }
            None => limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn make_limiter(limit: usize) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let limits = HashMap::from([("coingecko".to_string(), limit)]);
        (RateLimiter::with_limits(limits, clock.clone()), clock)
    }

    #[test]
    fn test_denies_request_over_limit() {
        for n in [1, 2, 5, 10] {
            let (limiter, clock) = make_limiter(n);
            for _ in 0..n {
                assert!(limiter.admit("coingecko"));
                clock.advance_secs(1);
            }
            assert!(!limiter.admit("coingecko"), "call {} should be denied", n + 1);
        }
    }

    #[test]
    fn test_window_slides() {
        let (limiter, clock) = make_limiter(2);
        assert!(limiter.admit("coingecko"));
        clock.advance_secs(30);
        assert!(limiter.admit("coingecko"));
        assert!(!limiter.admit("coingecko"));

        // First request is now exactly 60s old and leaves the window
        clock.advance_secs(30);
        assert!(limiter.admit("coingecko"));
        assert!(!limiter.admit("coingecko"));
    }

    #[test]
    fn test_denied_calls_do_not_extend_window() {
        let (limiter, clock) = make_limiter(1);
        assert!(limiter.admit("coingecko"));
        for _ in 0..5 {
            clock.advance_secs(10);
            assert!(!limiter.admit("coingecko"));
        }
        clock.advance_secs(10);
        assert!(limiter.admit("coingecko"));
    }

    #[test]
    fn test_sources_are_independent() {
        let (limiter, _clock) = make_limiter(1);
        assert!(limiter.admit("coingecko"));
        assert!(!limiter.admit("coingecko"));
        // Unconfigured source falls back to the default ceiling
        assert_eq!(limiter.limit_for("defillama"), DEFAULT_RATE_LIMIT);
        assert!(limiter.admit("defillama"));
    }

    #[test]
    fn test_remaining() {
        let (limiter, clock) = make_limiter(3);
        assert_eq!(limiter.remaining("coingecko"), 3);
        limiter.admit("coingecko");
        limiter.admit("coingecko");
        assert_eq!(limiter.remaining("coingecko"), 1);
        clock.advance_secs(60);
        assert_eq!(limiter.remaining("coingecko"), 3);
    }

    #[test]
    fn test_builtin_limits() {
        let limiter = RateLimiter::new(Arc::new(ManualClock::default()));
        assert_eq!(limiter.limit_for("coingecko"), 10);
        assert_eq!(limiter.limit_for("coinmarketcap"), 2);
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_limit() {
        let (limiter, _clock) = make_limiter(10);
        let limiter = Arc::new(limiter);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..5).filter(|_| limiter.admit("coingecko")).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
    }
}
