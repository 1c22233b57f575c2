//! Fixed-window login rate limiting keyed by client address.
//!
//! Flow Overview:
//! 1) The first attempt from a key opens a window of `window` seconds.
//! 2) Every further attempt in that window bumps the counter.
//! 3) Once the counter passes `max_attempts` the key is limited until the window ends.
//! 4) A successful login removes the key so the next attempt starts fresh.
//!
//! The table lives in process memory and is bounded by `max_entries`. Entries are
//! also indexed by window end, so expiry and eviction never scan the whole table.

use crate::clock::Clock;
use axum::http::HeaderMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const LOGIN_MAX_ATTEMPTS: u32 = 10;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Key shared by every client whose address could not be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RateEntry {
    count: u32,
    reset_at: u64,
}

#[derive(Debug, Default)]
struct RateTable {
    entries: HashMap<String, RateEntry>,
    /// `(reset_at, key)` for every entry in `entries`.
    by_reset: BTreeSet<(u64, String)>,
}

impl RateTable {
    fn insert(&mut self, key: &str, entry: RateEntry) {
        if let Some(old) = self.entries.insert(key.to_string(), entry) {
            self.by_reset.remove(&(old.reset_at, key.to_string()));
        }
        self.by_reset.insert((entry.reset_at, key.to_string()));
    }

    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.by_reset.remove(&(old.reset_at, key.to_string()));
        }
    }

    /// Remove the entry whose window ends first.
    fn pop_earliest(&mut self) -> Option<u64> {
        let (reset_at, key) = self.by_reset.pop_first()?;
        self.entries.remove(&key);
        Some(reset_at)
    }

    /// Remove every entry whose window has ended at `now`.
    fn expire(&mut self, now: u64) -> usize {
        let mut removed = 0;
        while self
            .by_reset
            .first()
            .is_some_and(|(reset_at, _)| *reset_at <= now)
        {
            self.pop_earliest();
            removed += 1;
        }
        removed
    }
}

pub struct LoginRateLimiter {
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    window_secs: u64,
    max_entries: usize,
    table: Mutex<RateTable>,
}

impl std::fmt::Debug for LoginRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRateLimiter")
            .field("max_attempts", &self.max_attempts)
            .field("window_secs", &self.window_secs)
            .field("max_entries", &self.max_entries)
            .field("tracked", &self.len())
            .finish()
    }
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        max_attempts: u32,
        window: Duration,
        max_entries: usize,
    ) -> Self {
        Self {
            clock,
            max_attempts,
            window_secs: window.as_secs().max(1),
            max_entries: max_entries.max(1),
            table: Mutex::new(RateTable::default()),
        }
    }

    /// Limiter with the login defaults (10 attempts per 10 minutes).
    #[must_use]
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW, DEFAULT_MAX_ENTRIES)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Register an attempt from `key` at `now`.
    pub fn admit(&self, key: &str, now: u64) -> RateLimitDecision {
        let mut table = self.lock();

        if let Some(entry) = table.entries.get_mut(key) {
            if entry.reset_at > now {
                entry.count = entry.count.saturating_add(1);
                return if entry.count > self.max_attempts {
                    RateLimitDecision::Limited
                } else {
                    RateLimitDecision::Allowed
                };
            }
        } else if table.entries.len() >= self.max_entries {
            self.make_room(&mut table, now);
        }

        table.insert(
            key,
            RateEntry {
                count: 1,
                reset_at: now.saturating_add(self.window_secs),
            },
        );
        RateLimitDecision::Allowed
    }

    /// Register an attempt from `key` at the limiter's current time.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.admit(key, self.clock.now())
    }

    /// Forget `key`, typically after it presented a correct credential.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop every entry whose window has ended. Returns how many were removed.
    pub fn sweep(&self, now: u64) -> usize {
        self.lock().expire(now)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(&self, table: &mut RateTable, now: u64) {
        table.expire(now);
        if table.entries.len() < self.max_entries {
            return;
        }
        // Still full after dropping expired windows: evict the oldest one.
        table.pop_earliest();
    }

    fn lock(&self) -> MutexGuard<'_, RateTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Derive the rate-limit key for a request from common proxy headers.
///
/// Uses the first `X-Forwarded-For` hop, then `X-Real-IP`, then [`UNKNOWN_CLIENT`].
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use axum::http::HeaderValue;

    fn limiter(clock: Arc<ManualClock>) -> LoginRateLimiter {
        LoginRateLimiter::with_defaults(clock)
    }

    #[test]
    fn test_eleventh_attempt_is_limited() {
        let clock = Arc::new(ManualClock::new(1000));
        let limiter = limiter(clock);

        for attempt in 1..=10 {
            assert_eq!(
                limiter.admit("1.2.3.4", 1000 + attempt),
                RateLimitDecision::Allowed,
                "attempt {attempt} should be allowed"
            );
        }
        assert_eq!(limiter.admit("1.2.3.4", 1011), RateLimitDecision::Limited);
        assert_eq!(limiter.admit("1.2.3.4", 1012), RateLimitDecision::Limited);
    }

    #[test]
    fn test_window_elapses() {
        let clock = Arc::new(ManualClock::new(1000));
        let limiter = limiter(clock);

        for _ in 0..11 {
            limiter.admit("1.2.3.4", 1000);
        }
        assert_eq!(limiter.admit("1.2.3.4", 1599), RateLimitDecision::Limited);
        // reset_at = 1600; the window is over once reset_at <= now
        assert_eq!(limiter.admit("1.2.3.4", 1600), RateLimitDecision::Allowed);
        for _ in 0..9 {
            assert_eq!(limiter.admit("1.2.3.4", 1601), RateLimitDecision::Allowed);
        }
        assert_eq!(limiter.admit("1.2.3.4", 1601), RateLimitDecision::Limited);
    }

    #[test]
    fn test_reset_starts_fresh() {
        let clock = Arc::new(ManualClock::new(1000));
        let limiter = limiter(clock);

        for _ in 0..11 {
            limiter.admit("1.2.3.4", 1000);
        }
        assert_eq!(limiter.admit("1.2.3.4", 1000), RateLimitDecision::Limited);

        limiter.reset("1.2.3.4");
        assert!(limiter.is_empty());
        for _ in 0..10 {
            assert_eq!(limiter.admit("1.2.3.4", 1000), RateLimitDecision::Allowed);
        }
        assert_eq!(limiter.admit("1.2.3.4", 1000), RateLimitDecision::Limited);
    }

    #[test]
    fn test_keys_are_independent() {
        let clock = Arc::new(ManualClock::new(1000));
        let limiter = limiter(clock);

        for _ in 0..11 {
            limiter.admit("1.2.3.4", 1000);
        }
        assert_eq!(limiter.admit("1.2.3.4", 1000), RateLimitDecision::Limited);
        assert_eq!(limiter.admit("5.6.7.8", 1000), RateLimitDecision::Allowed);
    }

    #[test]
    fn test_check_uses_clock() {
        let clock = Arc::new(ManualClock::new(1000));
        let limiter = LoginRateLimiter::new(clock.clone(), 1, Duration::from_secs(60), 100);

        assert_eq!(limiter.check("k"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("k"), RateLimitDecision::Limited);
        clock.advance(60);
        assert_eq!(limiter.check("k"), RateLimitDecision::Allowed);
    }

    #[test]
    fn test_sweep_removes_expired_only() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = LoginRateLimiter::new(clock, 10, Duration::from_secs(100), 100);

        limiter.admit("old", 0);
        limiter.admit("new", 50);
        assert_eq!(limiter.sweep(99), 0);
        assert_eq!(limiter.sweep(100), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.sweep(150), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_table_is_bounded() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = LoginRateLimiter::new(clock, 1, Duration::from_secs(100), 3);

        limiter.admit("a", 0);
        limiter.admit("b", 1);
        limiter.admit("c", 2);
        limiter.admit("d", 3);
        assert_eq!(limiter.len(), 3);

        assert_eq!(limiter.admit("c", 4), RateLimitDecision::Limited);
        assert_eq!(limiter.admit("d", 4), RateLimitDecision::Limited);
        // "a" had the earliest window and was evicted, so it starts over
        assert_eq!(limiter.admit("a", 4), RateLimitDecision::Allowed);
        assert_eq!(limiter.len(), 3);
    }

    #[test]
    fn test_bounded_table_prefers_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = LoginRateLimiter::new(clock, 1, Duration::from_secs(10), 2);

        limiter.admit("a", 0);
        limiter.admit("b", 5);
        // at t=12 "a" has expired and "b" is still live
        limiter.admit("c", 12);
        assert_eq!(limiter.len(), 2);
        assert_eq!(limiter.admit("b", 12), RateLimitDecision::Limited);
    }

    #[test]
    fn test_full_table_evicts_in_window_order() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = LoginRateLimiter::new(clock, 1, Duration::from_secs(100), 3);

        for t in 0..10u64 {
            limiter.admit(&format!("k{t}"), t);
        }
        assert_eq!(limiter.len(), 3);
        for key in ["k7", "k8", "k9"] {
            assert_eq!(limiter.admit(key, 10), RateLimitDecision::Limited, "{key}");
        }

        limiter.reset("k8");
        // k7 (ends at 107) and k9 (ends at 109) remain
        assert_eq!(limiter.sweep(107), 1);
        assert_eq!(limiter.sweep(109), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_renewed_window_is_reindexed() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = LoginRateLimiter::new(clock, 1, Duration::from_secs(10), 2);

        limiter.admit("a", 0);
        limiter.admit("b", 5);
        // "a" opens a new window ending at 20, after "b" (ends at 15)
        assert_eq!(limiter.admit("a", 10), RateLimitDecision::Allowed);
        limiter.admit("c", 11);
        assert_eq!(limiter.len(), 2);
        // "b" was the earliest window and was evicted for "c"
        assert_eq!(limiter.admit("a", 11), RateLimitDecision::Limited);
        assert_eq!(limiter.sweep(20), 1);
        assert_eq!(limiter.sweep(21), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_concurrent_attempts_do_not_over_admit() {
        let clock = Arc::new(ManualClock::new(1000));
        let limiter = Arc::new(limiter(clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| limiter.admit("shared", 1000) == RateLimitDecision::Allowed)
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, LOGIN_MAX_ATTEMPTS as usize);
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_key_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" , 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static(" 10.0.0.2 "));
        assert_eq!(client_key(&headers), "10.0.0.2");
    }

    #[test]
    fn test_client_key_unknown() {
        assert_eq!(client_key(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
