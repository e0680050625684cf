//! Per-key fixed-window counting.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::debug;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
    /// How long to wait before retrying, set only on rejection.
    pub retry_after: Option<Duration>,
}

/// Non-mutating view of a key's current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Requests counted in the current window.
    pub count: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Limiter statistics.
#[derive(Debug, Clone)]
pub struct LimiterStats {
    /// Keys currently tracked (including expired, pre-sweep).
    pub total_entries: usize,
    /// Keys whose window has not yet expired.
    pub active_entries: usize,
    /// Configured entry ceiling.
    pub max_entries: usize,
}

#[derive(Clone)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
    last_request: Instant,
}

/// Rate limiter tracking fixed windows per key.
///
/// The first request for a key opens a window; requests within it increment
/// a counter; once the window expires the next request starts a fresh one
/// with count 1. When the key table grows past `max_entries`, the oldest
/// keys by last access are evicted first, bounding memory regardless of
/// traffic shape.
pub struct FixedWindowLimiter {
    /// Map of key -> (count, window expiry, last access)
    entries: Arc<RwLock<HashMap<String, WindowEntry>>>,
    /// Entry ceiling; eviction kicks in above this.
    max_entries: usize,
    /// Notify for shutdown
    shutdown: Arc<Notify>,
}

impl FixedWindowLimiter {
    /// Create a new limiter with the given entry ceiling.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Check whether a request for `key` is allowed under `limit` per `window`.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        let now = Instant::now();
        let mut map = self.entries.write();

        if let Some(entry) = map.get_mut(key) {
            if now >= entry.reset_at {
                // Window expired: start a fresh one
                entry.count = 1;
                entry.reset_at = now + window;
                entry.last_request = now;
                RateLimitDecision {
                    allowed: true,
                    remaining: limit.saturating_sub(1),
                    reset_after: window,
                    retry_after: None,
                }
            } else if entry.count >= limit {
                let reset_after = entry.reset_at.saturating_duration_since(now);
                RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_after,
                    retry_after: Some(reset_after),
                }
            } else {
                entry.count += 1;
                entry.last_request = now;
                RateLimitDecision {
                    allowed: true,
                    remaining: limit.saturating_sub(entry.count),
                    reset_after: entry.reset_at.saturating_duration_since(now),
                    retry_after: None,
                }
            }
        } else {
            if map.len() >= self.max_entries {
                Self::evict(&mut map, now, self.max_entries);
            }
            map.insert(
                key.to_string(),
                WindowEntry {
                    count: 1,
                    reset_at: now + window,
                    last_request: now,
                },
            );
            RateLimitDecision {
                allowed: true,
                remaining: limit.saturating_sub(1),
                reset_after: window,
                retry_after: None,
            }
        }
    }

    /// Current window state for a key, without counting a request.
    pub fn status(&self, key: &str, limit: u32) -> RateLimitStatus {
        let now = Instant::now();
        let map = self.entries.read();

        match map.get(key) {
            Some(entry) if now < entry.reset_at => RateLimitStatus {
                count: entry.count,
                remaining: limit.saturating_sub(entry.count),
                reset_after: entry.reset_at.saturating_duration_since(now),
            },
            _ => RateLimitStatus {
                count: 0,
                remaining: limit,
                reset_after: Duration::ZERO,
            },
        }
    }

    /// Forget a key's window.
    pub fn reset(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Remove expired windows.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut map = self.entries.write();
        let before = map.len();
        map.retain(|_, entry| entry.reset_at > now);
        let removed = before - map.len();
        if removed > 0 {
            debug!(removed, remaining = map.len(), "rate limit entries cleaned up");
        }
    }

    /// Drop expired entries, then the oldest ~10% by last access if the
    /// table is still at capacity.
    fn evict(map: &mut HashMap<String, WindowEntry>, now: Instant, max_entries: usize) {
        map.retain(|_, entry| entry.reset_at > now);
        if map.len() < max_entries {
            return;
        }

        let mut by_access: Vec<(String, Instant)> = map
            .iter()
            .map(|(k, e)| (k.clone(), e.last_request))
            .collect();
        by_access.sort_by_key(|&(_, last_request)| last_request);

        let to_remove = (max_entries / 10).max(1);
        for (key, _) in by_access.into_iter().take(to_remove) {
            map.remove(&key);
        }
    }

    /// Start the background cleanup task.
    pub fn start_cleanup_task(&self, cleanup_interval: Duration) {
        let entries = self.entries.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        debug!("rate limiter cleanup task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(cleanup_interval) => {
                        let now = Instant::now();
                        let mut map = entries.write();
                        let before = map.len();
                        map.retain(|_, entry| entry.reset_at > now);
                        let removed = before - map.len();
                        if removed > 0 {
                            debug!(removed, remaining = map.len(), "rate limit entries cleaned up");
                        }
                    }
                }
            }
        });
    }

    /// Get limiter statistics.
    pub fn stats(&self) -> LimiterStats {
        let now = Instant::now();
        let map = self.entries.read();
        let active_entries = map.values().filter(|e| e.reset_at > now).count();

        LimiterStats {
            total_entries: map.len(),
            active_entries,
            max_entries: self.max_entries,
        }
    }

    /// Signal shutdown to the cleanup task.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for FixedWindowLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_under_limit() {
        let limiter = FixedWindowLimiter::new(100);

        for expected_remaining in [4, 3, 2, 1, 0] {
            let decision = limiter.check("key1", 5, Duration::from_secs(60));
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert!(decision.retry_after.is_none());
        }

        let decision = limiter.check("key1", 5, Duration::from_secs(60));
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.retry_after.is_some());
    }

    #[test]
    fn test_distinct_keys_have_own_windows() {
        let limiter = FixedWindowLimiter::new(100);

        assert!(limiter.check("key1", 2, Duration::from_secs(60)).allowed);
        assert!(limiter.check("key1", 2, Duration::from_secs(60)).allowed);
        assert!(!limiter.check("key1", 2, Duration::from_secs(60)).allowed);

        assert!(limiter.check("key2", 2, Duration::from_secs(60)).allowed);
        assert!(limiter.check("key2", 2, Duration::from_secs(60)).allowed);
        assert!(!limiter.check("key2", 2, Duration::from_secs(60)).allowed);
    }

    #[test]
    fn test_window_reset_starts_fresh_count() {
        // Zero-length window: every request starts a fresh window
        let limiter = FixedWindowLimiter::new(100);

        assert!(limiter.check("key1", 1, Duration::ZERO).allowed);
        assert!(limiter.check("key1", 1, Duration::ZERO).allowed);
    }

    #[test]
    fn test_retry_after_within_window() {
        let limiter = FixedWindowLimiter::new(100);
        let window = Duration::from_secs(60);

        limiter.check("key1", 1, window);
        let decision = limiter.check("key1", 1, window);

        assert!(!decision.allowed);
        let retry_after = decision.retry_after.unwrap();
        assert!(retry_after <= window);
        assert!(retry_after > Duration::from_secs(50));
    }

    #[test]
    fn test_status_does_not_count() {
        let limiter = FixedWindowLimiter::new(100);
        limiter.check("key1", 5, Duration::from_secs(60));

        let status = limiter.status("key1", 5);
        assert_eq!(status.count, 1);
        assert_eq!(status.remaining, 4);

        // Unchanged after repeated status reads
        let status = limiter.status("key1", 5);
        assert_eq!(status.count, 1);

        let status = limiter.status("unknown", 5);
        assert_eq!(status.count, 0);
        assert_eq!(status.remaining, 5);
    }

    #[test]
    fn test_reset_forgets_key() {
        let limiter = FixedWindowLimiter::new(100);

        limiter.check("key1", 1, Duration::from_secs(60));
        assert!(!limiter.check("key1", 1, Duration::from_secs(60)).allowed);

        limiter.reset("key1");
        assert!(limiter.check("key1", 1, Duration::from_secs(60)).allowed);
    }

    #[test]
    fn test_cleanup_expired() {
        let limiter = FixedWindowLimiter::new(100);

        limiter.check("stale", 5, Duration::ZERO);
        limiter.check("live", 5, Duration::from_secs(60));
        limiter.cleanup_expired();

        let stats = limiter.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.active_entries, 1);
    }

    #[test]
    fn test_eviction_bounds_memory() {
        let limiter = FixedWindowLimiter::new(10);

        for i in 0..50 {
            limiter.check(&format!("key{}", i), 5, Duration::from_secs(60));
        }

        assert!(limiter.stats().total_entries <= 10);
    }
}
