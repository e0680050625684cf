//! Read-through cache for usage records.
//!
//! Caches store reads to avoid redundant queries on repeated checks within a
//! short window. The cache is process-local and advisory only — never a
//! source of truth. Every successful store write for a key must be followed
//! by [`remove`](UsageCache::remove) (deletion, not update), so a racing read
//! that populated the cache just before the write can never be re-served.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::record::{AnonymousUsageRecord, UserUsageRecord};

/// Key for a cached usage record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Authenticated user, by user id.
    User(String),
    /// Anonymous principal, by fingerprint.
    Anonymous(String),
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user_usage:{}", id),
            Self::Anonymous(fp) => write!(f, "anonymous_usage:{}", fp),
        }
    }
}

/// Cached store record.
#[derive(Debug, Clone)]
pub enum CachedRecord {
    /// A per-user usage row.
    User(UserUsageRecord),
    /// A per-fingerprint usage row.
    Anonymous(AnonymousUsageRecord),
}

/// Cache entry with expiration.
#[derive(Debug)]
struct CacheEntry {
    record: CachedRecord,
    inserted_at: Instant,
    expires_at: Instant,
}

/// Usage record cache with per-kind TTLs and bounded capacity.
///
/// Authenticated entries use a shorter TTL (their quota changes daily);
/// anonymous entries live a little longer. Entries past their TTL are treated
/// as absent. When the cache is full, expired entries are dropped first, then
/// the oldest fifth by insertion time.
#[derive(Debug)]
pub struct UsageCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    /// TTL for authenticated usage records.
    user_ttl: Duration,
    /// TTL for anonymous usage records.
    anonymous_ttl: Duration,
    /// Capacity ceiling; eviction kicks in above this.
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UsageCache {
    /// Create a new cache.
    pub fn new(user_ttl: Duration, anonymous_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            user_ttl,
            anonymous_ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached record.
    ///
    /// Returns `Some` only when an entry exists and is within its TTL.
    pub fn get(&self, key: &CacheKey) -> Option<CachedRecord> {
        let entries = self.entries.read();
        if let Some(entry) = entries.get(key) {
            if Instant::now() < entry.expires_at {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.record.clone());
            }
        }
        drop(entries);

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert a record, using the TTL matching the key kind.
    pub fn insert(&self, key: CacheKey, record: CachedRecord) {
        let ttl = match key {
            CacheKey::User(_) => self.user_ttl,
            CacheKey::Anonymous(_) => self.anonymous_ttl,
        };
        let now = Instant::now();

        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries {
            Self::evict(&mut entries, self.max_entries, now);
        }
        entries.insert(
            key,
            CacheEntry {
                record,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Remove a key.
    ///
    /// Called after every successful store write so the next read goes to
    /// the store. Removing a missing key is a no-op.
    pub fn remove(&self, key: &CacheKey) {
        self.entries.write().remove(key);
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Remove entries past their TTL.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, e| e.expires_at > now);
    }

    /// Drop expired entries, then the oldest ~20% if still at capacity.
    fn evict(entries: &mut HashMap<CacheKey, CacheEntry>, max_entries: usize, now: Instant) {
        entries.retain(|_, e| e.expires_at > now);
        if entries.len() < max_entries {
            return;
        }

        let mut by_age: Vec<(CacheKey, Instant)> = entries
            .iter()
            .map(|(k, e)| (k.clone(), e.inserted_at))
            .collect();
        by_age.sort_by_key(|&(_, inserted_at)| inserted_at);

        let to_remove = (max_entries / 5).max(1);
        for (key, _) in by_age.into_iter().take(to_remove) {
            entries.remove(&key);
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries currently cached (including expired, pre-sweep).
    pub size: usize,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache() -> UsageCache {
        UsageCache::new(Duration::from_secs(60), Duration::from_secs(60), 100)
    }

    fn anon_record(fingerprint: &str, count: i64) -> CachedRecord {
        CachedRecord::Anonymous(AnonymousUsageRecord {
            fingerprint: fingerprint.to_string(),
            usage_count: count,
            created_at: 0,
            updated_at: 0,
        })
    }

    #[test]
    fn test_cache_basic() {
        let cache = make_cache();
        let key = CacheKey::Anonymous("abc12345".into());

        cache.insert(key.clone(), anon_record("abc12345", 3));
        match cache.get(&key) {
            Some(CachedRecord::Anonymous(r)) => assert_eq!(r.usage_count, 3),
            other => panic!("unexpected lookup result: {:?}", other),
        }

        assert!(cache.get(&CacheKey::Anonymous("missing0".into())).is_none());
    }

    #[test]
    fn test_cache_expiration() {
        let cache = UsageCache::new(Duration::from_millis(10), Duration::from_millis(10), 100);
        let key = CacheKey::Anonymous("abc12345".into());

        cache.insert(key.clone(), anon_record("abc12345", 1));
        assert!(cache.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_cache_remove() {
        let cache = make_cache();
        let key = CacheKey::User("user-1234".into());

        cache.insert(
            key.clone(),
            CachedRecord::User(UserUsageRecord {
                user_id: "user-1234".into(),
                plan: genquota_core::PlanTier::Free,
                usage_count: 1,
                last_usage_date: None,
            }),
        );
        assert!(cache.get(&key).is_some());

        cache.remove(&key);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_cache_stats() {
        let cache = make_cache();
        let key = CacheKey::Anonymous("abc12345".into());

        cache.insert(key.clone(), anon_record("abc12345", 1));
        cache.get(&key); // hit
        cache.get(&key); // hit
        cache.get(&CacheKey::Anonymous("other123".into())); // miss

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_eviction_bounds_size() {
        let cache = UsageCache::new(Duration::from_secs(60), Duration::from_secs(60), 10);

        for i in 0..25 {
            let fp = format!("fingerpr{:02}", i);
            cache.insert(CacheKey::Anonymous(fp.clone()), anon_record(&fp, 1));
        }

        // Eviction keeps the map at or below capacity after each insert.
        assert!(cache.stats().size <= 10);
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = UsageCache::new(Duration::from_millis(10), Duration::from_millis(10), 100);

        cache.insert(
            CacheKey::Anonymous("abc12345".into()),
            anon_record("abc12345", 1),
        );
        std::thread::sleep(Duration::from_millis(20));
        cache.cleanup_expired();

        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_display_key_format() {
        assert_eq!(
            CacheKey::User("u-1".into()).to_string(),
            "user_usage:u-1"
        );
        assert_eq!(
            CacheKey::Anonymous("abc".into()).to_string(),
            "anonymous_usage:abc"
        );
    }
}
