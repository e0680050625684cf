//! In-memory usage store.
//!
//! Suitable for tests and single-process deployments. All mutations run
//! under one mutex, which makes every trait operation trivially atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use time::{Date, OffsetDateTime};

use genquota_core::PlanTier;

use crate::error::StoreError;
use crate::record::{AnonymousUsageRecord, UserUsageRecord};
use crate::traits::UsageStore;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, UserUsageRecord>,
    anonymous: HashMap<String, AnonymousUsageRecord>,
}

/// In-memory [`UsageStore`] backend.
///
/// Tracks how many store operations were performed (`op_count`), which lets
/// tests assert that validation failures never reach the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    ops: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user row.
    pub fn insert_user(
        &self,
        user_id: impl Into<String>,
        plan: PlanTier,
        usage_count: i64,
        last_usage_date: Option<Date>,
    ) {
        let user_id = user_id.into();
        self.inner.lock().users.insert(
            user_id.clone(),
            UserUsageRecord {
                user_id,
                plan,
                usage_count,
                last_usage_date,
            },
        );
    }

    /// Seed an anonymous row.
    pub fn insert_anonymous(&self, fingerprint: impl Into<String>, usage_count: i64) {
        let fingerprint = fingerprint.into();
        let now = now_unix();
        self.inner.lock().anonymous.insert(
            fingerprint.clone(),
            AnonymousUsageRecord {
                fingerprint,
                usage_count,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Change a user's plan.
    pub fn set_plan(&self, user_id: &str, plan: PlanTier) {
        if let Some(record) = self.inner.lock().users.get_mut(user_id) {
            record.plan = plan;
        }
    }

    /// Direct row inspection for tests.
    pub fn user(&self, user_id: &str) -> Option<UserUsageRecord> {
        self.inner.lock().users.get(user_id).cloned()
    }

    /// Direct row inspection for tests.
    pub fn anonymous(&self, fingerprint: &str) -> Option<AnonymousUsageRecord> {
        self.inner.lock().anonymous.get(fingerprint).cloned()
    }

    /// Number of store operations performed through the trait.
    pub fn op_count(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    #[inline]
    fn touch(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }
}

#[inline]
#[allow(clippy::cast_possible_wrap)]
fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError> {
        self.touch();
        Ok(self.inner.lock().users.get(user_id).cloned())
    }

    async fn increment_user_usage(
        &self,
        user_id: &str,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        self.touch();
        let mut inner = self.inner.lock();
        Ok(inner.users.get_mut(user_id).map(|record| {
            record.usage_count += 1;
            record.clone()
        }))
    }

    async fn reset_user_usage(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        self.touch();
        let mut inner = self.inner.lock();
        Ok(inner.users.get_mut(user_id).map(|record| {
            record.usage_count = 1;
            record.last_usage_date = Some(date);
            record.clone()
        }))
    }

    async fn find_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<AnonymousUsageRecord>, StoreError> {
        self.touch();
        Ok(self.inner.lock().anonymous.get(fingerprint).cloned())
    }

    async fn upsert_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<AnonymousUsageRecord, StoreError> {
        self.touch();
        let now = now_unix();
        let mut inner = self.inner.lock();
        let record = inner
            .anonymous
            .entry(fingerprint.to_string())
            .and_modify(|record| {
                record.usage_count += 1;
                record.updated_at = now;
            })
            .or_insert_with(|| AnonymousUsageRecord {
                fingerprint: fingerprint.to_string(),
                usage_count: 1,
                created_at: now,
                updated_at: now,
            });
        Ok(record.clone())
    }

    async fn purge_anonymous_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        self.touch();
        let cutoff_unix = cutoff.unix_timestamp();
        let mut inner = self.inner.lock();
        let before = inner.anonymous.len();
        inner.anonymous.retain(|_, r| r.updated_at >= cutoff_unix);
        Ok((before - inner.anonymous.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[tokio::test]
    async fn test_find_missing_user() {
        let store = MemoryStore::new();
        assert!(store.find_user("nobody-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_and_reset() {
        let store = MemoryStore::new();
        store.insert_user("user-1234", PlanTier::Free, 3, Some(date!(2025 - 06 - 09)));

        let updated = store.increment_user_usage("user-1234").await.unwrap().unwrap();
        assert_eq!(updated.usage_count, 4);

        let reset = store
            .reset_user_usage("user-1234", date!(2025 - 06 - 10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reset.usage_count, 1);
        assert_eq!(reset.last_usage_date, Some(date!(2025 - 06 - 10)));
    }

    #[tokio::test]
    async fn test_increment_missing_user_is_none() {
        let store = MemoryStore::new();
        assert!(store.increment_user_usage("nobody-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_increments() {
        let store = MemoryStore::new();

        let first = store.upsert_anonymous("abc12345").await.unwrap();
        assert_eq!(first.usage_count, 1);

        let second = store.upsert_anonymous("abc12345").await.unwrap();
        assert_eq!(second.usage_count, 2);
    }

    #[tokio::test]
    async fn test_purge_by_last_activity() {
        let store = MemoryStore::new();
        store.insert_anonymous("old00000", 3);

        // Backdate the row past the cutoff.
        {
            let mut inner = store.inner.lock();
            let record = inner.anonymous.get_mut("old00000").unwrap();
            record.updated_at -= 60 * 60 * 24 * 40;
        }
        store.insert_anonymous("fresh000", 1);

        let cutoff = OffsetDateTime::now_utc() - time::Duration::days(30);
        let removed = store.purge_anonymous_before(cutoff).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.anonymous("old00000").is_none());
        assert!(store.anonymous("fresh000").is_some());
    }

    #[tokio::test]
    async fn test_op_count_tracks_accesses() {
        let store = MemoryStore::new();
        assert_eq!(store.op_count(), 0);

        let _ = store.find_user("user-1234").await;
        let _ = store.find_anonymous("abc12345").await;
        assert_eq!(store.op_count(), 2);
    }
}
