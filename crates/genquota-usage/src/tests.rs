//! End-to-end tests for the usage service over the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use genquota_core::{dates, PlanTier, Principal, RejectionKind, ValidationError};

use crate::error::{StoreError, UsageError};
use crate::memory::MemoryStore;
use crate::record::{AnonymousUsageRecord, UserUsageRecord};
use crate::service::UsageService;
use crate::traits::UsageStore;
use crate::UsageServiceConfig;

fn anon(fingerprint: &str) -> Principal {
    Principal::Anonymous {
        fingerprint: fingerprint.to_string(),
    }
}

fn free_user(user_id: &str) -> Principal {
    Principal::Authenticated {
        user_id: user_id.to_string(),
        plan: PlanTier::Free,
    }
}

fn paid_user(user_id: &str) -> Principal {
    Principal::Authenticated {
        user_id: user_id.to_string(),
        plan: PlanTier::Paid,
    }
}

fn service() -> UsageService<Arc<MemoryStore>> {
    UsageService::new(Arc::new(MemoryStore::new()), &UsageServiceConfig::default())
}

const USER: &str = "550e8400-e29b-41d4-a716-446655440000";

#[tokio::test]
async fn test_anonymous_cap_walkdown() {
    // Five generate+commit cycles, then the sixth check is refused.
    let service = service();
    let principal = anon("abc12345");

    for expected_remaining in [4, 3, 2, 1, 0] {
        let admission = service.check(&principal).await.unwrap();
        assert!(admission.allowed);

        let outcome = service.commit(&principal).await.unwrap();
        assert!(outcome.persisted);
        assert_eq!(outcome.status.remaining, expected_remaining);
    }

    let admission = service.check(&principal).await.unwrap();
    assert!(!admission.allowed);
    let rejection = admission.rejection.unwrap();
    assert_eq!(rejection.kind, RejectionKind::AnonymousLimitExceeded);
    assert!(!rejection.upgrade_required);

    let stored = service.store().anonymous("abc12345").unwrap();
    assert_eq!(stored.usage_count, 5);
}

#[tokio::test]
async fn test_free_user_daily_cap() {
    let service = service();
    let today = dates::utc_today(OffsetDateTime::now_utc());
    service
        .store()
        .insert_user(USER, PlanTier::Free, 0, Some(today));
    let principal = free_user(USER);

    for _ in 0..10 {
        let admission = service.check(&principal).await.unwrap();
        assert!(admission.allowed);
        let outcome = service.commit(&principal).await.unwrap();
        assert!(outcome.persisted);
    }

    let admission = service.check(&principal).await.unwrap();
    assert!(!admission.allowed);
    let rejection = admission.rejection.unwrap();
    assert_eq!(rejection.kind, RejectionKind::DailyLimitExceeded);
    assert!(rejection.upgrade_required);
    assert!(rejection.reset_at.is_some());
}

#[tokio::test]
async fn test_invalid_fingerprint_never_reaches_store() {
    let service = service();

    let result = service.check(&anon("not-hex!")).await;
    assert!(matches!(
        result,
        Err(UsageError::Validation(ValidationError::BadFingerprint))
    ));
    assert_eq!(service.store().op_count(), 0);

    let result = service.commit(&anon("not-hex!")).await;
    assert!(matches!(result, Err(UsageError::Validation(_))));
    assert_eq!(service.store().op_count(), 0);
}

#[tokio::test]
async fn test_missing_user_is_auth_error() {
    let service = service();
    let result = service.check(&free_user(USER)).await;
    assert!(matches!(result, Err(UsageError::Authentication)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_commits_count_exactly_once_each() {
    // N concurrent commits against one fresh fingerprint must store exactly N.
    let service = Arc::new(service());
    let n = 50;

    let mut handles = Vec::with_capacity(n);
    for _ in 0..n {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.commit(&anon("abc12345")).await.unwrap()
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.persisted);
    }

    let stored = service.store().anonymous("abc12345").unwrap();
    assert_eq!(stored.usage_count, n as i64);
}

#[tokio::test]
async fn test_rollover_visible_on_read_before_commit() {
    // At the cap yesterday: today's check sees the full budget again.
    let service = service();
    let now = OffsetDateTime::now_utc();
    let yesterday = dates::utc_today(now).previous_day().unwrap();
    service
        .store()
        .insert_user(USER, PlanTier::Free, 10, Some(yesterday));

    let admission = service.check(&free_user(USER)).await.unwrap();
    assert!(admission.allowed);
    assert_eq!(admission.status.remaining, 10);
}

#[tokio::test]
async fn test_rollover_commit_resets_to_one() {
    let service = service();
    let now = OffsetDateTime::now_utc();
    let yesterday = dates::utc_today(now).previous_day().unwrap();
    service
        .store()
        .insert_user(USER, PlanTier::Free, 10, Some(yesterday));

    let outcome = service.commit(&free_user(USER)).await.unwrap();
    assert!(outcome.persisted);

    let stored = service.store().user(USER).unwrap();
    assert_eq!(stored.usage_count, 1);
    assert_eq!(stored.last_usage_date, Some(dates::utc_today(now)));
}

#[tokio::test]
async fn test_paid_short_circuits_any_stored_count() {
    let service = service();
    service
        .store()
        .insert_user(USER, PlanTier::Paid, 999_999_999, None);

    let admission = service.check(&paid_user(USER)).await.unwrap();
    assert!(admission.allowed);
    assert!(admission.status.unlimited);
    assert_eq!(service.store().op_count(), 0); // no record lookup needed

    let outcome = service.commit(&paid_user(USER)).await.unwrap();
    assert!(outcome.status.unlimited);
    assert_eq!(service.store().user(USER).unwrap().usage_count, 999_999_999);
}

#[tokio::test]
async fn test_stored_paid_plan_overrides_session_claim() {
    // Session says free, the row says paid: the row wins.
    let service = service();
    service.store().insert_user(USER, PlanTier::Paid, 42, None);

    let admission = service.check(&free_user(USER)).await.unwrap();
    assert!(admission.allowed);
    assert!(admission.status.unlimited);

    let outcome = service.commit(&free_user(USER)).await.unwrap();
    assert!(outcome.status.unlimited);
    // No accounting for paid users
    assert_eq!(service.store().user(USER).unwrap().usage_count, 42);
}

#[tokio::test]
async fn test_post_commit_check_never_serves_stale_cache() {
    let service = service();
    let principal = anon("abc12345");

    service.commit(&principal).await.unwrap();
    let before = service.check(&principal).await.unwrap();
    assert_eq!(before.status.remaining, 4);

    // The cache now holds count=1; a commit must invalidate it.
    service.commit(&principal).await.unwrap();
    let after = service.check(&principal).await.unwrap();
    assert_eq!(after.status.remaining, 3);
}

#[tokio::test]
async fn test_repeat_checks_are_served_from_cache() {
    let service = service();
    let principal = anon("abc12345");

    service.commit(&principal).await.unwrap();
    service.check(&principal).await.unwrap();
    let ops_after_first = service.store().op_count();

    service.check(&principal).await.unwrap();
    service.check(&principal).await.unwrap();
    assert_eq!(service.store().op_count(), ops_after_first);

    let stats = service.cache_stats().unwrap();
    assert!(stats.hits >= 2);
}

#[tokio::test]
async fn test_current_status_bypasses_cache() {
    let service = service();
    let principal = anon("abc12345");

    service.commit(&principal).await.unwrap();
    service.check(&principal).await.unwrap(); // populate cache
    let ops_before = service.store().op_count();

    let status = service.current_status(&principal).await.unwrap();
    assert_eq!(status.remaining, 4);
    assert!(service.store().op_count() > ops_before);
}

// ── Store failure degradation ───────────────────────────────────

/// Wrapper that fails configured operations, for degradation tests.
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            Err(StoreError::backend("injected read failure"))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            Err(StoreError::backend("injected write failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsageStore for FlakyStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError> {
        self.check_read()?;
        self.inner.find_user(user_id).await
    }

    async fn increment_user_usage(
        &self,
        user_id: &str,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        self.check_write()?;
        self.inner.increment_user_usage(user_id).await
    }

    async fn reset_user_usage(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        self.check_write()?;
        self.inner.reset_user_usage(user_id, date).await
    }

    async fn find_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<AnonymousUsageRecord>, StoreError> {
        self.check_read()?;
        self.inner.find_anonymous(fingerprint).await
    }

    async fn upsert_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<AnonymousUsageRecord, StoreError> {
        self.check_write()?;
        self.inner.upsert_anonymous(fingerprint).await
    }

    async fn purge_anonymous_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        self.check_write()?;
        self.inner.purge_anonymous_before(cutoff).await
    }
}

#[tokio::test]
async fn test_admission_fails_closed_on_store_error() {
    let store = FlakyStore::new();
    store.fail_reads.store(true, Ordering::Relaxed);
    let service = UsageService::new(store, &UsageServiceConfig::default());

    let admission = service.check(&anon("abc12345")).await.unwrap();
    assert!(!admission.allowed);
    let rejection = admission.rejection.unwrap();
    assert_eq!(rejection.kind, RejectionKind::StoreUnavailable);
    assert!(rejection.retryable);
}

#[tokio::test]
async fn test_commit_write_failure_returns_without_raising() {
    let store = FlakyStore::new();
    let today = dates::utc_today(OffsetDateTime::now_utc());
    store.inner.insert_user(USER, PlanTier::Free, 3, Some(today));
    let service = UsageService::new(store, &UsageServiceConfig::default());
    let principal = free_user(USER);

    // Populate the cache with the pre-write record.
    service.check(&principal).await.unwrap();
    let cache_size = service.cache_stats().unwrap().size;

    service.store().fail_writes.store(true, Ordering::Relaxed);
    let outcome = service.commit(&principal).await.unwrap();
    assert!(!outcome.persisted);

    // The cache was not touched and the count was not guessed upward.
    assert_eq!(service.cache_stats().unwrap().size, cache_size);
    assert_eq!(service.store().inner.user(USER).unwrap().usage_count, 3);

    // Once the store recovers, accounting resumes from the true count.
    service.store().fail_writes.store(false, Ordering::Relaxed);
    let outcome = service.commit(&principal).await.unwrap();
    assert!(outcome.persisted);
    assert_eq!(service.store().inner.user(USER).unwrap().usage_count, 4);
}

#[tokio::test]
async fn test_purge_through_service() {
    let service = service();
    service.store().insert_anonymous("fresh000", 2);

    // Nothing is old enough to purge.
    let removed = service.purge_anonymous(30).await.unwrap();
    assert_eq!(removed, 0);
    assert!(service.store().anonymous("fresh000").is_some());
}
