//! Data-access trait for usage stores.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::error::StoreError;
use crate::record::{AnonymousUsageRecord, UserUsageRecord};

/// Data-access layer for quota records.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are called
/// concurrently, potentially for the same principal (two browser tabs
/// generating at once). Every mutation must be a single atomic operation at
/// the store — a conditional update, an upsert, or a mutex-guarded write —
/// never a read-modify-write pair, so concurrent commits can never lose an
/// update.
///
/// Entitlement logic (limits, rollover, rejection) lives in
/// [`UsageService`](crate::UsageService), which wraps a `UsageStore`.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Look up a user's usage row. `None` when the user does not exist.
    async fn find_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError>;

    /// Atomically add one to a user's count.
    ///
    /// Returns the updated record, or `None` when no such user exists.
    async fn increment_user_usage(
        &self,
        user_id: &str,
    ) -> Result<Option<UserUsageRecord>, StoreError>;

    /// Atomically set a user's count to one and stamp the given UTC day.
    ///
    /// This is the lazy physical day-rollover: it runs on the first commit of
    /// a new day, not on reads. Returns `None` when no such user exists.
    async fn reset_user_usage(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Option<UserUsageRecord>, StoreError>;

    /// Look up an anonymous usage row. `None` for fingerprints never seen.
    async fn find_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<AnonymousUsageRecord>, StoreError>;

    /// Atomically insert a row with count one, or increment an existing row.
    ///
    /// Race-safe: two concurrent calls for the same fingerprint must net
    /// exactly +2, never a lost update or a duplicate-row error.
    async fn upsert_anonymous(&self, fingerprint: &str)
        -> Result<AnonymousUsageRecord, StoreError>;

    /// Delete anonymous rows idle since before `cutoff` (retention sweep).
    ///
    /// Returns the number of rows removed.
    async fn purge_anonymous_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError>;
}

/// Blanket implementation for `Arc<S>` where `S: UsageStore`.
#[async_trait]
impl<S: UsageStore + ?Sized> UsageStore for Arc<S> {
    #[inline]
    async fn find_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError> {
        (**self).find_user(user_id).await
    }

    #[inline]
    async fn increment_user_usage(
        &self,
        user_id: &str,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        (**self).increment_user_usage(user_id).await
    }

    #[inline]
    async fn reset_user_usage(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        (**self).reset_user_usage(user_id, date).await
    }

    #[inline]
    async fn find_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<AnonymousUsageRecord>, StoreError> {
        (**self).find_anonymous(fingerprint).await
    }

    #[inline]
    async fn upsert_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<AnonymousUsageRecord, StoreError> {
        (**self).upsert_anonymous(fingerprint).await
    }

    #[inline]
    async fn purge_anonymous_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        (**self).purge_anonymous_before(cutoff).await
    }
}
