//! Admission gate and consumption committer.
//!
//! [`UsageService<S>`] wraps any [`UsageStore`] implementation and provides:
//! - [`check`](UsageService::check) — pre-flight admission before any
//!   expensive work, served from cache when fresh
//! - [`commit`](UsageService::commit) — the post-success atomic write,
//!   followed by cache invalidation
//! - [`current_status`](UsageService::current_status) — cache-bypassing read
//!   for display
//!
//! Two concurrent commits for one principal are kept correct solely by the
//! store's atomic operations; the service holds no locks.

use genquota_core::{dates, errors, validate, EntitlementStatus, PlanTier, Principal, Rejection};
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::cache::{CacheKey, CacheStats, CachedRecord, UsageCache};
use crate::config::UsageServiceConfig;
use crate::error::{StoreError, UsageError};
use crate::policy::{self, UsageLimits};
use crate::record::{UserUsageRecord, UsageSnapshot};
use crate::traits::UsageStore;

/// Result of an admission check.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Whether the generation may proceed.
    pub allowed: bool,
    /// Status for display ("3 remaining").
    pub status: EntitlementStatus,
    /// Typed refusal when `allowed` is false.
    pub rejection: Option<Rejection>,
}

impl Admission {
    fn allowed(status: EntitlementStatus) -> Self {
        Self {
            allowed: true,
            status,
            rejection: None,
        }
    }

    fn rejected(status: EntitlementStatus, rejection: Rejection) -> Self {
        Self {
            allowed: false,
            status,
            rejection: Some(rejection),
        }
    }
}

/// Result of a consumption commit.
///
/// `persisted` is false when the durable write failed: the generation still
/// counts as successful for the caller, the usage is under-counted, and the
/// status is a best-effort view of pre-write state.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Post-write entitlement status (best-effort when not persisted).
    pub status: EntitlementStatus,
    /// Whether the consumption was durably recorded.
    pub persisted: bool,
}

/// Quota admission and accounting over a [`UsageStore`].
///
/// The cache and limits are owned by the service instance — construct one
/// per store, inject it where needed, and tests get fresh state for free.
pub struct UsageService<S: UsageStore> {
    store: S,
    cache: Option<UsageCache>,
    limits: UsageLimits,
}

impl<S: UsageStore> UsageService<S> {
    /// Create a new service wrapping the given store.
    pub fn new(store: S, config: &UsageServiceConfig) -> Self {
        let cache = config.cache_enabled.then(|| {
            UsageCache::new(
                config.user_cache_ttl,
                config.anonymous_cache_ttl,
                config.cache_max_entries,
            )
        });

        Self {
            store,
            cache,
            limits: config.limits,
        }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configured quota ceilings.
    pub fn limits(&self) -> &UsageLimits {
        &self.limits
    }

    /// Get cache statistics. Returns `None` if caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Clear all cached usage records.
    pub fn cache_clear(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Pre-flight admission check. Runs before any expensive work.
    ///
    /// Malformed principals fail with [`UsageError::Validation`] before any
    /// store access. Store read failures are converted into a conservative
    /// not-allowed decision with a [`StoreUnavailable`] rejection rather than
    /// an error, so callers can distinguish "out of quota" from "could not
    /// verify".
    ///
    /// [`StoreUnavailable`]: genquota_core::RejectionKind::StoreUnavailable
    pub async fn check(&self, principal: &Principal) -> Result<Admission, UsageError> {
        validate_principal(principal)?;
        let now = OffsetDateTime::now_utc();

        match principal {
            Principal::Authenticated {
                plan: PlanTier::Paid,
                ..
            } => {
                genquota_metrics::record_admission_allowed();
                Ok(Admission::allowed(EntitlementStatus::paid_unlimited()))
            }

            Principal::Authenticated { user_id, .. } => {
                let record = match self.load_user(user_id).await {
                    Ok(Some(record)) => record,
                    Ok(None) => return Err(UsageError::Authentication),
                    Err(e) => return Ok(self.store_unavailable(principal, e)),
                };

                // The stored plan is authoritative: a mid-session upgrade
                // takes effect on the next check.
                if record.plan == PlanTier::Paid {
                    genquota_metrics::record_admission_allowed();
                    return Ok(Admission::allowed(EntitlementStatus::paid_unlimited()));
                }

                let status =
                    policy::evaluate(principal, Some((&record).into()), &self.limits, now);
                Ok(self.admit(status))
            }

            Principal::Anonymous { fingerprint } => {
                let usage = match self.load_anonymous(fingerprint).await {
                    Ok(record) => record.map(|r| UsageSnapshot::from(&r)),
                    Err(e) => return Ok(self.store_unavailable(principal, e)),
                };

                let status = policy::evaluate(principal, usage, &self.limits, now);
                Ok(self.admit(status))
            }
        }
    }

    /// Record one unit of consumption after a generation succeeded.
    ///
    /// Must never be called before the generation, nor when it failed or was
    /// aborted — admission granted but not consumed is the intended outcome
    /// on those paths. The write is a single atomic store operation; a fresh
    /// store read (never the cache) decides between day-rollover reset and
    /// plain increment. On success the cache entry for the principal is
    /// deleted before returning.
    ///
    /// Store failures are logged and swallowed (`persisted = false`): the
    /// user already received their result, and under-counting is the
    /// accepted degradation. The cache is left untouched on failure.
    pub async fn commit(&self, principal: &Principal) -> Result<CommitOutcome, UsageError> {
        validate_principal(principal)?;
        let now = OffsetDateTime::now_utc();

        match principal {
            Principal::Authenticated {
                plan: PlanTier::Paid,
                ..
            } => Ok(CommitOutcome {
                status: EntitlementStatus::paid_unlimited(),
                persisted: true,
            }),

            Principal::Authenticated { user_id, .. } => {
                let record = match self.store.find_user(user_id).await {
                    Ok(Some(record)) => record,
                    Ok(None) => return Err(UsageError::Authentication),
                    Err(e) => {
                        return Ok(self.commit_failed(principal, None, e, now));
                    }
                };

                if record.plan == PlanTier::Paid {
                    return Ok(CommitOutcome {
                        status: EntitlementStatus::paid_unlimited(),
                        persisted: true,
                    });
                }

                let write = if dates::is_new_day(record.last_usage_date, now) {
                    self.store
                        .reset_user_usage(user_id, dates::utc_today(now))
                        .await
                } else {
                    self.store.increment_user_usage(user_id).await
                };

                match write {
                    Ok(Some(updated)) => {
                        self.invalidate(&CacheKey::User(user_id.clone()));
                        genquota_metrics::record_commit();
                        Ok(CommitOutcome {
                            status: policy::evaluate(
                                principal,
                                Some((&updated).into()),
                                &self.limits,
                                now,
                            ),
                            persisted: true,
                        })
                    }
                    Ok(None) => {
                        // Row vanished between read and write.
                        warn!(user_id = %user_id, "user row disappeared during commit");
                        genquota_metrics::record_commit_failure();
                        Ok(CommitOutcome {
                            status: policy::evaluate(
                                principal,
                                Some((&record).into()),
                                &self.limits,
                                now,
                            ),
                            persisted: false,
                        })
                    }
                    Err(e) => Ok(self.commit_failed(principal, Some(&record), e, now)),
                }
            }

            Principal::Anonymous { fingerprint } => {
                match self.store.upsert_anonymous(fingerprint).await {
                    Ok(updated) => {
                        self.invalidate(&CacheKey::Anonymous(fingerprint.clone()));
                        genquota_metrics::record_commit();
                        Ok(CommitOutcome {
                            status: policy::evaluate(
                                principal,
                                Some((&updated).into()),
                                &self.limits,
                                now,
                            ),
                            persisted: true,
                        })
                    }
                    Err(e) => Ok(self.commit_failed(principal, None, e, now)),
                }
            }
        }
    }

    /// Current status for display, bypassing the cache.
    ///
    /// Store failures yield a safe `can_use = false` default instead of an
    /// error; this read backs a status endpoint, not an admission decision.
    pub async fn current_status(
        &self,
        principal: &Principal,
    ) -> Result<EntitlementStatus, UsageError> {
        validate_principal(principal)?;
        let now = OffsetDateTime::now_utc();

        match principal {
            Principal::Authenticated {
                plan: PlanTier::Paid,
                ..
            } => Ok(EntitlementStatus::paid_unlimited()),

            Principal::Authenticated { user_id, .. } => {
                match self.store.find_user(user_id).await {
                    Ok(Some(record)) if record.plan == PlanTier::Paid => {
                        Ok(EntitlementStatus::paid_unlimited())
                    }
                    Ok(Some(record)) => Ok(policy::evaluate(
                        principal,
                        Some((&record).into()),
                        &self.limits,
                        now,
                    )),
                    Ok(None) => Err(UsageError::Authentication),
                    Err(e) => {
                        warn!(error = %e, "status read failed, returning safe default");
                        Ok(self.denied_status(principal))
                    }
                }
            }

            Principal::Anonymous { fingerprint } => {
                match self.store.find_anonymous(fingerprint).await {
                    Ok(record) => Ok(policy::evaluate(
                        principal,
                        record.as_ref().map(UsageSnapshot::from),
                        &self.limits,
                        now,
                    )),
                    Err(e) => {
                        warn!(error = %e, "status read failed, returning safe default");
                        Ok(self.denied_status(principal))
                    }
                }
            }
        }
    }

    /// Retention sweep: delete anonymous records idle for `retention_days`.
    pub async fn purge_anonymous(&self, retention_days: u32) -> Result<u64, UsageError> {
        let cutoff = OffsetDateTime::now_utc() - time::Duration::days(i64::from(retention_days));
        let removed = self.store.purge_anonymous_before(cutoff).await?;
        debug!(removed, retention_days, "anonymous usage records purged");
        Ok(removed)
    }

    // ── Internals ───────────────────────────────────────────────

    /// Cache-first user read; populates the cache on a store hit.
    async fn load_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError> {
        let key = CacheKey::User(user_id.to_string());
        if let Some(ref cache) = self.cache {
            if let Some(CachedRecord::User(record)) = cache.get(&key) {
                genquota_metrics::record_cache_hit();
                return Ok(Some(record));
            }
            genquota_metrics::record_cache_miss();
        }

        let record = self.store.find_user(user_id).await?;
        if let (Some(ref cache), Some(ref record)) = (&self.cache, &record) {
            cache.insert(key, CachedRecord::User(record.clone()));
        }
        Ok(record)
    }

    /// Cache-first anonymous read; absent rows are not cached.
    async fn load_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<crate::record::AnonymousUsageRecord>, StoreError> {
        let key = CacheKey::Anonymous(fingerprint.to_string());
        if let Some(ref cache) = self.cache {
            if let Some(CachedRecord::Anonymous(record)) = cache.get(&key) {
                genquota_metrics::record_cache_hit();
                return Ok(Some(record));
            }
            genquota_metrics::record_cache_miss();
        }

        let record = self.store.find_anonymous(fingerprint).await?;
        if let (Some(ref cache), Some(ref record)) = (&self.cache, &record) {
            cache.insert(key, CachedRecord::Anonymous(record.clone()));
        }
        Ok(record)
    }

    fn invalidate(&self, key: &CacheKey) {
        if let Some(ref cache) = self.cache {
            cache.remove(key);
            debug!(key = %key, "usage cache entry invalidated");
        }
    }

    /// Turn a policy status into an admission, recording metrics.
    fn admit(&self, status: EntitlementStatus) -> Admission {
        if status.can_use {
            genquota_metrics::record_admission_allowed();
            Admission::allowed(status)
        } else {
            let rejection = Rejection::limit_exceeded(&status);
            genquota_metrics::record_admission_rejected(rejection.kind.as_str());
            Admission::rejected(status, rejection)
        }
    }

    /// Conservative deny when the store cannot be consulted: fails closed,
    /// distinct from quota exhaustion.
    fn store_unavailable(&self, principal: &Principal, err: StoreError) -> Admission {
        warn!(error = %err, kind = principal.kind().as_str(), "admission check failed closed");
        genquota_metrics::record_admission_rejected(errors::ERROR_STORE);
        Admission::rejected(self.denied_status(principal), Rejection::store_unavailable())
    }

    fn commit_failed(
        &self,
        principal: &Principal,
        pre_write: Option<&UserUsageRecord>,
        err: StoreError,
        now: OffsetDateTime,
    ) -> CommitOutcome {
        error!(
            error = %err,
            kind = principal.kind().as_str(),
            "usage commit write failed; generation kept, usage under-counted"
        );
        genquota_metrics::record_commit_failure();

        CommitOutcome {
            status: policy::evaluate(
                principal,
                pre_write.map(UsageSnapshot::from),
                &self.limits,
                now,
            ),
            persisted: false,
        }
    }

    fn denied_status(&self, principal: &Principal) -> EntitlementStatus {
        let kind = principal.kind();
        let plan = match principal {
            Principal::Authenticated { plan, .. } => Some(*plan),
            Principal::Anonymous { .. } => None,
        };
        EntitlementStatus::denied(kind, plan, self.limits.for_kind(kind))
    }
}

impl<S: UsageStore + std::fmt::Debug> std::fmt::Debug for UsageService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageService")
            .field("store", &self.store)
            .field("limits", &self.limits)
            .field("cache_enabled", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// Re-validate principal shape at the gate boundary.
///
/// Principals normally arrive through [`Principal::resolve`], but the gate
/// never trusts that: a malformed fingerprint must be rejected here, before
/// any store access.
fn validate_principal(principal: &Principal) -> Result<(), UsageError> {
    match principal {
        Principal::Authenticated { user_id, .. } => {
            validate::user_id(user_id)?;
        }
        Principal::Anonymous { fingerprint } => {
            validate::fingerprint(fingerprint)?;
        }
    }
    Ok(())
}
