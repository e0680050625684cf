//! Pure entitlement evaluation.
//!
//! [`evaluate`] maps (principal, stored usage, limits, now) to an
//! [`EntitlementStatus`]. It is deterministic and side-effect-free: the
//! current time is a parameter, nothing is read or written, so the whole
//! decision table is testable without a store.

use genquota_core::dates;
use genquota_core::defaults::{DEFAULT_ANONYMOUS_LIMIT, DEFAULT_FREE_DAILY_LIMIT};
use genquota_core::{EntitlementStatus, PlanTier, Principal, PrincipalKind};
use time::OffsetDateTime;

use crate::record::UsageSnapshot;

/// Configured quota ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimits {
    /// Lifetime cap per anonymous fingerprint.
    pub anonymous: i64,
    /// Daily cap per authenticated free user.
    pub free_daily: i64,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            anonymous: DEFAULT_ANONYMOUS_LIMIT,
            free_daily: DEFAULT_FREE_DAILY_LIMIT,
        }
    }
}

impl UsageLimits {
    /// The cap that applies to the given principal kind (free tier assumed).
    pub fn for_kind(&self, kind: PrincipalKind) -> i64 {
        match kind {
            PrincipalKind::Authenticated => self.free_daily,
            PrincipalKind::Anonymous => self.anonymous,
        }
    }
}

/// Compute the entitlement status for a principal.
///
/// - Paid principals are unlimited; any stored count is ignored.
/// - Free authenticated principals get a daily window: a count stamped with a
///   day other than `now`'s UTC date is treated as zero. The rollover is
///   visible on read before any physical reset happens.
/// - Anonymous principals have a lifetime cap and no reset time.
/// - An absent record counts as zero consumption.
pub fn evaluate(
    principal: &Principal,
    usage: Option<UsageSnapshot>,
    limits: &UsageLimits,
    now: OffsetDateTime,
) -> EntitlementStatus {
    match principal {
        Principal::Authenticated {
            plan: PlanTier::Paid,
            ..
        } => EntitlementStatus::paid_unlimited(),

        Principal::Authenticated {
            plan: PlanTier::Free,
            ..
        } => {
            let effective = usage
                .filter(|u| !dates::is_new_day(u.last_usage_date, now))
                .map(|u| u.count)
                .unwrap_or(0);
            let remaining = (limits.free_daily - effective).max(0);

            EntitlementStatus {
                kind: PrincipalKind::Authenticated,
                plan: Some(PlanTier::Free),
                remaining,
                limit: limits.free_daily,
                can_use: remaining > 0,
                reset_at: Some(dates::next_day_reset(now)),
                unlimited: false,
            }
        }

        Principal::Anonymous { .. } => {
            let count = usage.map(|u| u.count).unwrap_or(0);
            let remaining = (limits.anonymous - count).max(0);

            EntitlementStatus {
                kind: PrincipalKind::Anonymous,
                plan: None,
                remaining,
                limit: limits.anonymous,
                can_use: remaining > 0,
                reset_at: None,
                unlimited: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2025-06-10 12:00 UTC);

    fn free_user() -> Principal {
        Principal::Authenticated {
            user_id: "550e8400-e29b-41d4-a716-446655440000".into(),
            plan: PlanTier::Free,
        }
    }

    fn paid_user() -> Principal {
        Principal::Authenticated {
            user_id: "550e8400-e29b-41d4-a716-446655440000".into(),
            plan: PlanTier::Paid,
        }
    }

    fn anon() -> Principal {
        Principal::Anonymous {
            fingerprint: "abc12345".into(),
        }
    }

    #[test]
    fn test_paid_ignores_stored_count() {
        let usage = UsageSnapshot {
            count: 999_999_999,
            last_usage_date: Some(date!(2025 - 06 - 10)),
        };
        let status = evaluate(&paid_user(), Some(usage), &UsageLimits::default(), NOW);
        assert!(status.can_use);
        assert!(status.unlimited);
        assert_eq!(status.remaining, -1);
    }

    #[test]
    fn test_free_user_counts_today() {
        let usage = UsageSnapshot {
            count: 3,
            last_usage_date: Some(date!(2025 - 06 - 10)),
        };
        let status = evaluate(&free_user(), Some(usage), &UsageLimits::default(), NOW);
        assert_eq!(status.remaining, 7);
        assert!(status.can_use);
        assert_eq!(status.reset_at, Some(datetime!(2025-06-11 00:00 UTC)));
    }

    #[test]
    fn test_free_user_rollover_visible_on_read() {
        // At the cap, but stamped yesterday: the whole budget is back.
        let usage = UsageSnapshot {
            count: 10,
            last_usage_date: Some(date!(2025 - 06 - 09)),
        };
        let status = evaluate(&free_user(), Some(usage), &UsageLimits::default(), NOW);
        assert_eq!(status.remaining, 10);
        assert!(status.can_use);
    }

    #[test]
    fn test_free_user_at_cap_denied() {
        let usage = UsageSnapshot {
            count: 10,
            last_usage_date: Some(date!(2025 - 06 - 10)),
        };
        let status = evaluate(&free_user(), Some(usage), &UsageLimits::default(), NOW);
        assert_eq!(status.remaining, 0);
        assert!(!status.can_use);
    }

    #[test]
    fn test_free_user_over_cap_clamps_to_zero() {
        let usage = UsageSnapshot {
            count: 15,
            last_usage_date: Some(date!(2025 - 06 - 10)),
        };
        let status = evaluate(&free_user(), Some(usage), &UsageLimits::default(), NOW);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn test_absent_record_means_zero() {
        let status = evaluate(&free_user(), None, &UsageLimits::default(), NOW);
        assert_eq!(status.remaining, 10);

        let status = evaluate(&anon(), None, &UsageLimits::default(), NOW);
        assert_eq!(status.remaining, 5);
    }

    #[test]
    fn test_anonymous_never_resets() {
        let usage = UsageSnapshot {
            count: 5,
            last_usage_date: None,
        };
        let status = evaluate(&anon(), Some(usage), &UsageLimits::default(), NOW);
        assert!(!status.can_use);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.reset_at, None);
    }

    #[test]
    fn test_deterministic() {
        let usage = UsageSnapshot {
            count: 2,
            last_usage_date: Some(date!(2025 - 06 - 10)),
        };
        let a = evaluate(&free_user(), Some(usage), &UsageLimits::default(), NOW);
        let b = evaluate(&free_user(), Some(usage), &UsageLimits::default(), NOW);
        assert_eq!(a, b);
    }
}
