//! Entitlement status and typed rejections.

use serde::Serialize;
use time::OffsetDateTime;

use crate::defaults::UNLIMITED;
use crate::principal::{PlanTier, PrincipalKind};

/// Normalized quota state for a principal at a point in time.
///
/// Derived fresh from the stored record on every check; never persisted.
/// A `remaining`/`limit` of `-1` means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitlementStatus {
    /// Kind of principal this status describes.
    pub kind: PrincipalKind,
    /// Plan tier for authenticated principals.
    pub plan: Option<PlanTier>,
    /// Generations left in the current accounting period (-1 = unlimited).
    pub remaining: i64,
    /// Cap for the accounting period (-1 = unlimited).
    pub limit: i64,
    /// Whether one more generation may proceed.
    pub can_use: bool,
    /// When the daily window rolls over (authenticated free only).
    #[serde(with = "time::serde::rfc3339::option")]
    pub reset_at: Option<OffsetDateTime>,
    /// Whether this principal has no cap at all.
    pub unlimited: bool,
}

impl EntitlementStatus {
    /// Status for a paid principal: always allowed, no accounting.
    pub fn paid_unlimited() -> Self {
        Self {
            kind: PrincipalKind::Authenticated,
            plan: Some(PlanTier::Paid),
            remaining: UNLIMITED,
            limit: UNLIMITED,
            can_use: true,
            reset_at: None,
            unlimited: true,
        }
    }

    /// Conservative deny used when the store cannot be consulted.
    pub fn denied(kind: PrincipalKind, plan: Option<PlanTier>, limit: i64) -> Self {
        Self {
            kind,
            plan,
            remaining: 0,
            limit,
            can_use: false,
            reset_at: None,
            unlimited: false,
        }
    }
}

/// Why an admission check refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Anonymous lifetime cap reached; remedy is signing in.
    AnonymousLimitExceeded,
    /// Free-tier daily cap reached; remedy is waiting or upgrading.
    DailyLimitExceeded,
    /// The store could not be consulted; quota state is unknown.
    StoreUnavailable,
}

impl RejectionKind {
    /// Stable string form for logging and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnonymousLimitExceeded => crate::errors::ERROR_ANONYMOUS_LIMIT,
            Self::DailyLimitExceeded => crate::errors::ERROR_DAILY_LIMIT,
            Self::StoreUnavailable => crate::errors::ERROR_STORE,
        }
    }
}

/// Typed refusal returned by the admission gate.
///
/// Always a value, never an error: quota exhaustion is an expected outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Machine-readable reason.
    pub kind: RejectionKind,
    /// Plain-language guidance for display.
    pub message: String,
    /// Whether the suggested remedy is upgrading (vs. signing in or waiting).
    pub upgrade_required: bool,
    /// Whether retrying the same request can succeed.
    pub retryable: bool,
    /// When the quota resets, if it does.
    #[serde(with = "time::serde::rfc3339::option")]
    pub reset_at: Option<OffsetDateTime>,
}

impl Rejection {
    /// Build the quota-exhausted rejection matching the given status.
    pub fn limit_exceeded(status: &EntitlementStatus) -> Self {
        let (kind, message) = match status.kind {
            PrincipalKind::Anonymous => (
                RejectionKind::AnonymousLimitExceeded,
                format!(
                    "You've reached your limit of {} free generations. Please sign in for more.",
                    status.limit
                ),
            ),
            PrincipalKind::Authenticated => (
                RejectionKind::DailyLimitExceeded,
                format!(
                    "You've reached your daily limit of {} generations. \
                     Resets at midnight UTC or upgrade to Pro for unlimited access.",
                    status.limit
                ),
            ),
        };

        Self {
            kind,
            message,
            upgrade_required: status.kind == PrincipalKind::Authenticated
                && status.plan == Some(PlanTier::Free),
            retryable: false,
            reset_at: status.reset_at,
        }
    }

    /// Conservative deny when the store could not be consulted.
    ///
    /// Distinct from quota exhaustion so callers can render "we couldn't
    /// verify your quota" rather than "you're out of quota".
    pub fn store_unavailable() -> Self {
        Self {
            kind: RejectionKind::StoreUnavailable,
            message: "Could not verify your usage limits. Please try again.".to_string(),
            upgrade_required: false,
            retryable: true,
            reset_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_unlimited_status() {
        let status = EntitlementStatus::paid_unlimited();
        assert!(status.can_use);
        assert!(status.unlimited);
        assert_eq!(status.remaining, UNLIMITED);
        assert_eq!(status.limit, UNLIMITED);
    }

    #[test]
    fn test_anonymous_rejection_suggests_sign_in() {
        let status = EntitlementStatus {
            kind: PrincipalKind::Anonymous,
            plan: None,
            remaining: 0,
            limit: 5,
            can_use: false,
            reset_at: None,
            unlimited: false,
        };
        let rejection = Rejection::limit_exceeded(&status);
        assert_eq!(rejection.kind, RejectionKind::AnonymousLimitExceeded);
        assert!(!rejection.upgrade_required);
        assert!(!rejection.retryable);
        assert!(rejection.message.contains("sign in"));
    }

    #[test]
    fn test_free_rejection_suggests_upgrade() {
        let status = EntitlementStatus {
            kind: PrincipalKind::Authenticated,
            plan: Some(PlanTier::Free),
            remaining: 0,
            limit: 10,
            can_use: false,
            reset_at: None,
            unlimited: false,
        };
        let rejection = Rejection::limit_exceeded(&status);
        assert_eq!(rejection.kind, RejectionKind::DailyLimitExceeded);
        assert!(rejection.upgrade_required);
        assert!(rejection.message.contains("upgrade"));
    }

    #[test]
    fn test_store_unavailable_is_retryable() {
        let rejection = Rejection::store_unavailable();
        assert_eq!(rejection.kind, RejectionKind::StoreUnavailable);
        assert!(rejection.retryable);
        assert!(!rejection.upgrade_required);
    }
}
