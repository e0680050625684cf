//! Durable usage records and their policy projection.

use genquota_core::PlanTier;
use time::Date;

/// Per-user usage row.
///
/// `usage_count` is only ever mutated by atomic increment-by-one or atomic
/// reset-to-one; `last_usage_date` is the UTC day of the last commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUsageRecord {
    /// Stable user identifier.
    pub user_id: String,
    /// Plan tier stored on the row. Authoritative over session claims.
    pub plan: PlanTier,
    /// Generations committed on `last_usage_date`.
    pub usage_count: i64,
    /// UTC day of the last commit; `None` for users who never generated.
    pub last_usage_date: Option<Date>,
}

/// Per-fingerprint usage row.
///
/// Anonymous quota is a lifetime cap: there is no date field and the count
/// never resets. Rows are only removed by the retention sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousUsageRecord {
    /// Validated, lowercased fingerprint hex token.
    pub fingerprint: String,
    /// Total generations ever committed for this fingerprint.
    pub usage_count: i64,
    /// Row creation time, unix seconds.
    pub created_at: i64,
    /// Last commit time, unix seconds. Drives the retention sweep.
    pub updated_at: i64,
}

/// Normalized usage view consumed by the entitlement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    /// Stored consumption count.
    pub count: i64,
    /// UTC day the count belongs to; `None` for anonymous records.
    pub last_usage_date: Option<Date>,
}

impl From<&UserUsageRecord> for UsageSnapshot {
    fn from(record: &UserUsageRecord) -> Self {
        Self {
            count: record.usage_count,
            last_usage_date: record.last_usage_date,
        }
    }
}

impl From<&AnonymousUsageRecord> for UsageSnapshot {
    fn from(record: &AnonymousUsageRecord) -> Self {
        Self {
            count: record.usage_count,
            last_usage_date: None,
        }
    }
}
