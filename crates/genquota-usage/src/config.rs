//! Configuration for [`UsageService`](crate::UsageService).

use std::time::Duration;

use genquota_core::defaults::{
    DEFAULT_ANONYMOUS_CACHE_TTL_SECS, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_USER_CACHE_TTL_SECS,
};

use crate::policy::UsageLimits;

/// Configuration consumed by [`UsageService`](crate::UsageService).
#[derive(Debug, Clone)]
pub struct UsageServiceConfig {
    /// Quota ceilings.
    pub limits: UsageLimits,
    /// Whether to enable the read-through cache.
    pub cache_enabled: bool,
    /// Cache TTL for authenticated usage records.
    pub user_cache_ttl: Duration,
    /// Cache TTL for anonymous usage records.
    pub anonymous_cache_ttl: Duration,
    /// Maximum number of cached records.
    pub cache_max_entries: usize,
}

impl Default for UsageServiceConfig {
    fn default() -> Self {
        Self {
            limits: UsageLimits::default(),
            cache_enabled: true,
            user_cache_ttl: Duration::from_secs(DEFAULT_USER_CACHE_TTL_SECS),
            anonymous_cache_ttl: Duration::from_secs(DEFAULT_ANONYMOUS_CACHE_TTL_SECS),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl UsageServiceConfig {
    /// Builder: set quota ceilings.
    pub fn limits(mut self, limits: UsageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builder: enable or disable the read-through cache.
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Builder: set the authenticated-record cache TTL.
    pub fn user_cache_ttl(mut self, ttl: Duration) -> Self {
        self.user_cache_ttl = ttl;
        self
    }

    /// Builder: set the anonymous-record cache TTL.
    pub fn anonymous_cache_ttl(mut self, ttl: Duration) -> Self {
        self.anonymous_cache_ttl = ttl;
        self
    }

    /// Builder: set the cache capacity ceiling.
    pub fn cache_max_entries(mut self, max: usize) -> Self {
        self.cache_max_entries = max;
        self
    }
}
