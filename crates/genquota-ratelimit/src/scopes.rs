//! Scoped limiter set for the request surface.
//!
//! Three limiter instances cover the distinct traffic families, each scope
//! with its own `(limit, window)` pair: image generation (per tier), generic
//! API calls (per IP or user), and fingerprint issuance (per IP).

use std::time::Duration;

use genquota_core::defaults::{
    DEFAULT_RL_API_PER_IP, DEFAULT_RL_API_PER_IP_WINDOW_SECS, DEFAULT_RL_API_PER_USER,
    DEFAULT_RL_API_PER_USER_WINDOW_SECS, DEFAULT_RL_CLEANUP_SECS, DEFAULT_RL_FINGERPRINT_PER_IP,
    DEFAULT_RL_FINGERPRINT_PER_IP_WINDOW_SECS, DEFAULT_RL_GENERATION_ANONYMOUS,
    DEFAULT_RL_GENERATION_ANONYMOUS_WINDOW_SECS, DEFAULT_RL_GENERATION_FREE,
    DEFAULT_RL_GENERATION_FREE_WINDOW_SECS, DEFAULT_RL_GENERATION_PAID,
    DEFAULT_RL_GENERATION_PAID_WINDOW_SECS, DEFAULT_RL_MAX_ENTRIES,
};
use genquota_core::{PlanTier, Principal};

use crate::window::{FixedWindowLimiter, LimiterStats, RateLimitDecision};

/// A `(limit, window)` pair for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

impl ScopeConfig {
    /// Create a scope config.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Limits for every scope, plus limiter housekeeping knobs.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Anonymous image generation.
    pub generation_anonymous: ScopeConfig,
    /// Free-user image generation.
    pub generation_free: ScopeConfig,
    /// Paid-user image generation (materially higher ceiling).
    pub generation_paid: ScopeConfig,
    /// Generic API calls per IP.
    pub api_per_ip: ScopeConfig,
    /// Generic API calls per user.
    pub api_per_user: ScopeConfig,
    /// Fingerprint issuance per IP.
    pub fingerprint_per_ip: ScopeConfig,
    /// Interval for the background expired-entry sweep.
    pub cleanup_interval: Duration,
    /// Per-limiter key ceiling.
    pub max_entries: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            generation_anonymous: ScopeConfig::new(
                DEFAULT_RL_GENERATION_ANONYMOUS,
                Duration::from_secs(DEFAULT_RL_GENERATION_ANONYMOUS_WINDOW_SECS),
            ),
            generation_free: ScopeConfig::new(
                DEFAULT_RL_GENERATION_FREE,
                Duration::from_secs(DEFAULT_RL_GENERATION_FREE_WINDOW_SECS),
            ),
            generation_paid: ScopeConfig::new(
                DEFAULT_RL_GENERATION_PAID,
                Duration::from_secs(DEFAULT_RL_GENERATION_PAID_WINDOW_SECS),
            ),
            api_per_ip: ScopeConfig::new(
                DEFAULT_RL_API_PER_IP,
                Duration::from_secs(DEFAULT_RL_API_PER_IP_WINDOW_SECS),
            ),
            api_per_user: ScopeConfig::new(
                DEFAULT_RL_API_PER_USER,
                Duration::from_secs(DEFAULT_RL_API_PER_USER_WINDOW_SECS),
            ),
            fingerprint_per_ip: ScopeConfig::new(
                DEFAULT_RL_FINGERPRINT_PER_IP,
                Duration::from_secs(DEFAULT_RL_FINGERPRINT_PER_IP_WINDOW_SECS),
            ),
            cleanup_interval: Duration::from_secs(DEFAULT_RL_CLEANUP_SECS),
            max_entries: DEFAULT_RL_MAX_ENTRIES,
        }
    }
}

/// Tier used to pick the generation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTier {
    /// Anonymous fingerprint.
    Anonymous,
    /// Authenticated free user.
    Free,
    /// Authenticated paid user.
    Paid,
}

impl GenerationTier {
    /// Tier for the given principal.
    pub fn for_principal(principal: &Principal) -> Self {
        match principal {
            Principal::Anonymous { .. } => Self::Anonymous,
            Principal::Authenticated {
                plan: PlanTier::Free,
                ..
            } => Self::Free,
            Principal::Authenticated {
                plan: PlanTier::Paid,
                ..
            } => Self::Paid,
        }
    }

    fn scope_label(&self) -> &'static str {
        match self {
            Self::Anonymous => "generation_anonymous",
            Self::Free => "generation_free",
            Self::Paid => "generation_paid",
        }
    }
}

/// Which generic-API scope a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiScope {
    /// Keyed by client IP.
    PerIp,
    /// Keyed by user id.
    PerUser,
}

/// The full limiter set, explicitly constructed and injected.
///
/// One limiter instance per traffic family keeps one family's key churn from
/// evicting another's entries.
pub struct RateLimiters {
    generation: FixedWindowLimiter,
    api: FixedWindowLimiter,
    fingerprint: FixedWindowLimiter,
    settings: RateLimitSettings,
}

impl RateLimiters {
    /// Create the limiter set.
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            generation: FixedWindowLimiter::new(settings.max_entries),
            api: FixedWindowLimiter::new(settings.max_entries),
            fingerprint: FixedWindowLimiter::new(settings.max_entries),
            settings,
        }
    }

    /// Start background cleanup for all limiters.
    pub fn start_cleanup_tasks(&self) {
        self.generation
            .start_cleanup_task(self.settings.cleanup_interval);
        self.api.start_cleanup_task(self.settings.cleanup_interval);
        self.fingerprint
            .start_cleanup_task(self.settings.cleanup_interval);
    }

    /// Check an image-generation request.
    pub fn check_generation(&self, key: &str, tier: GenerationTier) -> RateLimitDecision {
        let config = match tier {
            GenerationTier::Anonymous => self.settings.generation_anonymous,
            GenerationTier::Free => self.settings.generation_free,
            GenerationTier::Paid => self.settings.generation_paid,
        };

        let decision = self.generation.check(key, config.limit, config.window);
        if !decision.allowed {
            genquota_metrics::record_rate_limited(tier.scope_label());
        }
        decision
    }

    /// Check a generic API request.
    pub fn check_api(&self, key: &str, scope: ApiScope) -> RateLimitDecision {
        let (config, label) = match scope {
            ApiScope::PerIp => (self.settings.api_per_ip, "api_per_ip"),
            ApiScope::PerUser => (self.settings.api_per_user, "api_per_user"),
        };

        let decision = self.api.check(key, config.limit, config.window);
        if !decision.allowed {
            genquota_metrics::record_rate_limited(label);
        }
        decision
    }

    /// Check a fingerprint-issuance request.
    pub fn check_fingerprint(&self, key: &str) -> RateLimitDecision {
        let config = self.settings.fingerprint_per_ip;

        let decision = self.fingerprint.check(key, config.limit, config.window);
        if !decision.allowed {
            genquota_metrics::record_rate_limited("fingerprint_per_ip");
        }
        decision
    }

    /// Statistics for all limiters.
    pub fn stats(&self) -> ScopedStats {
        ScopedStats {
            generation: self.generation.stats(),
            api: self.api.stats(),
            fingerprint: self.fingerprint.stats(),
        }
    }
}

/// Statistics for the whole limiter set.
#[derive(Debug, Clone)]
pub struct ScopedStats {
    /// Image-generation limiter.
    pub generation: LimiterStats,
    /// Generic API limiter.
    pub api: LimiterStats,
    /// Fingerprint-issuance limiter.
    pub fingerprint: LimiterStats,
}
