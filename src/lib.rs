//! # genquota
//!
//! Usage-limit and entitlement accounting for generation services.
//!
//! Given a request from an authenticated user or an anonymous device
//! fingerprint, this workspace decides whether the generation may proceed,
//! how much quota remains, and — after the generation concretely succeeds —
//! records exactly one unit of consumption, atomically, under concurrency.
//!
//! ## Crates
//!
//! - [`genquota_core`] - Principals, plan tiers, entitlement statuses, day math
//! - [`genquota_usage`] - Quota stores, read-through cache, admission/commit service
//! - [`genquota_ratelimit`] - Fixed-window rate limiting per scope
//! - [`genquota_config`] - Configuration loading and validation
//! - [`genquota_metrics`] - Prometheus-compatible metrics
//!
//! ## Flow
//!
//! The surrounding request layer calls, in order: the rate limiter (cheap
//! pre-filter), [`UsageService::check`](genquota_usage::UsageService::check)
//! (admission), the remote generation, and — only on success —
//! [`UsageService::commit`](genquota_usage::UsageService::commit).

pub use genquota_config as config;
pub use genquota_core as core;
pub use genquota_metrics as metrics;
pub use genquota_ratelimit as ratelimit;
pub use genquota_usage as usage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use genquota_config::{apply_overrides, load_config, validate_config, Config};
    pub use genquota_core::{
        EntitlementStatus, PlanTier, Principal, PrincipalKind, Rejection, RejectionKind,
        RequestContext,
    };
    pub use genquota_ratelimit::{GenerationTier, RateLimiters};
    pub use genquota_usage::{
        Admission, CommitOutcome, MemoryStore, UsageService, UsageServiceConfig, UsageStore,
    };
}
