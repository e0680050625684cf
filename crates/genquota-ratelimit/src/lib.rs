//! Fixed-window rate limiting for the genquota request surface.
//!
//! A coarse pre-filter that bounds request *rate* independently of daily
//! quota, to blunt burst abuse before any store access happens:
//!
//! - [`FixedWindowLimiter`] — per-key fixed-window counter with bounded
//!   memory and periodic cleanup
//! - [`RateLimiters`] — the scoped limiter set (generation per tier, generic
//!   API per IP/user, fingerprint issuance per IP)
//!
//! Windows are fixed, not sliding: bursts at window boundaries are tolerated
//! as a deliberate simplicity/accuracy tradeoff. State is process-local; in
//! a multi-instance deployment the effective limit is multiplicative, which
//! is an accepted approximation.

mod scopes;
mod window;

pub use scopes::{
    ApiScope, GenerationTier, RateLimitSettings, RateLimiters, ScopeConfig, ScopedStats,
};
pub use window::{FixedWindowLimiter, LimiterStats, RateLimitDecision, RateLimitStatus};
