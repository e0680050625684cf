//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

/// Sentinel for "unlimited" in remaining/limit fields.
pub const UNLIMITED: i64 = -1;

// ============================================================================
// Quota Defaults
// ============================================================================

/// Default lifetime generation cap for anonymous fingerprints.
pub const DEFAULT_ANONYMOUS_LIMIT: i64 = 5;
/// Default daily generation cap for authenticated free users.
pub const DEFAULT_FREE_DAILY_LIMIT: i64 = 10;
/// Default retention for anonymous usage records, in days since last activity.
pub const DEFAULT_ANONYMOUS_RETENTION_DAYS: u32 = 30;

// ============================================================================
// Cache Defaults
// ============================================================================

/// Default cache TTL for authenticated usage records in seconds.
pub const DEFAULT_USER_CACHE_TTL_SECS: u64 = 120;
/// Default cache TTL for anonymous usage records in seconds.
pub const DEFAULT_ANONYMOUS_CACHE_TTL_SECS: u64 = 300;
/// Default maximum number of cached usage records.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

// ============================================================================
// Rate Limit Defaults
// ============================================================================

/// Anonymous image generation: requests per window.
pub const DEFAULT_RL_GENERATION_ANONYMOUS: u32 = 5;
/// Anonymous image generation: window in seconds (1 hour).
pub const DEFAULT_RL_GENERATION_ANONYMOUS_WINDOW_SECS: u64 = 3600;
/// Free-user image generation: requests per window.
pub const DEFAULT_RL_GENERATION_FREE: u32 = 10;
/// Free-user image generation: window in seconds (24 hours).
pub const DEFAULT_RL_GENERATION_FREE_WINDOW_SECS: u64 = 86400;
/// Paid-user image generation: requests per window.
pub const DEFAULT_RL_GENERATION_PAID: u32 = 1000;
/// Paid-user image generation: window in seconds (1 hour).
pub const DEFAULT_RL_GENERATION_PAID_WINDOW_SECS: u64 = 3600;
/// Generic API calls per IP: requests per window.
pub const DEFAULT_RL_API_PER_IP: u32 = 100;
/// Generic API calls per IP: window in seconds.
pub const DEFAULT_RL_API_PER_IP_WINDOW_SECS: u64 = 60;
/// Generic API calls per user: requests per window.
pub const DEFAULT_RL_API_PER_USER: u32 = 200;
/// Generic API calls per user: window in seconds.
pub const DEFAULT_RL_API_PER_USER_WINDOW_SECS: u64 = 60;
/// Fingerprint issuance per IP: requests per window.
pub const DEFAULT_RL_FINGERPRINT_PER_IP: u32 = 10;
/// Fingerprint issuance per IP: window in seconds.
pub const DEFAULT_RL_FINGERPRINT_PER_IP_WINDOW_SECS: u64 = 60;
/// Default rate limiter cleanup interval in seconds.
pub const DEFAULT_RL_CLEANUP_SECS: u64 = 300;
/// Default maximum tracked rate-limit keys per limiter.
pub const DEFAULT_RL_MAX_ENTRIES: usize = 10000;

// ============================================================================
// Store Defaults
// ============================================================================

/// Store operations slower than this are logged and counted.
pub const SLOW_STORE_OP_MILLIS: u64 = 100;
/// Default maximum connections in the SQL pool.
pub const DEFAULT_SQL_MAX_CONNECTIONS: u32 = 10;
/// Default minimum connections in the SQL pool.
pub const DEFAULT_SQL_MIN_CONNECTIONS: u32 = 1;
/// Default SQL connection acquire timeout in seconds.
pub const DEFAULT_SQL_CONNECT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Fingerprint Constants
// ============================================================================

/// Minimum accepted fingerprint length (hex characters).
pub const FINGERPRINT_MIN_LEN: usize = 8;
/// Maximum accepted fingerprint length (hex characters).
pub const FINGERPRINT_MAX_LEN: usize = 64;
