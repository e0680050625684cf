//! Error type constants for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// Malformed or missing input (fingerprint, user id).
pub const ERROR_VALIDATION: &str = "validation";
/// Authenticated principal without a backing user record.
pub const ERROR_AUTH: &str = "auth";
/// Durable store read/write failure.
pub const ERROR_STORE: &str = "store";
/// Authenticated-free daily quota exhausted.
pub const ERROR_DAILY_LIMIT: &str = "daily_limit";
/// Anonymous lifetime quota exhausted.
pub const ERROR_ANONYMOUS_LIMIT: &str = "anonymous_limit";
/// Fixed-window rate limit tripped.
pub const ERROR_RATE_LIMIT: &str = "rate_limit";
