//! Usage accounting error types.

use genquota_core::ValidationError;

/// Durable-store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend error (database, connectivity, timeout).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(feature = "sql")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Errors surfaced by the usage service.
///
/// Quota exhaustion is not an error; it is a typed rejection inside
/// [`Admission`](crate::Admission). Store failures on the admission path are
/// converted to a conservative deny, and on the commit path they are logged
/// and swallowed — this enum only covers the paths that cannot degrade.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// Malformed input; rejected before any store access.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authenticated principal without a backing user record.
    #[error("user record not found")]
    Authentication,

    /// Store failure on a maintenance path with no graceful degradation.
    #[error("store: {0}")]
    Store(#[from] StoreError),
}
