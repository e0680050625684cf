//! Usage accounting for generation requests.
//!
//! This crate decides whether a principal may generate (admission) and
//! records each successful generation exactly once (commit):
//!
//! - [`UsageStore`] — data-access trait with atomic counter operations
//! - [`SqlStore`](sql::SqlStore) / [`MemoryStore`] — durable and in-memory backends
//! - [`UsageCache`] — short-TTL read-through cache, deleted on every write
//! - [`policy`] — pure entitlement evaluation
//! - [`UsageService`] — admission gate and consumption committer
//!
//! # Example
//!
//! ```
//! use genquota_core::Principal;
//! use genquota_usage::{MemoryStore, UsageService, UsageServiceConfig};
//!
//! # async fn example() -> Result<(), genquota_usage::UsageError> {
//! let service = UsageService::new(MemoryStore::new(), &UsageServiceConfig::default());
//!
//! let principal = Principal::Anonymous {
//!     fingerprint: "abc12345".to_string(),
//! };
//!
//! let admission = service.check(&principal).await?;
//! if admission.allowed {
//!     // ... perform the generation, then:
//!     let outcome = service.commit(&principal).await?;
//!     println!("{} remaining", outcome.status.remaining);
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod memory;
pub mod policy;
mod record;
mod service;
mod traits;

#[cfg(feature = "sql")]
pub mod sql;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod tests;

pub use cache::{CacheKey, CacheStats, CachedRecord, UsageCache};
pub use config::UsageServiceConfig;
pub use error::{StoreError, UsageError};
pub use memory::MemoryStore;
pub use policy::UsageLimits;
pub use record::{AnonymousUsageRecord, UsageSnapshot, UserUsageRecord};
pub use service::{Admission, CommitOutcome, UsageService};
pub use traits::UsageStore;

#[cfg(feature = "cli")]
pub use cli::AdminArgs;
