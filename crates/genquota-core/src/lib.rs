//! Core types shared across the genquota crates.
//!
//! This crate defines the domain vocabulary of the usage-limit system:
//! principals, plan tiers, entitlement statuses, typed rejections, input
//! validation for untrusted identifiers, and the UTC day math behind daily
//! quota windows. It holds no I/O and no mutable state.

pub mod dates;
pub mod defaults;
pub mod errors;
mod principal;
mod status;
pub mod validate;

pub use principal::{PlanTier, Principal, PrincipalKind, RequestContext};
pub use status::{EntitlementStatus, Rejection, RejectionKind};
pub use validate::ValidationError;
