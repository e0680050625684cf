//! Principals and plan tiers.

use serde::{Deserialize, Serialize};

use crate::validate::{self, ValidationError};

/// Subscription tier of an authenticated user.
///
/// Parsing is fail-safe: unrecognized plan strings become [`PlanTier::Free`],
/// never unlimited access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Free tier with a daily generation cap.
    #[default]
    Free,
    /// Paid tier with unlimited generations.
    Paid,
}

impl PlanTier {
    /// Parse a stored plan string, defaulting unknown values to `Free`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Self::Paid,
            _ => Self::Free,
        }
    }

    /// Stable string form for storage and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of principal is consuming quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// Signed-in user with a stable identifier.
    Authenticated,
    /// Device fingerprint without an account.
    Anonymous,
}

impl PrincipalKind {
    /// Stable string form for logging and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Raw request inputs consumed by [`Principal::resolve`].
///
/// Produced by the surrounding HTTP/session layer; all fields are untrusted.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated user id from the session, if any.
    pub user_id: Option<String>,
    /// Plan claim from the session, if any. Refreshed from the store at the
    /// admission gate; a stale claim never grants unlimited access.
    pub plan: Option<String>,
    /// Client-supplied device fingerprint for anonymous requests.
    pub fingerprint: Option<String>,
}

/// The entity whose quota is checked and consumed.
///
/// Immutable for the lifetime of one request-handling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Signed-in user.
    Authenticated {
        /// Stable user identifier (UUID-style).
        user_id: String,
        /// Plan tier as claimed by the session.
        plan: PlanTier,
    },
    /// Anonymous visitor tracked by opaque fingerprint.
    Anonymous {
        /// Validated, lowercased hex token (8-64 chars).
        fingerprint: String,
    },
}

impl Principal {
    /// Resolve a principal from raw request inputs.
    ///
    /// Pure: validates shape only. User-row existence is verified at the
    /// admission gate, where a missing row is an integrity fault.
    pub fn resolve(ctx: &RequestContext) -> Result<Self, ValidationError> {
        if let Some(ref raw) = ctx.user_id {
            let user_id = validate::user_id(raw)?;
            let plan = PlanTier::parse(ctx.plan.as_deref().unwrap_or("free"));
            return Ok(Self::Authenticated { user_id, plan });
        }

        let raw = ctx
            .fingerprint
            .as_deref()
            .ok_or(ValidationError::EmptyFingerprint)?;
        let fingerprint = validate::fingerprint(raw)?;
        Ok(Self::Anonymous { fingerprint })
    }

    /// Which kind of principal this is.
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Self::Authenticated { .. } => PrincipalKind::Authenticated,
            Self::Anonymous { .. } => PrincipalKind::Anonymous,
        }
    }
}
