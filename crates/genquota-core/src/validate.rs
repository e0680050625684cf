//! Input validation for untrusted identifiers.
//!
//! Fingerprints and user ids arrive from the client/session layer and are
//! validated here before any store access. Successful validation returns the
//! normalized (trimmed, lowercased) form.

use crate::defaults::{FINGERPRINT_MAX_LEN, FINGERPRINT_MIN_LEN};

/// Validation failure for an untrusted input field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Fingerprint absent or blank.
    #[error("fingerprint must be a non-empty string")]
    EmptyFingerprint,

    /// Fingerprint is not an 8-64 character hex token.
    #[error("invalid fingerprint format")]
    BadFingerprint,

    /// User id absent or blank.
    #[error("user id must be a non-empty string")]
    EmptyUserId,

    /// User id does not look like a UUID-style identifier.
    #[error("invalid user id format")]
    BadUserId,
}

/// Validate a client-supplied device fingerprint.
///
/// Accepts 8-64 hex characters; anything else is rejected. The fingerprint
/// is an opaque token, never raw browser data.
pub fn fingerprint(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFingerprint);
    }
    if trimmed.len() < FINGERPRINT_MIN_LEN
        || trimmed.len() > FINGERPRINT_MAX_LEN
        || !trimmed.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(ValidationError::BadFingerprint);
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Validate a user identifier from the session layer.
///
/// Flexible UUID-style check: 8-36 characters of hex digits and dashes.
pub fn user_id(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUserId);
    }
    if trimmed.len() < 8
        || trimmed.len() > 36
        || !trimmed.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
    {
        return Err(ValidationError::BadUserId);
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_valid() {
        assert_eq!(fingerprint("abc12345").unwrap(), "abc12345");
        assert_eq!(fingerprint("  ABC12345  ").unwrap(), "abc12345");
        assert_eq!(fingerprint(&"a".repeat(64)).unwrap(), "a".repeat(64));
    }

    #[test]
    fn test_fingerprint_invalid() {
        assert_eq!(fingerprint(""), Err(ValidationError::EmptyFingerprint));
        assert_eq!(fingerprint("   "), Err(ValidationError::EmptyFingerprint));
        assert_eq!(fingerprint("not-hex!"), Err(ValidationError::BadFingerprint));
        assert_eq!(fingerprint("abc123"), Err(ValidationError::BadFingerprint)); // too short
        assert_eq!(
            fingerprint(&"a".repeat(65)),
            Err(ValidationError::BadFingerprint)
        );
    }

    #[test]
    fn test_user_id_valid() {
        assert_eq!(
            user_id("550e8400-e29b-41d4-a716-446655440000").unwrap(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(user_id("DEADBEEF").unwrap(), "deadbeef");
    }

    #[test]
    fn test_user_id_invalid() {
        assert_eq!(user_id(""), Err(ValidationError::EmptyUserId));
        assert_eq!(user_id("short"), Err(ValidationError::BadUserId));
        assert_eq!(user_id("user@example.com"), Err(ValidationError::BadUserId));
    }
}
