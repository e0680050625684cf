//! SQL queries for different databases.
//!
//! Every mutation here is a single atomic statement — the increment and the
//! upsert happen inside the database, never as a read-modify-write pair in
//! application code.

/// Query to find a user's usage row (PostgreSQL).
pub const FIND_USER_PG: &str = r#"
SELECT user_id, plan, usage_count, last_usage_date
FROM quota_users
WHERE user_id = $1
"#;

/// Query to find a user's usage row (MySQL/SQLite).
pub const FIND_USER_MYSQL: &str = r#"
SELECT user_id, plan, usage_count, last_usage_date
FROM quota_users
WHERE user_id = ?
"#;

/// Atomic increment of a user's usage count (PostgreSQL).
pub const INCREMENT_USER_PG: &str = r#"
UPDATE quota_users
SET usage_count = usage_count + 1, updated_at = $1
WHERE user_id = $2
"#;

/// Atomic increment of a user's usage count (MySQL/SQLite).
pub const INCREMENT_USER_MYSQL: &str = r#"
UPDATE quota_users
SET usage_count = usage_count + 1, updated_at = ?
WHERE user_id = ?
"#;

/// Atomic day-rollover reset to one (PostgreSQL).
pub const RESET_USER_PG: &str = r#"
UPDATE quota_users
SET usage_count = 1, last_usage_date = $1, updated_at = $2
WHERE user_id = $3
"#;

/// Atomic day-rollover reset to one (MySQL/SQLite).
pub const RESET_USER_MYSQL: &str = r#"
UPDATE quota_users
SET usage_count = 1, last_usage_date = ?, updated_at = ?
WHERE user_id = ?
"#;

/// Query to find an anonymous usage row (PostgreSQL).
pub const FIND_ANONYMOUS_PG: &str = r#"
SELECT fingerprint_hash, usage_count, created_at, updated_at
FROM anonymous_usage
WHERE fingerprint_hash = $1
"#;

/// Query to find an anonymous usage row (MySQL/SQLite).
pub const FIND_ANONYMOUS_MYSQL: &str = r#"
SELECT fingerprint_hash, usage_count, created_at, updated_at
FROM anonymous_usage
WHERE fingerprint_hash = ?
"#;

/// Race-safe insert-or-increment for anonymous usage (PostgreSQL).
pub const UPSERT_ANONYMOUS_PG: &str = r#"
INSERT INTO anonymous_usage (fingerprint_hash, usage_count, created_at, updated_at)
VALUES ($1, 1, $2, $2)
ON CONFLICT (fingerprint_hash)
DO UPDATE SET usage_count = anonymous_usage.usage_count + 1, updated_at = EXCLUDED.updated_at
"#;

/// Race-safe insert-or-increment for anonymous usage (SQLite).
pub const UPSERT_ANONYMOUS_SQLITE: &str = r#"
INSERT INTO anonymous_usage (fingerprint_hash, usage_count, created_at, updated_at)
VALUES (?, 1, ?, ?)
ON CONFLICT (fingerprint_hash)
DO UPDATE SET usage_count = usage_count + 1, updated_at = excluded.updated_at
"#;

/// Race-safe insert-or-increment for anonymous usage (MySQL).
pub const UPSERT_ANONYMOUS_MYSQL: &str = r#"
INSERT INTO anonymous_usage (fingerprint_hash, usage_count, created_at, updated_at)
VALUES (?, 1, ?, ?)
ON DUPLICATE KEY UPDATE usage_count = usage_count + 1, updated_at = VALUES(updated_at)
"#;

/// Retention sweep by last activity (PostgreSQL).
pub const PURGE_ANONYMOUS_PG: &str = r#"
DELETE FROM anonymous_usage
WHERE updated_at < $1
"#;

/// Retention sweep by last activity (MySQL/SQLite).
pub const PURGE_ANONYMOUS_MYSQL: &str = r#"
DELETE FROM anonymous_usage
WHERE updated_at < ?
"#;
