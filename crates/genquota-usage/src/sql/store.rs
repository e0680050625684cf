//! SQL usage store.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use time::{Date, OffsetDateTime};
use tracing::warn;

use genquota_core::dates;
use genquota_core::defaults::SLOW_STORE_OP_MILLIS;
use genquota_core::PlanTier;

use crate::error::StoreError;
use crate::record::{AnonymousUsageRecord, UserUsageRecord};
use crate::traits::UsageStore;

use super::config::SqlStoreConfig;
use super::queries;

/// Database type enum for query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// MySQL/MariaDB database.
    MySQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }
}

/// SQL-backed [`UsageStore`].
///
/// Supports PostgreSQL, MySQL, and SQLite through SQLx. All counter
/// mutations are single atomic statements; see [`queries`].
pub struct SqlStore {
    pool: AnyPool,
    db_type: DatabaseType,
}

impl SqlStore {
    /// Connect to the database and create the store.
    pub async fn connect(config: SqlStoreConfig) -> Result<Self, StoreError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let db_type = DatabaseType::from_url(&config.database_url)
            .ok_or_else(|| StoreError::backend("unsupported database URL scheme"))?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool, db_type })
    }

    /// Create both usage tables if they do not exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let schema = match self.db_type {
            DatabaseType::PostgreSQL => {
                r#"
                CREATE TABLE IF NOT EXISTS quota_users (
                    id SERIAL PRIMARY KEY,
                    user_id VARCHAR(255) NOT NULL UNIQUE,
                    plan VARCHAR(50) NOT NULL DEFAULT 'free',
                    usage_count BIGINT NOT NULL DEFAULT 0,
                    last_usage_date VARCHAR(10),
                    created_at BIGINT NOT NULL DEFAULT 0,
                    updated_at BIGINT NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS anonymous_usage (
                    id SERIAL PRIMARY KEY,
                    fingerprint_hash VARCHAR(64) NOT NULL UNIQUE,
                    usage_count BIGINT NOT NULL DEFAULT 0,
                    created_at BIGINT NOT NULL DEFAULT 0,
                    updated_at BIGINT NOT NULL DEFAULT 0
                );
                "#
            }
            DatabaseType::MySQL => {
                r#"
                CREATE TABLE IF NOT EXISTS quota_users (
                    id INT AUTO_INCREMENT PRIMARY KEY,
                    user_id VARCHAR(255) NOT NULL UNIQUE,
                    plan VARCHAR(50) NOT NULL DEFAULT 'free',
                    usage_count BIGINT NOT NULL DEFAULT 0,
                    last_usage_date VARCHAR(10),
                    created_at BIGINT NOT NULL DEFAULT 0,
                    updated_at BIGINT NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS anonymous_usage (
                    id INT AUTO_INCREMENT PRIMARY KEY,
                    fingerprint_hash VARCHAR(64) NOT NULL UNIQUE,
                    usage_count BIGINT NOT NULL DEFAULT 0,
                    created_at BIGINT NOT NULL DEFAULT 0,
                    updated_at BIGINT NOT NULL DEFAULT 0
                );
                "#
            }
            DatabaseType::SQLite => {
                r#"
                CREATE TABLE IF NOT EXISTS quota_users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE,
                    plan TEXT NOT NULL DEFAULT 'free',
                    usage_count INTEGER NOT NULL DEFAULT 0,
                    last_usage_date TEXT,
                    created_at INTEGER NOT NULL DEFAULT 0,
                    updated_at INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS anonymous_usage (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    fingerprint_hash TEXT NOT NULL UNIQUE,
                    usage_count INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL DEFAULT 0,
                    updated_at INTEGER NOT NULL DEFAULT 0
                );
                "#
            }
        };

        // Execute each statement separately
        for stmt in schema.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Get the connection pool (for admin tooling and tests).
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get database type.
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Get current unix timestamp.
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    fn now_unix() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Record latency for a finished store operation and flag slow ones.
    #[allow(clippy::cast_possible_truncation)]
    fn observe(operation: &'static str, start: Instant) {
        let elapsed = start.elapsed();
        genquota_metrics::record_store_op(operation, elapsed);
        if elapsed > Duration::from_millis(SLOW_STORE_OP_MILLIS) {
            warn!(
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow store operation"
            );
            genquota_metrics::record_slow_store_op(operation);
        }
    }

    /// Parse a user row from AnyRow.
    fn parse_user_row(row: &AnyRow) -> UserUsageRecord {
        let plan: String = row.try_get("plan").unwrap_or_default();
        let last_usage_date: Option<Date> = row
            .try_get::<String, _>("last_usage_date")
            .ok()
            .and_then(|s| dates::parse_date(&s));

        UserUsageRecord {
            user_id: row.try_get("user_id").unwrap_or_default(),
            plan: PlanTier::parse(&plan),
            usage_count: row.try_get("usage_count").unwrap_or(0),
            last_usage_date,
        }
    }

    /// Parse an anonymous row from AnyRow.
    fn parse_anonymous_row(row: &AnyRow) -> AnonymousUsageRecord {
        AnonymousUsageRecord {
            fingerprint: row.try_get("fingerprint_hash").unwrap_or_default(),
            usage_count: row.try_get("usage_count").unwrap_or(0),
            created_at: row.try_get("created_at").unwrap_or(0),
            updated_at: row.try_get("updated_at").unwrap_or(0),
        }
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::FIND_USER_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::FIND_USER_MYSQL,
        };

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::parse_user_row))
    }

    async fn fetch_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<AnonymousUsageRecord>, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::FIND_ANONYMOUS_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::FIND_ANONYMOUS_MYSQL,
        };

        let row = sqlx::query(query)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::parse_anonymous_row))
    }
}

#[async_trait]
impl UsageStore for SqlStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserUsageRecord>, StoreError> {
        let start = Instant::now();
        let result = self.fetch_user(user_id).await;
        Self::observe("find_user", start);
        result
    }

    async fn increment_user_usage(
        &self,
        user_id: &str,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        let start = Instant::now();

        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::INCREMENT_USER_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::INCREMENT_USER_MYSQL,
        };

        let result = sqlx::query(query)
            .bind(Self::now_unix())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let record = if result.rows_affected() == 0 {
            None
        } else {
            self.fetch_user(user_id).await?
        };

        Self::observe("increment_user_usage", start);
        Ok(record)
    }

    async fn reset_user_usage(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Option<UserUsageRecord>, StoreError> {
        let start = Instant::now();

        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::RESET_USER_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::RESET_USER_MYSQL,
        };

        let result = sqlx::query(query)
            .bind(dates::format_date(date))
            .bind(Self::now_unix())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let record = if result.rows_affected() == 0 {
            None
        } else {
            self.fetch_user(user_id).await?
        };

        Self::observe("reset_user_usage", start);
        Ok(record)
    }

    async fn find_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<Option<AnonymousUsageRecord>, StoreError> {
        let start = Instant::now();
        let result = self.fetch_anonymous(fingerprint).await;
        Self::observe("find_anonymous", start);
        result
    }

    async fn upsert_anonymous(
        &self,
        fingerprint: &str,
    ) -> Result<AnonymousUsageRecord, StoreError> {
        let start = Instant::now();
        let now = Self::now_unix();

        match self.db_type {
            DatabaseType::PostgreSQL => {
                sqlx::query(queries::UPSERT_ANONYMOUS_PG)
                    .bind(fingerprint)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;
            }
            DatabaseType::SQLite => {
                sqlx::query(queries::UPSERT_ANONYMOUS_SQLITE)
                    .bind(fingerprint)
                    .bind(now)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;
            }
            DatabaseType::MySQL => {
                sqlx::query(queries::UPSERT_ANONYMOUS_MYSQL)
                    .bind(fingerprint)
                    .bind(now)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;
            }
        }

        let record = self
            .fetch_anonymous(fingerprint)
            .await?
            .ok_or_else(|| StoreError::backend("anonymous row missing after upsert"))?;

        Self::observe("upsert_anonymous", start);
        Ok(record)
    }

    async fn purge_anonymous_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        let start = Instant::now();

        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::PURGE_ANONYMOUS_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::PURGE_ANONYMOUS_MYSQL,
        };

        let result = sqlx::query(query)
            .bind(cutoff.unix_timestamp())
            .execute(&self.pool)
            .await?;

        Self::observe("purge_anonymous_before", start);
        Ok(result.rows_affected())
    }
}

// Debug implementation (don't leak the connection string)
impl std::fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore")
            .field("db_type", &self.db_type)
            .finish_non_exhaustive()
    }
}
