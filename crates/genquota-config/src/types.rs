//! Configuration type definitions for database, limits, cache, rate
//! limiting, metrics, and logging.

use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use genquota_core::defaults;
use genquota_ratelimit::{RateLimitSettings, ScopeConfig};
use genquota_usage::{UsageLimits, UsageServiceConfig};

use crate::defaults::*;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Map the limits and cache sections into the usage-service config.
    pub fn usage_service_config(&self) -> UsageServiceConfig {
        UsageServiceConfig::default()
            .limits(UsageLimits {
                anonymous: self.limits.anonymous,
                free_daily: self.limits.free_daily,
            })
            .cache_enabled(self.cache.enabled)
            .user_cache_ttl(Duration::from_secs(self.cache.user_ttl_secs))
            .anonymous_cache_ttl(Duration::from_secs(self.cache.anonymous_ttl_secs))
            .cache_max_entries(self.cache.max_entries)
    }

    /// Map the rate-limit section into limiter settings.
    pub fn rate_limit_settings(&self) -> RateLimitSettings {
        RateLimitSettings {
            generation_anonymous: self.rate_limit.generation_anonymous.to_scope(),
            generation_free: self.rate_limit.generation_free.to_scope(),
            generation_paid: self.rate_limit.generation_paid.to_scope(),
            api_per_ip: self.rate_limit.api_per_ip.to_scope(),
            api_per_user: self.rate_limit.api_per_user.to_scope(),
            fingerprint_per_ip: self.rate_limit.fingerprint_per_ip.to_scope(),
            cleanup_interval: Duration::from_secs(self.rate_limit.cleanup_interval_secs),
            max_entries: self.rate_limit.max_entries,
        }
    }
}

/// Durable store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (postgres://, mysql://, sqlite:).
    pub url: String,
    #[serde(default = "default_sql_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_sql_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_sql_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Quota ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Lifetime cap per anonymous fingerprint.
    #[serde(default = "default_anonymous_limit")]
    pub anonymous: i64,
    /// Daily cap per authenticated free user.
    #[serde(default = "default_free_daily_limit")]
    pub free_daily: i64,
    /// Retention for anonymous records, in days since last activity.
    #[serde(default = "default_anonymous_retention_days")]
    pub anonymous_retention_days: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            anonymous: default_anonymous_limit(),
            free_daily: default_free_daily_limit(),
            anonymous_retention_days: default_anonymous_retention_days(),
        }
    }
}

/// Read-through usage cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// TTL for authenticated usage records in seconds.
    #[serde(default = "default_user_cache_ttl_secs")]
    pub user_ttl_secs: u64,
    /// TTL for anonymous usage records in seconds.
    #[serde(default = "default_anonymous_cache_ttl_secs")]
    pub anonymous_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            user_ttl_secs: default_user_cache_ttl_secs(),
            anonymous_ttl_secs: default_anonymous_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

/// A `(limit, window_secs)` pair for one rate-limit scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScopeLimitConfig {
    pub limit: u32,
    pub window_secs: u64,
}

impl ScopeLimitConfig {
    const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }

    fn to_scope(self) -> ScopeConfig {
        ScopeConfig::new(self.limit, Duration::from_secs(self.window_secs))
    }
}

/// Fixed-window rate limiter settings per scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_generation_anonymous")]
    pub generation_anonymous: ScopeLimitConfig,
    #[serde(default = "default_generation_free")]
    pub generation_free: ScopeLimitConfig,
    #[serde(default = "default_generation_paid")]
    pub generation_paid: ScopeLimitConfig,
    #[serde(default = "default_api_per_ip")]
    pub api_per_ip: ScopeLimitConfig,
    #[serde(default = "default_api_per_user")]
    pub api_per_user: ScopeLimitConfig,
    #[serde(default = "default_fingerprint_per_ip")]
    pub fingerprint_per_ip: ScopeLimitConfig,
    /// Interval for the background expired-entry sweep, in seconds.
    #[serde(default = "default_rl_cleanup_secs")]
    pub cleanup_interval_secs: u64,
    /// Per-limiter key ceiling.
    #[serde(default = "default_rl_max_entries")]
    pub max_entries: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            generation_anonymous: default_generation_anonymous(),
            generation_free: default_generation_free(),
            generation_paid: default_generation_paid(),
            api_per_ip: default_api_per_ip(),
            api_per_user: default_api_per_user(),
            fingerprint_per_ip: default_fingerprint_per_ip(),
            cleanup_interval_secs: default_rl_cleanup_secs(),
            max_entries: default_rl_max_entries(),
        }
    }
}

fn default_generation_anonymous() -> ScopeLimitConfig {
    ScopeLimitConfig::new(
        defaults::DEFAULT_RL_GENERATION_ANONYMOUS,
        defaults::DEFAULT_RL_GENERATION_ANONYMOUS_WINDOW_SECS,
    )
}

fn default_generation_free() -> ScopeLimitConfig {
    ScopeLimitConfig::new(
        defaults::DEFAULT_RL_GENERATION_FREE,
        defaults::DEFAULT_RL_GENERATION_FREE_WINDOW_SECS,
    )
}

fn default_generation_paid() -> ScopeLimitConfig {
    ScopeLimitConfig::new(
        defaults::DEFAULT_RL_GENERATION_PAID,
        defaults::DEFAULT_RL_GENERATION_PAID_WINDOW_SECS,
    )
}

fn default_api_per_ip() -> ScopeLimitConfig {
    ScopeLimitConfig::new(
        defaults::DEFAULT_RL_API_PER_IP,
        defaults::DEFAULT_RL_API_PER_IP_WINDOW_SECS,
    )
}

fn default_api_per_user() -> ScopeLimitConfig {
    ScopeLimitConfig::new(
        defaults::DEFAULT_RL_API_PER_USER,
        defaults::DEFAULT_RL_API_PER_USER_WINDOW_SECS,
    )
}

fn default_fingerprint_per_ip() -> ScopeLimitConfig {
    ScopeLimitConfig::new(
        defaults::DEFAULT_RL_FINGERPRINT_PER_IP,
        defaults::DEFAULT_RL_FINGERPRINT_PER_IP_WINDOW_SECS,
    )
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    pub listen: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// CLI overrides applied on top of the file configuration.
#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override database connection URL
    #[arg(long)]
    pub database_url: Option<String>,
    /// Override anonymous lifetime cap
    #[arg(long)]
    pub anonymous_limit: Option<i64>,
    /// Override free-user daily cap
    #[arg(long)]
    pub free_daily_limit: Option<i64>,
    /// Disable the usage cache
    #[arg(long)]
    pub no_cache: bool,
    /// Override metrics listen address
    #[arg(long)]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Apply CLI overrides to a loaded configuration.
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.database_url {
        config.database.url = v.clone();
    }
    if let Some(v) = overrides.anonymous_limit {
        config.limits.anonymous = v;
    }
    if let Some(v) = overrides.free_daily_limit {
        config.limits.free_daily = v;
    }
    if overrides.no_cache {
        config.cache.enabled = false;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
