//! Configuration validation.

use crate::loader::ConfigError;
use crate::types::{Config, ScopeLimitConfig};

/// URL schemes the SQL store accepts.
fn sql_url_supported(url: &str) -> bool {
    url.starts_with("postgres://")
        || url.starts_with("postgresql://")
        || url.starts_with("mysql://")
        || url.starts_with("mariadb://")
        || url.starts_with("sqlite:")
}

/// Validate a loaded configuration.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.database.url.trim().is_empty() {
        return Err(ConfigError::Validation("database.url is empty".into()));
    }
    if !sql_url_supported(&config.database.url) {
        return Err(ConfigError::Validation(
            "database.url must use a postgres://, mysql://, or sqlite: scheme".into(),
        ));
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be > 0".into(),
        ));
    }
    if config.database.min_connections > config.database.max_connections {
        return Err(ConfigError::Validation(
            "database.min_connections cannot exceed max_connections".into(),
        ));
    }
    if config.limits.anonymous <= 0 {
        return Err(ConfigError::Validation(
            "limits.anonymous must be > 0".into(),
        ));
    }
    if config.limits.free_daily <= 0 {
        return Err(ConfigError::Validation(
            "limits.free_daily must be > 0".into(),
        ));
    }
    if config.limits.anonymous_retention_days == 0 {
        return Err(ConfigError::Validation(
            "limits.anonymous_retention_days must be > 0".into(),
        ));
    }
    if config.cache.enabled {
        if config.cache.user_ttl_secs == 0 || config.cache.anonymous_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "cache TTLs must be > 0 when the cache is enabled".into(),
            ));
        }
        if config.cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "cache.max_entries must be > 0".into(),
            ));
        }
    }

    let scopes: [(&str, ScopeLimitConfig); 6] = [
        ("generation_anonymous", config.rate_limit.generation_anonymous),
        ("generation_free", config.rate_limit.generation_free),
        ("generation_paid", config.rate_limit.generation_paid),
        ("api_per_ip", config.rate_limit.api_per_ip),
        ("api_per_user", config.rate_limit.api_per_user),
        ("fingerprint_per_ip", config.rate_limit.fingerprint_per_ip),
    ];
    for (name, scope) in scopes {
        if scope.limit == 0 {
            return Err(ConfigError::Validation(format!(
                "rate_limit.{}.limit must be > 0",
                name
            )));
        }
        if scope.window_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "rate_limit.{}.window_secs must be > 0",
                name
            )));
        }
    }
    if config.rate_limit.max_entries == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.max_entries must be > 0".into(),
        ));
    }

    Ok(())
}
