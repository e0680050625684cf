//! Configuration loading and validation.
//!
//! File configuration (JSON/YAML/TOML) for the quota system, with serde
//! defaults forwarding to the constants in `genquota_core::defaults`,
//! CLI overrides, and mapping into the library config types.

mod defaults;
mod loader;
mod types;
mod validate;

pub use loader::{load_config, ConfigError};
pub use types::{
    apply_overrides, CacheConfig, CliOverrides, Config, DatabaseConfig, LimitsConfig,
    LoggingConfig, MetricsConfig, RateLimitConfig, ScopeLimitConfig,
};
pub use validate::validate_config;
