//! Default value functions for serde.
//!
//! Forward to the constants in `genquota_core::defaults` so files only need
//! to spell out what they change.

use genquota_core::defaults;

/// Generate default value functions that forward to genquota_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

default_fns! {
    default_anonymous_limit          => DEFAULT_ANONYMOUS_LIMIT: i64,
    default_free_daily_limit         => DEFAULT_FREE_DAILY_LIMIT: i64,
    default_anonymous_retention_days => DEFAULT_ANONYMOUS_RETENTION_DAYS: u32,
    default_user_cache_ttl_secs      => DEFAULT_USER_CACHE_TTL_SECS: u64,
    default_anonymous_cache_ttl_secs => DEFAULT_ANONYMOUS_CACHE_TTL_SECS: u64,
    default_cache_max_entries        => DEFAULT_CACHE_MAX_ENTRIES: usize,
    default_rl_cleanup_secs          => DEFAULT_RL_CLEANUP_SECS: u64,
    default_rl_max_entries           => DEFAULT_RL_MAX_ENTRIES: usize,
    default_sql_max_connections      => DEFAULT_SQL_MAX_CONNECTIONS: u32,
    default_sql_min_connections      => DEFAULT_SQL_MIN_CONNECTIONS: u32,
    default_sql_connect_timeout_secs => DEFAULT_SQL_CONNECT_TIMEOUT_SECS: u64,
}

pub(crate) fn default_cache_enabled() -> bool {
    true
}
