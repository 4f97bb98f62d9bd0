//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `keyrelay_core::defaults`.

use keyrelay_core::defaults;

/// Generate default value functions that forward to keyrelay_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_request_timeout_secs  => DEFAULT_REQUEST_TIMEOUT_SECS: u64,
    default_max_keys              => DEFAULT_MAX_KEYS: usize,
    default_max_tokens            => DEFAULT_MAX_TOKENS: u32,
    default_admin_cache_ttl_secs  => DEFAULT_ADMIN_CACHE_TTL_SECS: u64,
    default_recent_activity_limit => DEFAULT_RECENT_ACTIVITY_LIMIT: usize,
    default_client_limit          => DEFAULT_CLIENT_LIMIT: u64,
    default_client_price          => DEFAULT_CLIENT_PRICE_PER_MINUTE: f64,
}

default_string_fns! {
    default_listen            => DEFAULT_LISTEN,
    default_data_dir          => DEFAULT_DATA_DIR,
    default_users_file        => DEFAULT_USERS_FILE,
    default_usage_file        => DEFAULT_USAGE_FILE,
    default_key_env_prefix    => DEFAULT_KEY_ENV_PREFIX,
    default_key_required_prefix => DEFAULT_KEY_REQUIRED_PREFIX,
    default_upstream_base_url => DEFAULT_UPSTREAM_BASE_URL,
    default_model             => DEFAULT_MODEL,
    default_anthropic_version => DEFAULT_ANTHROPIC_VERSION,
    default_voice_base_url    => DEFAULT_VOICE_BASE_URL,
}

pub(crate) fn default_true() -> bool {
    true
}
