//! Configuration type definitions for server, storage, key pool, upstreams,
//! admin reporting, client keys and logging.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

/// Top-level configuration. Every section has defaults, so an empty file
/// (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    /// Client keys accepted by `/verify-key` at startup.
    #[serde(default)]
    pub clients: Vec<ClientKeyConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Include upstream payloads and internal causes in error bodies.
    #[serde(default)]
    pub expose_error_details: bool,
    /// Timeout applied to every upstream HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            expose_error_details: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Where the user registry and usage log live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_users_file")]
    pub users_file: String,
    #[serde(default = "default_usage_file")]
    pub usage_file: String,
}

impl StorageConfig {
    /// Full path of the user registry file.
    pub fn users_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.users_file)
    }

    /// Full path of the usage log file.
    pub fn usage_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.usage_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            users_file: default_users_file(),
            usage_file: default_usage_file(),
        }
    }
}

/// How the key pool is read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Variable prefix; keys are read from `{prefix}1` up to `{prefix}{max_keys}`.
    #[serde(default = "default_key_env_prefix")]
    pub env_prefix: String,
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,
    /// Values not starting with this prefix are skipped. Empty accepts all.
    #[serde(default = "default_key_required_prefix")]
    pub required_prefix: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            env_prefix: default_key_env_prefix(),
            max_keys: default_max_keys(),
            required_prefix: default_key_required_prefix(),
        }
    }
}

/// Anthropic messages API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            anthropic_version: default_anthropic_version(),
        }
    }
}

/// ElevenLabs API settings. Credentials live in [`Secrets`](crate::Secrets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_voice_base_url")]
    pub base_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_voice_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Lifetime of a computed admin report (0 disables caching).
    #[serde(default = "default_admin_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_admin_cache_ttl_secs(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

/// A client key seeded into the in-memory client key store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientKeyConfig {
    pub key: String,
    pub company: String,
    #[serde(default = "default_client_limit")]
    pub limit: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_client_price")]
    pub price_per_minute: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"keyrelay_store": "debug", "hyper": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
