//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override HTTP listen address, e.g. 0.0.0.0:8888
    #[arg(long)]
    pub listen: Option<String>,
    /// Override the directory holding users.json and usage.json
    #[arg(long, env = "KEYRELAY_DATA_DIR")]
    pub data_dir: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override the model used for relayed chats
    #[arg(long)]
    pub model: Option<String>,
    /// Override the Anthropic API base URL
    #[arg(long)]
    pub upstream_url: Option<String>,
    /// Include upstream payloads and internal causes in error responses
    #[arg(long)]
    pub expose_error_details: Option<bool>,
    /// Override upstream request timeout (seconds)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = &overrides.data_dir {
        config.storage.data_dir = v.clone();
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.model {
        config.upstream.model = v.clone();
    }
    if let Some(v) = &overrides.upstream_url {
        config.upstream.base_url = v.clone();
    }
    if let Some(v) = overrides.expose_error_details {
        config.server.expose_error_details = v;
    }
    if let Some(v) = overrides.request_timeout_secs {
        config.server.request_timeout_secs = v;
    }
}
