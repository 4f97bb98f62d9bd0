//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if config.server.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.request_timeout_secs must be > 0".into(),
        ));
    }
    if config.storage.data_dir.trim().is_empty() {
        return Err(ConfigError::Validation("storage.data_dir is empty".into()));
    }
    if config.storage.users_file.trim().is_empty() || config.storage.usage_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage.users_file and storage.usage_file must be set".into(),
        ));
    }
    if config.keys.max_keys == 0 {
        return Err(ConfigError::Validation("keys.max_keys must be > 0".into()));
    }
    if config.keys.env_prefix.is_empty() {
        return Err(ConfigError::Validation("keys.env_prefix is empty".into()));
    }
    if config.upstream.model.trim().is_empty() {
        return Err(ConfigError::Validation("upstream.model is empty".into()));
    }
    if config.upstream.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "upstream.max_tokens must be > 0".into(),
        ));
    }
    if config.upstream.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("upstream.base_url is empty".into()));
    }
    if config.admin.recent_activity_limit == 0 {
        return Err(ConfigError::Validation(
            "admin.recent_activity_limit must be > 0".into(),
        ));
    }
    for (i, client) in config.clients.iter().enumerate() {
        if client.key.trim().is_empty() {
            return Err(ConfigError::Validation(format!("clients[{i}].key is empty")));
        }
        if client.company.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "clients[{i}].company is empty"
            )));
        }
    }
    Ok(())
}
