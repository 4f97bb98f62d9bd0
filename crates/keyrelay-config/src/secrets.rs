//! Secrets read from the environment.

use std::fmt;

use crate::KeysConfig;

/// Credentials that must never appear in config files or logs.
///
/// `Debug` only reports which secrets are present.
#[derive(Clone, Default)]
pub struct Secrets {
    /// Claude key pool, in `CLAUDE_API_KEY_<n>` order with gaps removed.
    pub claude_keys: Vec<String>,
    pub admin_password: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_api_key_2: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_agent_id_2: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment.
    pub fn from_env(keys: &KeysConfig) -> Self {
        Self::from_lookup(keys, |name| std::env::var(name).ok())
    }

    /// Read secrets through an arbitrary lookup function.
    ///
    /// Empty values are treated as unset. Pool keys that do not start with
    /// `keys.required_prefix` are skipped.
    pub fn from_lookup<F>(keys: &KeysConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let claude_keys = (1..=keys.max_keys)
            .filter_map(|i| get(&format!("{}{i}", keys.env_prefix)))
            .filter(|k| k.starts_with(&keys.required_prefix))
            .collect();

        Self {
            claude_keys,
            admin_password: get("ADMIN_PASSWORD"),
            elevenlabs_api_key: get("ELEVENLABS_API_KEY"),
            elevenlabs_api_key_2: get("ELEVENLABS_API_KEY_2"),
            elevenlabs_agent_id: get("ELEVENLABS_AGENT_ID"),
            elevenlabs_agent_id_2: get("ELEVENLABS_AGENT_ID_2"),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("claude_keys", &self.claude_keys.len())
            .field("admin_password", &self.admin_password.is_some())
            .field("elevenlabs_api_key", &self.elevenlabs_api_key.is_some())
            .field("elevenlabs_api_key_2", &self.elevenlabs_api_key_2.is_some())
            .field("elevenlabs_agent_id", &self.elevenlabs_agent_id)
            .field("elevenlabs_agent_id_2", &self.elevenlabs_agent_id_2)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_pool_keeps_order_and_skips_gaps() {
        let secrets = Secrets::from_lookup(
            &KeysConfig::default(),
            lookup(&[
                ("CLAUDE_API_KEY_3", "sk-ant-three"),
                ("CLAUDE_API_KEY_1", "sk-ant-one"),
                ("CLAUDE_API_KEY_2", ""),
            ]),
        );
        assert_eq!(secrets.claude_keys, vec!["sk-ant-one", "sk-ant-three"]);
    }

    #[test]
    fn test_pool_rejects_wrong_prefix_and_out_of_range() {
        let keys = KeysConfig {
            max_keys: 2,
            ..KeysConfig::default()
        };
        let secrets = Secrets::from_lookup(
            &keys,
            lookup(&[
                ("CLAUDE_API_KEY_1", "not-a-claude-key"),
                ("CLAUDE_API_KEY_2", "sk-ant-two"),
                ("CLAUDE_API_KEY_3", "sk-ant-three"),
            ]),
        );
        assert_eq!(secrets.claude_keys, vec!["sk-ant-two"]);
    }

    #[test]
    fn test_optional_secrets() {
        let secrets = Secrets::from_lookup(
            &KeysConfig::default(),
            lookup(&[("ADMIN_PASSWORD", " hunter2 "), ("ELEVENLABS_AGENT_ID", "agent-1")]),
        );
        assert_eq!(secrets.admin_password.as_deref(), Some("hunter2"));
        assert_eq!(secrets.elevenlabs_agent_id.as_deref(), Some("agent-1"));
        assert!(secrets.elevenlabs_api_key.is_none());
    }

    #[test]
    fn test_debug_hides_values() {
        let secrets = Secrets {
            claude_keys: vec!["sk-ant-secret".into()],
            admin_password: Some("hunter2".into()),
            ..Secrets::default()
        };
        let printed = format!("{secrets:?}");
        assert!(!printed.contains("sk-ant-secret"));
        assert!(!printed.contains("hunter2"));
    }
}
