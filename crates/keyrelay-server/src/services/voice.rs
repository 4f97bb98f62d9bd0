//! Voice agent lookup and signed conversation URLs.

use std::sync::Arc;

use keyrelay_config::Secrets;
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ErrorPolicy};
use crate::upstream::VoiceBackend;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignedUrl {
    pub signed_url: String,
    pub agent_id: String,
}

/// Default and optional secondary agent, each with its own API key.
pub struct VoiceService {
    backend: Arc<dyn VoiceBackend>,
    agent_id: Option<String>,
    api_key: Option<String>,
    agent_id_2: Option<String>,
    api_key_2: Option<String>,
    errors: ErrorPolicy,
}

impl VoiceService {
    pub fn new(backend: Arc<dyn VoiceBackend>, secrets: &Secrets, errors: ErrorPolicy) -> Self {
        Self {
            backend,
            agent_id: secrets.elevenlabs_agent_id.clone(),
            api_key: secrets.elevenlabs_api_key.clone(),
            agent_id_2: secrets.elevenlabs_agent_id_2.clone(),
            api_key_2: secrets.elevenlabs_api_key_2.clone(),
            errors,
        }
    }

    /// The default agent id.
    pub fn agent_id(&self) -> Result<&str, ApiError> {
        self.agent_id
            .as_deref()
            .ok_or_else(|| ApiError::Configuration("Agent ID not configured".into()))
    }

    /// Pick the agent and key for `requested`.
    ///
    /// The secondary agent is used only when it is requested and has its own
    /// key. Anything else falls back to the default agent.
    fn resolve(&self, requested: Option<&str>) -> Result<(&str, &str), ApiError> {
        let default_agent = self.agent_id()?;
        if let (Some(agent_2), Some(key_2)) = (self.agent_id_2.as_deref(), self.api_key_2.as_deref())
        {
            if requested == Some(agent_2) {
                return Ok((agent_2, key_2));
            }
        }
        if let Some(other) = requested.filter(|r| *r != default_agent) {
            warn!(agent_id = other, "requested agent not in allowed list, using default");
        }
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Configuration("ElevenLabs API key not configured".into()))?;
        Ok((default_agent, key))
    }

    pub async fn signed_url(&self, requested: Option<&str>) -> Result<SignedUrl, ApiError> {
        let (agent_id, api_key) = self.resolve(requested.filter(|r| !r.is_empty()))?;
        let signed_url = self
            .backend
            .signed_url(api_key, agent_id)
            .await
            .map_err(|e| self.errors.upstream(e, "Failed to generate signed URL"))?;
        Ok(SignedUrl {
            signed_url,
            agent_id: agent_id.to_string(),
        })
    }
}
