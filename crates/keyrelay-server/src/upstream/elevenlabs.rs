//! ElevenLabs conversational AI client.

use async_trait::async_trait;
use keyrelay_config::VoiceConfig;
use reqwest::Client;
use serde::Deserialize;

use super::{UpstreamError, VoiceBackend, status_error};

const SERVICE: &str = "ElevenLabs";

#[derive(Debug, Clone)]
pub struct VoiceClient {
    client: Client,
    signed_url_endpoint: String,
}

impl VoiceClient {
    pub fn new(client: Client, config: &VoiceConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        Self {
            client,
            signed_url_endpoint: format!("{base}/v1/convai/conversation/get-signed-url"),
        }
    }
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    signed_url: Option<String>,
}

#[async_trait]
impl VoiceBackend for VoiceClient {
    async fn signed_url(&self, api_key: &str, agent_id: &str) -> Result<String, UpstreamError> {
        let resp = self
            .client
            .get(&self.signed_url_endpoint)
            .query(&[("agent_id", agent_id)])
            .header("xi-api-key", api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(SERVICE, resp).await);
        }

        let parsed: SignedUrlResponse = resp.json().await?;
        parsed
            .signed_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| UpstreamError::Decode("missing signed_url".into()))
    }
}
