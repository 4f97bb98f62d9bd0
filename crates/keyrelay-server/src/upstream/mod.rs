//! Clients for the hosted APIs the service relays to.

mod anthropic;
mod elevenlabs;

use async_trait::async_trait;
use serde_json::Value;

pub use anthropic::{AnthropicClient, ChatRequest};
pub use elevenlabs::VoiceClient;

/// Failure talking to an upstream API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Non-success HTTP status. `body` is the decoded error payload, or
    /// `Value::Null` when it was not JSON.
    #[error("{service} API error: {status} {reason}")]
    Status {
        service: &'static str,
        status: u16,
        reason: String,
        body: Value,
    },

    /// An `error` event inside a streamed response.
    #[error("{service} stream error: {message}")]
    Stream {
        service: &'static str,
        message: String,
        body: Value,
    },

    /// Connection, timeout or body read failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Success status but a body we could not use.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// HTTP status reported by the upstream, if any.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Upstream payload worth echoing back as `details`.
    pub fn details(&self) -> Value {
        match self {
            Self::Status { body, .. } | Self::Stream { body, .. } => body.clone(),
            Self::Transport(e) => Value::String(e.to_string()),
            Self::Decode(msg) => Value::String(msg.clone()),
        }
    }
}

/// Sends one user message to an LLM and returns the reply text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, UpstreamError>;
}

/// Exchanges an agent id for a signed conversation URL.
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    async fn signed_url(&self, api_key: &str, agent_id: &str) -> Result<String, UpstreamError>;
}

/// Build a [`UpstreamError::Status`] from a failed response, keeping its JSON body.
pub(crate) async fn status_error(service: &'static str, resp: reqwest::Response) -> UpstreamError {
    let status = resp.status();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    UpstreamError::Status {
        service,
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        body,
    }
}
