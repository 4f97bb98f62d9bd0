//! Client-key gated conversations for embedded widgets.
//!
//! Each call is charged against the caller's client key before the upstream
//! request goes out, so concurrent calls can never overrun the quota. A
//! failed upstream call still counts.

use std::sync::Arc;

use keyrelay_store::{KeyPool, KeyStore, StoreError};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::{ApiError, ErrorPolicy};
use crate::upstream::{ChatBackend, ChatRequest};

const DEFAULT_LANGUAGE: &str = "tr";
const TEXT_MODE: &str = "text";

/// One widget request, as received.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationRequest<'a> {
    pub client_key: Option<&'a str>,
    pub message: Option<&'a str>,
    pub session_id: Option<&'a str>,
    pub language: Option<&'a str>,
    pub mode: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientUsage {
    pub used: u64,
    pub limit: u64,
    pub remaining: i64,
    pub company: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    pub session_id: Option<String>,
    pub language: String,
    pub mode: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationOutcome {
    pub success: bool,
    pub response: String,
    pub usage: ClientUsage,
    pub metadata: ConversationMetadata,
}

pub struct ConversationService {
    backend: Arc<dyn ChatBackend>,
    clients: Arc<dyn KeyStore>,
    pool: KeyPool,
    errors: ErrorPolicy,
}

impl ConversationService {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        clients: Arc<dyn KeyStore>,
        pool: KeyPool,
        errors: ErrorPolicy,
    ) -> Self {
        Self {
            backend,
            clients,
            pool,
            errors,
        }
    }

    /// Charge the client key, then answer `message` with the first pool key.
    pub async fn converse(
        &self,
        request: ConversationRequest<'_>,
    ) -> Result<ConversationOutcome, ApiError> {
        let Some(client_key) = request.client_key.map(str::trim).filter(|k| !k.is_empty())
        else {
            return Err(invalid_key());
        };
        let mode = request.mode.unwrap_or(TEXT_MODE);
        if mode != TEXT_MODE {
            return Err(ApiError::Validation(format!("Unsupported mode: {mode}")));
        }
        let Some(message) = request.message.filter(|m| !m.trim().is_empty()) else {
            return Err(ApiError::Validation("Message is required".into()));
        };
        let Some(api_key) = self.pool.get(0) else {
            return Err(ApiError::Configuration("No valid API keys configured".into()));
        };

        let client = self
            .clients
            .consume(client_key)
            .await
            .map_err(|e| match e {
                StoreError::NotFound | StoreError::Inactive => {
                    debug!(error = %e, "client key rejected");
                    invalid_key()
                }
                other => self.errors.store(other),
            })?;

        let language = request.language.unwrap_or(DEFAULT_LANGUAGE);
        let persona = format!(
            "You are a helpful customer service assistant for {}. Respond in {}.",
            client.company,
            if language == "tr" { "Turkish" } else { "English" }
        );

        let now = OffsetDateTime::now_utc();
        let response = self
            .backend
            .complete(ChatRequest {
                api_key,
                message,
                stream: false,
                now,
                persona: Some(&persona),
            })
            .await
            .map_err(|e| self.errors.upstream(e, "Claude API request failed"))?;

        info!(
            company = %client.company,
            used = client.used,
            limit = client.limit,
            message_length = message.chars().count(),
            "client conversation relayed"
        );

        Ok(ConversationOutcome {
            success: true,
            response,
            usage: ClientUsage {
                used: client.used,
                limit: client.limit,
                remaining: client.remaining(),
                company: client.company,
            },
            metadata: ConversationMetadata {
                session_id: request.session_id.map(str::to_string),
                language: language.to_string(),
                mode: TEXT_MODE,
                timestamp: now,
            },
        })
    }
}

fn invalid_key() -> ApiError {
    ApiError::Forbidden("Invalid or inactive API key".into())
}
