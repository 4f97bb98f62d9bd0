//! Chat relay with length-based cost estimation.

use std::sync::Arc;

use keyrelay_core::{CHARS_PER_TOKEN, INPUT_PRICE_PER_1K, OUTPUT_PRICE_PER_1K};
use keyrelay_store::{KeyPool, UsageEvent, UserStore};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ErrorPolicy};
use crate::upstream::{ChatBackend, ChatRequest};

/// Approximate usage reported to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEstimate {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// USD, rounded to six decimals.
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayOutcome {
    pub response: String,
    pub usage: UsageEstimate,
}

/// Estimate tokens and cost from character counts.
///
/// Returns the rounded estimate and the unrounded cost, which is what
/// gets accumulated on the user record.
pub fn estimate_usage(message: &str, response: &str) -> (UsageEstimate, f64) {
    let input = message.chars().count() as f64 / CHARS_PER_TOKEN;
    let output = response.chars().count() as f64 / CHARS_PER_TOKEN;
    let cost = (input * INPUT_PRICE_PER_1K + output * OUTPUT_PRICE_PER_1K) / 1000.0;
    let estimate = UsageEstimate {
        input_tokens: input.round() as u64,
        output_tokens: output.round() as u64,
        estimated_cost: (cost * 1e6).round() / 1e6,
    };
    (estimate, cost)
}

pub struct RelayService {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn UserStore>,
    pool: KeyPool,
    errors: ErrorPolicy,
}

impl RelayService {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn UserStore>,
        pool: KeyPool,
        errors: ErrorPolicy,
    ) -> Self {
        Self {
            backend,
            store,
            pool,
            errors,
        }
    }

    /// Forward `message` using `api_key` and account for the exchange.
    pub async fn relay(
        &self,
        email: Option<&str>,
        message: Option<&str>,
        api_key: Option<&str>,
        stream: bool,
    ) -> Result<RelayOutcome, ApiError> {
        let (Some(email), Some(message), Some(api_key)) = (
            non_blank(email),
            message.filter(|m| !m.trim().is_empty()),
            non_blank(api_key),
        ) else {
            return Err(ApiError::Validation("Missing required fields".into()));
        };
        let email = email.to_lowercase();

        let now = OffsetDateTime::now_utc();
        let response = self
            .backend
            .complete(ChatRequest {
                api_key,
                message,
                stream,
                now,
                persona: None,
            })
            .await
            .map_err(|e| self.errors.upstream(e, "Claude API request failed"))?;

        let (usage, cost) = estimate_usage(message, &response);
        info!(
            email = %email,
            key_index = ?self.pool.index_of(api_key),
            message_length = message.chars().count(),
            response_length = response.chars().count(),
            cost,
            stream,
            "chat relayed"
        );
        self.record(&email, UsageEvent::new(now, message, &response, cost))
            .await;

        Ok(RelayOutcome { response, usage })
    }

    /// Best effort: failures are logged, never returned.
    async fn record(&self, email: &str, event: UsageEvent) {
        match self.store.record_usage(email, event).await {
            Ok(true) => {}
            Ok(false) => debug!(email = %email, "usage logged for unregistered user"),
            Err(e) => warn!(email = %email, error = %e, "failed to record usage"),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
