//! Server error types.
//!
//! [`ServerError`] covers startup failures. [`ApiError`] is what handlers
//! return; it renders as `{"error": ...}` with the matching status code.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyrelay_config::ConfigError;
use keyrelay_core::{
    ERROR_AUTH, ERROR_CONFIG, ERROR_INTERNAL, ERROR_NOT_FOUND, ERROR_QUOTA, ERROR_UPSTREAM,
    ERROR_VALIDATION,
};
use keyrelay_store::{EmailError, StoreError};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::upstream::UpstreamError;

/// Startup and serve-loop errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// HTTP-facing error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Configuration(String),
    /// Client key quota exhausted; the body repeats the counters.
    #[error("Usage limit exceeded")]
    RateLimited { used: u64, limit: u64 },
    /// Upstream failure. `status` is propagated when the upstream answered,
    /// otherwise the response is 502.
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        details: Option<Value>,
    },
    #[error("Internal server error")]
    Internal { details: Option<String> },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Configuration(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| !s.is_success())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    /// Error kind tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => ERROR_VALIDATION,
            Self::Unauthorized(_) | Self::Forbidden(_) => ERROR_AUTH,
            Self::NotFound(_) => ERROR_NOT_FOUND,
            Self::RateLimited { .. } => ERROR_QUOTA,
            Self::Configuration(_) => ERROR_CONFIG,
            Self::Upstream { .. } => ERROR_UPSTREAM,
            Self::Internal { .. } => ERROR_INTERNAL,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });
        match self {
            Self::Upstream {
                details: Some(details),
                ..
            } => body["details"] = details,
            Self::Internal {
                details: Some(details),
            } => body["details"] = Value::String(details),
            Self::RateLimited { used, limit } => {
                body["limit"] = json!(limit);
                body["used"] = json!(used);
            }
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(kind = ERROR_VALIDATION, error = %rejection, "rejected request body");
        Self::Validation("Invalid JSON payload".into())
    }
}

impl From<EmailError> for ApiError {
    fn from(e: EmailError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Decides how much of a failure's cause reaches the client.
///
/// Upstream error payloads are always passed through. Local causes
/// (transport failures, internal errors) only when `expose_details` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPolicy {
    pub expose_details: bool,
}

impl ErrorPolicy {
    pub fn new(expose_details: bool) -> Self {
        Self { expose_details }
    }

    /// Log `cause` and hide it behind the generic internal error.
    pub fn internal(&self, cause: impl std::fmt::Display) -> ApiError {
        error!(kind = ERROR_INTERNAL, error = %cause, "request failed");
        ApiError::Internal {
            details: self.expose_details.then(|| cause.to_string()),
        }
    }

    pub fn store(&self, err: StoreError) -> ApiError {
        match err {
            StoreError::EmptyPool => ApiError::Configuration("No valid API keys configured".into()),
            StoreError::NotFound => ApiError::NotFound("API key not found".into()),
            StoreError::Inactive => ApiError::Forbidden("Invalid or inactive API key".into()),
            StoreError::LimitExceeded { used, limit } => ApiError::RateLimited { used, limit },
            other => self.internal(other),
        }
    }

    /// Map an upstream failure, using `message` when the upstream gave no status.
    pub fn upstream(&self, err: UpstreamError, message: &str) -> ApiError {
        warn!(kind = ERROR_UPSTREAM, status = ?err.status(), error = %err, "upstream call failed");
        let message = match &err {
            UpstreamError::Status { .. } => err.to_string(),
            _ => message.to_string(),
        };
        let details = match &err {
            UpstreamError::Status { body, .. } | UpstreamError::Stream { body, .. }
                if !body.is_null() =>
            {
                Some(body.clone())
            }
            _ => self.expose_details.then(|| err.details()),
        };
        ApiError::Upstream {
            status: err.status(),
            message,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error() -> UpstreamError {
        UpstreamError::Status {
            service: "Claude",
            status: 401,
            reason: "Unauthorized".into(),
            body: json!({"type": "error", "error": {"type": "authentication_error"}}),
        }
    }

    #[test]
    fn test_email_errors_are_validation() {
        let err = ApiError::from(EmailError::Invalid);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Valid user email is required");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Configuration("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let no_status = ApiError::Upstream {
            status: None,
            message: "x".into(),
            details: None,
        };
        assert_eq!(no_status.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(no_status.kind(), ERROR_UPSTREAM);
    }

    #[test]
    fn test_upstream_status_propagated_with_payload() {
        let err = ErrorPolicy::default().upstream(status_error(), "unused");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Claude API error: 401 Unauthorized");
        match err {
            ApiError::Upstream { details, .. } => {
                assert_eq!(details.unwrap()["error"]["type"], "authentication_error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_local_causes_hidden_by_default() {
        let decode = || UpstreamError::Decode("no text".into());
        match ErrorPolicy::default().upstream(decode(), "Claude API request failed") {
            ApiError::Upstream {
                status,
                message,
                details,
            } => {
                assert_eq!(status, None);
                assert_eq!(message, "Claude API request failed");
                assert!(details.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        match ErrorPolicy::new(true).upstream(decode(), "unused") {
            ApiError::Upstream { details, .. } => assert_eq!(details, Some(json!("no text"))),
            other => panic!("unexpected {other:?}"),
        }
        match ErrorPolicy::default().internal("disk on fire") {
            ApiError::Internal { details } => assert!(details.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_store_errors() {
        let policy = ErrorPolicy::default();
        assert!(matches!(policy.store(StoreError::EmptyPool), ApiError::Configuration(_)));
        assert!(matches!(policy.store(StoreError::NotFound), ApiError::NotFound(_)));
        assert!(matches!(policy.store(StoreError::Inactive), ApiError::Forbidden(_)));
        let limited = policy.store(StoreError::LimitExceeded { used: 5, limit: 5 });
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.to_string(), "Usage limit exceeded");
        assert!(matches!(
            policy.store(StoreError::backend("x")),
            ApiError::Internal { .. }
        ));
    }
}
