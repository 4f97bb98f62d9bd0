//! `GET /verify-key`

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::debug;

use super::client_key;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) async fn verify_key(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let client = match client_key(&headers) {
        Some(key) => state
            .clients
            .get(key)
            .await
            .map_err(|e| state.errors.store(e))?,
        None => None,
    };

    let Some(client) = client else {
        debug!("client key rejected");
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "valid": false, "error": "Invalid API key" })),
        )
            .into_response());
    };

    Ok(Json(json!({
        "valid": true,
        "company": client.company,
        "usage": {
            "used": client.used,
            "limit": client.limit,
            "remaining": client.remaining(),
        },
        "active": client.active,
    }))
    .into_response())
}
