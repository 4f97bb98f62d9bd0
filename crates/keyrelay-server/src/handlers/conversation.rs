//! `POST /conversation`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde::Deserialize;

use super::client_key;
use crate::error::ApiError;
use crate::services::{ConversationOutcome, ConversationRequest};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationBody {
    message: Option<String>,
    session_id: Option<String>,
    language: Option<String>,
    mode: Option<String>,
}

pub(crate) async fn conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ConversationBody>, JsonRejection>,
) -> Result<Json<ConversationOutcome>, ApiError> {
    let Json(body) = body?;
    let out = state
        .conversation
        .converse(ConversationRequest {
            client_key: client_key(&headers),
            message: body.message.as_deref(),
            session_id: body.session_id.as_deref(),
            language: body.language.as_deref(),
            mode: body.mode.as_deref(),
        })
        .await?;
    Ok(Json(out))
}
