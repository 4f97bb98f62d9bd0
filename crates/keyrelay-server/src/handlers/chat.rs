//! `POST /claude-chat`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use crate::error::ApiError;
use crate::services::RelayOutcome;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatBody {
    user_email: Option<String>,
    message: Option<String>,
    api_key: Option<String>,
    #[serde(default)]
    stream: bool,
}

pub(crate) async fn claude_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<RelayOutcome>, ApiError> {
    let Json(body) = body?;
    let out = state
        .relay
        .relay(
            body.user_email.as_deref(),
            body.message.as_deref(),
            body.api_key.as_deref(),
            body.stream,
        )
        .await?;
    Ok(Json(out))
}
