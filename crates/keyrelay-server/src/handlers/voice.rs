//! `GET /get-agent-id` and `GET /elevenlabs-signed-url`

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::services::SignedUrl;
use crate::state::AppState;

pub(crate) async fn get_agent_id(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "agentId": state.voice.agent_id()? })))
}

#[derive(Deserialize)]
pub(crate) struct SignedUrlQuery {
    agent_id: Option<String>,
}

pub(crate) async fn elevenlabs_signed_url(
    State(state): State<AppState>,
    Query(q): Query<SignedUrlQuery>,
) -> Result<Json<SignedUrl>, ApiError> {
    Ok(Json(state.voice.signed_url(q.agent_id.as_deref()).await?))
}
