//! `POST /assign-api-key`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignBody {
    user_email: Option<String>,
}

pub(crate) async fn assign_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AssignBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let out = state
        .assign
        .assign(body.user_email.as_deref(), user_agent)
        .await?;

    let mut user_info = serde_json::to_value(&out.record).map_err(|e| state.errors.internal(e))?;
    user_info["email"] = Value::String(out.email);
    user_info["lastAccessed"] = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map(Value::String)
        .unwrap_or(Value::Null);

    Ok(Json(json!({
        "apiKey": out.api_key,
        "isNewUser": out.is_new_user,
        "userInfo": user_info,
    })))
}
