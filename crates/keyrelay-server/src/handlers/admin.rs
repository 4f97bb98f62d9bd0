//! `GET /admin-data`

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::authorize;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) async fn admin_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(password) = state.admin_password.as_deref() {
        authorize(&headers, password)?;
    }

    let (report, cache_hit) = state.reports.report().await?;
    let mut body =
        serde_json::to_value(report.anonymized()).map_err(|e| state.errors.internal(e))?;
    body["performance"] = json!({ "cacheHit": cache_hit });

    Ok((
        [(CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(body),
    )
        .into_response())
}
