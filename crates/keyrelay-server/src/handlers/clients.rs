//! `/generate-api-key`: admin management of client keys.
//!
//! | Method | Body                                           |
//! |--------|------------------------------------------------|
//! | POST   | `{company, limit?, pricePerMinute?}`            |
//! | GET    | none                                           |
//! | PUT    | `{apiKey, limit?, active?, pricePerMinute?}`    |
//! | DELETE | `{apiKey}`                                     |

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use keyrelay_core::{DEFAULT_CLIENT_LIMIT, DEFAULT_CLIENT_PRICE_PER_MINUTE};
use keyrelay_store::report::round_to;
use keyrelay_store::{ClientKey, generate_client_key};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::authorize;
use crate::error::ApiError;
use crate::state::AppState;

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let password = state
        .admin_password
        .as_deref()
        .ok_or_else(|| ApiError::Configuration("Admin password not configured".into()))?;
    authorize(headers, password)
}

fn not_found() -> ApiError {
    ApiError::NotFound("API key not found".into())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBody {
    company: Option<String>,
    limit: Option<u64>,
    price_per_minute: Option<f64>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin(&state, &headers)?;
    let Json(body) = body?;

    let company = body
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("Company name is required".into()))?;
    let limit = body.limit.unwrap_or(DEFAULT_CLIENT_LIMIT);
    let price = body.price_per_minute.unwrap_or(DEFAULT_CLIENT_PRICE_PER_MINUTE);

    let api_key = generate_client_key(company);
    state
        .clients
        .put(&api_key, ClientKey::new(company, limit, price))
        .await
        .map_err(|e| state.errors.store(e))?;
    info!(company, limit, "client key created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "apiKey": api_key,
            "company": company,
            "limit": limit,
            "pricePerMinute": price,
            "message": "API key created successfully",
        })),
    ))
}

pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let keys = state
        .clients
        .list()
        .await
        .map_err(|e| state.errors.store(e))?;

    let total_revenue: f64 = keys.iter().map(|(_, k)| round_to(k.revenue(), 2)).sum();
    let rows: Vec<Value> = keys
        .iter()
        .map(|(api_key, k)| {
            json!({
                "apiKey": api_key,
                "company": k.company,
                "limit": k.limit,
                "used": k.used,
                "remaining": k.remaining(),
                "active": k.active,
                "createdAt": k.created_at,
                "pricePerMinute": k.price_per_minute,
                "revenue": format!("{:.2}", k.revenue()),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "totalKeys": rows.len(),
        "keys": rows,
        "totalRevenue": format!("{total_revenue:.2}"),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateBody {
    api_key: Option<String>,
    limit: Option<u64>,
    active: Option<bool>,
    price_per_minute: Option<f64>,
}

pub(crate) async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let Json(body) = body?;
    let api_key = body.api_key.ok_or_else(not_found)?;

    let mut key = state
        .clients
        .get(&api_key)
        .await
        .map_err(|e| state.errors.store(e))?
        .ok_or_else(not_found)?;
    if let Some(limit) = body.limit {
        key.limit = limit;
    }
    if let Some(active) = body.active {
        key.active = active;
    }
    if let Some(price) = body.price_per_minute {
        key.price_per_minute = price;
    }
    state
        .clients
        .put(&api_key, key.clone())
        .await
        .map_err(|e| state.errors.store(e))?;
    info!(company = %key.company, active = key.active, "client key updated");

    Ok(Json(json!({
        "success": true,
        "message": "API key updated successfully",
        "apiKey": api_key,
        "data": key,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteBody {
    api_key: Option<String>,
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let Json(body) = body?;
    let api_key = body.api_key.ok_or_else(not_found)?;

    let removed = state
        .clients
        .delete(&api_key)
        .await
        .map_err(|e| state.errors.store(e))?;
    info!(company = %removed.company, "client key deleted");

    Ok(Json(json!({
        "success": true,
        "message": "API key deleted successfully",
    })))
}
