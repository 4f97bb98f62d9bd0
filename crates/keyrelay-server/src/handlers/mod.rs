//! HTTP handlers, one module per endpoint family.

pub(crate) mod admin;
pub(crate) mod assign;
pub(crate) mod chat;
pub(crate) mod clients;
pub(crate) mod conversation;
pub(crate) mod health;
pub(crate) mod verify;
pub(crate) mod voice;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use subtle::ConstantTimeEq;

use crate::error::ApiError;

/// The trimmed `x-api-key` header, if present and non-blank.
pub(crate) fn client_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Check `Authorization: Bearer <password>`.
pub(crate) fn authorize(headers: &HeaderMap, password: &str) -> Result<(), ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Authorization required".into()))?;
    if !bool::from(token.as_bytes().ct_eq(password.as_bytes())) {
        return Err(ApiError::Forbidden("Invalid admin credentials".into()));
    }
    Ok(())
}
