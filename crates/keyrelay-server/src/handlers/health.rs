use axum::Json;
use keyrelay_core::VERSION;
use serde_json::{Value, json};

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}
