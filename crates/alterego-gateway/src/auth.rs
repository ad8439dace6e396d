use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;

/// Enforce the static bearer token on POST routes when `gateway.api_token` is set.
pub fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let Some(expected) = state
        .config
        .gateway
        .api_token
        .as_deref()
        .filter(|t| !t.is_empty())
    else {
        return Ok(());
    };

    if extract_bearer(headers) == Some(expected) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Unauthorized. Set 'Authorization: Bearer <your-token>' header."
            })),
        ))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
