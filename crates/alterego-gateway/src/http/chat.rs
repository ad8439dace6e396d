//! Direct chat endpoint: POST /chat
//!
//! Lets the persona be driven without any messaging platform, e.g. from
//! `curl` or a test harness.
//!
//! Request:  `{"user_id": "sam", "message": "hey harsha"}` (`user_id` defaults to "anonymous")
//! Response: `{"response": "...", "ai_active": true, "user_id": "sam", "processing_time_ms": 12, ...}`

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::authorize;
use crate::http::stats_json;

const INACTIVE_NOTE: &str = "AI is not active. Send the activation phrase to start.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /chat
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorize(&state, &headers)?;

    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "message is required"})),
            )
        })?;
    let user_id = req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("anonymous");

    let started = Instant::now();
    let outcome = state.router.route(user_id, message).await;
    let elapsed = started.elapsed().as_millis() as u64;

    let mut body = json!({
        "response": outcome.reply,
        "ai_active": outcome.active,
        "user_id": user_id,
        "processing_time_ms": elapsed,
        "user_stats": stats_json(&outcome.stats),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if !outcome.active && outcome.reply.is_none() {
        body["note"] = json!(INACTIVE_NOTE);
    }
    Ok(Json(body))
}
