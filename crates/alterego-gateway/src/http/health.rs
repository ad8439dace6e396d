use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health and GET /: liveness probe including a store round-trip.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let (status, store) = match state.store().ping() {
        Ok(()) => (StatusCode::OK, json!("ok")),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, json!(e.to_string())),
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "git_sha": env!("ALTEREGO_GIT_SHA"),
            "profile": state.config.persona.profile,
            "polling": state.polling,
            "store": store,
            "uptime_secs": state.started_at.elapsed().as_secs(),
        })),
    )
}
