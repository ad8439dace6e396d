use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::app::AppState;
use crate::http::stats_json;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct MemoryQuery {
    pub limit: Option<usize>,
}

/// GET /memory/{user_id}?limit=N: recent exchanges plus counters, oldest first.
pub async fn memory_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<MemoryQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let store = state.store();

    let conversation = store.get(&user_id).map_err(store_error)?.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "no conversation for this user"})),
        )
    })?;
    let exchanges = store
        .recent_exchanges(&user_id, limit)
        .map_err(store_error)?;

    let exchanges: Vec<Value> = exchanges
        .iter()
        .map(|e| {
            json!({
                "message": e.message,
                "response": e.response,
                "kind": e.kind.as_str(),
                "timestamp": e.timestamp.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(json!({
        "user_id": user_id,
        "active": conversation.active,
        "mood": conversation.mood,
        "stats": stats_json(&conversation.stats),
        "exchanges": exchanges,
    })))
}

/// GET /stats: totals across all conversations.
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let totals = state.store().totals().map_err(store_error)?;
    Ok(Json(json!({
        "total_users": totals.total_users,
        "total_exchanges": totals.total_exchanges,
        "total_wins": totals.total_wins,
    })))
}

fn store_error(e: alterego_sessions::StoreError) -> (StatusCode, Json<Value>) {
    warn!(error = %e, "store query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "store unavailable", "code": e.code()})),
    )
}
