//! ManyChat ingress: POST /webhook
//!
//! ManyChat posts `{subscriber_id, text}`; the reply goes back out through
//! the ManyChat send API rather than in the HTTP response.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use alterego_channels::OutboundMessage;
use alterego_manychat::WebhookPayload;

use crate::app::AppState;
use crate::auth::authorize;

/// POST /webhook
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorize(&state, &headers)?;

    let Some((subscriber_id, text)) = payload.routable() else {
        return Ok(Json(json!({"status": "no_action"})));
    };

    let outcome = state.router.route(subscriber_id, text).await;
    let Some(reply) = outcome.reply else {
        return Ok(Json(json!({"status": "no_action"})));
    };

    match &state.manychat {
        Some(manychat) => {
            let msg = OutboundMessage::text(subscriber_id, reply.clone());
            if let Err(e) = manychat.send(&msg).await {
                warn!(subscriber = %subscriber_id, error = %e, "manychat send failed");
                return Err((
                    StatusCode::BAD_GATEWAY,
                    Json(json!({"status": "error", "error": e.to_string(), "code": e.code()})),
                ));
            }
            info!(subscriber = %subscriber_id, "webhook reply delivered");
        }
        None => {
            warn!(subscriber = %subscriber_id, "manychat api_token not set, reply not delivered");
        }
    }

    Ok(Json(json!({"status": "success", "response": reply})))
}
