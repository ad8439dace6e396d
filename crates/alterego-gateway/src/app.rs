use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};

use alterego_channels::ChannelGateway;
use alterego_core::config::AlterEgoConfig;
use alterego_router::MessageRouter;
use alterego_sessions::ConversationStore;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: AlterEgoConfig,
    pub router: Arc<MessageRouter>,
    /// Reply channel for `/webhook`; `None` when no ManyChat token is set.
    pub manychat: Option<Box<dyn ChannelGateway>>,
    /// Whether the Instagram poll loop was started.
    pub polling: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AlterEgoConfig,
        router: Arc<MessageRouter>,
        manychat: Option<Box<dyn ChannelGateway>>,
        polling: bool,
    ) -> Self {
        Self {
            config,
            router,
            manychat,
            polling,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        self.router.store()
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::health::health_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat", post(crate::http::chat::chat_handler))
        .route("/webhook", post(crate::http::webhook::webhook_handler))
        .route("/memory/{user_id}", get(crate::http::memory::memory_handler))
        .route("/stats", get(crate::http::memory::stats_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alterego_agent::{
        Completion, CompletionProvider, CompletionRequest, KeywordClassifier, ProviderError,
    };
    use alterego_router::PersonaProfile;
    use alterego_sessions::InMemoryStore;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Canned;

    #[async_trait]
    impl CompletionProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }
        async fn complete(&self, _req: &CompletionRequest) -> Result<Completion, ProviderError> {
            Ok(Completion::text("no cap"))
        }
    }

    fn test_app(api_token: Option<&str>) -> Router {
        let mut config = AlterEgoConfig::default();
        config.gateway.api_token = api_token.map(String::from);
        let profile = PersonaProfile::classic();
        let intent = Arc::new(KeywordClassifier::new(
            &profile.activate_phrase,
            &profile.deactivate_phrase,
        ));
        let router = MessageRouter::new(profile, Arc::new(InMemoryStore::new()), Arc::new(Canned), intent);
        build_router(Arc::new(AppState::new(config, Arc::new(router), None, false)))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_store_ok() {
        let app = test_app(None);
        for uri in ["/", "/health"] {
            let (status, body) = send(&app, get(uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["store"], "ok");
            assert_eq!(body["polling"], false);
        }
    }

    #[tokio::test]
    async fn chat_requires_message() {
        let app = test_app(None);
        let (status, body) = send(&app, post("/chat", json!({"user_id": "sam"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "message is required");

        let (status, _) = send(&app, post("/chat", json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_flow_activates_and_replies() {
        let app = test_app(None);

        let (status, body) = send(&app, post("/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], "anonymous");
        assert_eq!(body["ai_active"], false);
        assert!(body["response"].is_null());
        assert!(body["note"].is_string());

        let (_, body) = send(
            &app,
            post("/chat", json!({"user_id": "sam", "message": "activate_alter_ego"})),
        )
        .await;
        assert_eq!(body["ai_active"], true);
        assert!(body["response"].as_str().unwrap().contains("Alter ego activated"));

        let (_, body) = send(
            &app,
            post("/chat", json!({"user_id": "sam", "message": "how's it going"})),
        )
        .await;
        assert_eq!(body["response"], "no cap");
        assert_eq!(body["user_stats"]["message_count"], 1);
        assert!(body.get("note").is_none());
    }

    #[tokio::test]
    async fn post_routes_require_token_when_configured() {
        let app = test_app(Some("s3cret"));

        let (status, _) = send(&app, post("/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, post("/webhook", json!({"subscriber_id": "1", "text": "hi"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::post("/chat")
            .header("content-type", "application/json")
            .header("authorization", "Bearer s3cret")
            .body(Body::from(json!({"message": "hi"}).to_string()))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_routes_subscriber_messages() {
        let app = test_app(None);

        let (_, body) = send(&app, post("/webhook", json!({"subscriber_id": "42"}))).await;
        assert_eq!(body["status"], "no_action");

        let (_, body) = send(&app, post("/webhook", json!({"subscriber_id": "42", "text": "hello"}))).await;
        assert_eq!(body["status"], "no_action");

        let (status, body) = send(
            &app,
            post("/webhook", json!({"subscriber_id": "42", "text": "activate_alter_ego"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn memory_and_stats_reflect_exchanges() {
        let app = test_app(None);
        let (status, _) = send(&app, get("/memory/sam")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for message in ["activate_alter_ego", "first", "second"] {
            send(&app, post("/chat", json!({"user_id": "sam", "message": message}))).await;
        }

        let (status, body) = send(&app, get("/memory/sam?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], true);
        let exchanges = body["exchanges"].as_array().unwrap();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0]["message"], "first");
        assert_eq!(exchanges[1]["message"], "second");
        assert_eq!(exchanges[1]["kind"], "completion");

        let (_, body) = send(&app, get("/stats")).await;
        assert_eq!(body["total_users"], 1);
        assert_eq!(body["total_exchanges"], 3);
        assert_eq!(body["total_wins"], 0);
    }
}
