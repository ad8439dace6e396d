//! Instagram direct-message adapter.
//!
//! Talks to the private web/mobile API with a logged-in `sessionid` cookie.
//! There is no push channel, so the gateway polls [`ChannelGateway::list_unread`]
//! on an interval and replies through [`ChannelGateway::send`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use alterego_channels::{
    ChannelError, ChannelGateway, ChannelStatus, InboundMessage, OutboundMessage,
};
use alterego_core::config::InstagramConfig;

use crate::api::{CurrentUserResponse, InboxResponse, ThreadResponse};
use crate::error::{status_error, transport_error, Op};

const APP_ID: &str = "567067343352427";
const IG_USER_AGENT: &str = "Instagram 219.0.0.12.117 Android (30/11; 420dpi; 1080x2214; \
Google; Pixel 4; flame; qcom; en_US; 346138365)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct InstagramAdapter {
    client: reqwest::Client,
    config: InstagramConfig,
    /// Numeric id of the logged-in account, resolved by `connect`.
    viewer_id: Option<String>,
    status: ChannelStatus,
}

impl InstagramAdapter {
    pub fn new(config: &InstagramConfig) -> Result<Self, ChannelError> {
        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&format!("sessionid={}", config.session_id))
            .map_err(|e| ChannelError::ConfigError(format!("invalid session id: {e}")))?;
        headers.insert(COOKIE, cookie);
        headers.insert(USER_AGENT, HeaderValue::from_static(IG_USER_AGENT));
        headers.insert("x-ig-app-id", HeaderValue::from_static(APP_ID));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            viewer_id: None,
            status: ChannelStatus::Disconnected,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChannelError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| transport_error(Op::Read, e, timeout_ms()))?;
        let resp = check(Op::Read, resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("invalid response: {e}")))
    }

    async fn post_form(&self, op: Op, path: &str, form: &[(&str, String)]) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .map_err(|e| transport_error(op, e, timeout_ms()))?;
        check(op, resp).await.map(|_| ())
    }
}

#[async_trait]
impl ChannelGateway for InstagramAdapter {
    fn name(&self) -> &str {
        "instagram"
    }

    #[instrument(skip(self), fields(username = %self.config.username))]
    async fn connect(&mut self) -> Result<(), ChannelError> {
        self.status = ChannelStatus::Connecting;
        let me: CurrentUserResponse = match self.get_json("/accounts/current_user/?edit=true").await {
            Ok(me) => me,
            Err(e) => {
                self.status = ChannelStatus::Error(e.to_string());
                return Err(e);
            }
        };

        let Some(viewer_id) = me.user.id() else {
            let err = ChannelError::AuthFailed("current user has no id".to_string());
            self.status = ChannelStatus::Error(err.to_string());
            return Err(err);
        };

        info!(viewer = %viewer_id, account = %me.user.username, "instagram session verified");
        self.viewer_id = Some(viewer_id);
        self.status = ChannelStatus::Connected;
        Ok(())
    }

    async fn list_unread(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        let inbox: InboxResponse = self
            .get_json(&format!(
                "/direct_v2/inbox/?selected_filter=unread&limit={}",
                self.config.max_threads_per_poll
            ))
            .await?;

        let mut messages = Vec::new();
        for summary in inbox
            .inbox
            .threads
            .into_iter()
            .take(self.config.max_threads_per_poll)
        {
            let path = format!(
                "/direct_v2/threads/{}/?limit={}",
                summary.thread_id, self.config.max_messages_per_thread
            );
            match self.get_json::<ThreadResponse>(&path).await {
                Ok(resp) => {
                    let mut items = resp.thread.into_messages(self.viewer_id.as_deref());
                    let skip = items.len().saturating_sub(self.config.max_messages_per_thread);
                    messages.extend(items.drain(skip..));
                }
                Err(e) if e.needs_reconnect() || matches!(e, ChannelError::RateLimited { .. }) => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(thread = %summary.thread_id, error = %e, "failed to fetch thread, skipping");
                }
            }
        }

        debug!(count = messages.len(), "fetched unread messages");
        Ok(messages)
    }

    async fn mark_seen(&self, msg: &InboundMessage) -> Result<(), ChannelError> {
        let path = format!(
            "/direct_v2/threads/{}/items/{}/seen/",
            msg.conversation_id, msg.message_id
        );
        self.post_form(
            Op::Read,
            &path,
            &[
                ("action", "mark_seen".to_string()),
                ("thread_id", msg.conversation_id.clone()),
                ("item_id", msg.message_id.clone()),
            ],
        )
        .await
    }

    #[instrument(skip(self, msg), fields(thread = %msg.conversation_id))]
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let form = [
            ("action", "send_item".to_string()),
            ("thread_ids", format!("[{}]", msg.conversation_id)),
            ("client_context", uuid::Uuid::new_v4().to_string()),
            ("text", msg.text.clone()),
        ];
        self.post_form(Op::Send, "/direct_v2/threads/broadcast/text/", &form)
            .await?;
        debug!(chars = msg.text.chars().count(), "instagram reply sent");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.clone()
    }
}

/// Pass through successful responses; classify everything else.
async fn check(op: Op, resp: reqwest::Response) -> Result<reqwest::Response, ChannelError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = resp.text().await.unwrap_or_default();
    warn!(status, "instagram API error");
    Err(status_error(op, status, retry_after, &body))
}

fn timeout_ms() -> u64 {
    REQUEST_TIMEOUT.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InstagramConfig {
        InstagramConfig {
            username: "harsha".into(),
            session_id: "abc%3A123".into(),
            base_url: "https://i.instagram.com/api/v1/".into(),
            ..InstagramConfig::default()
        }
    }

    #[test]
    fn new_adapter_starts_disconnected() {
        let adapter = InstagramAdapter::new(&config()).unwrap();
        assert_eq!(adapter.name(), "instagram");
        assert_eq!(adapter.status(), ChannelStatus::Disconnected);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let adapter = InstagramAdapter::new(&config()).unwrap();
        assert_eq!(
            adapter.url("/direct_v2/inbox/"),
            "https://i.instagram.com/api/v1/direct_v2/inbox/"
        );
    }

    #[test]
    fn control_characters_in_session_are_rejected() {
        let mut cfg = config();
        cfg.session_id = "bad\nvalue".into();
        assert!(matches!(
            InstagramAdapter::new(&cfg),
            Err(ChannelError::ConfigError(_))
        ));
    }
}
