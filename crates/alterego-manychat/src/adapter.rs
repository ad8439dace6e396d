//! ManyChat send adapter.
//!
//! ManyChat pushes inbound messages to our webhook, so this adapter only
//! implements the send half of [`ChannelGateway`].

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use alterego_channels::{ChannelError, ChannelGateway, ChannelStatus, OutboundMessage};
use alterego_core::config::ManyChatConfig;

pub struct ManyChatAdapter {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl ManyChatAdapter {
    /// Returns `None` when no API token is configured.
    pub fn from_config(config: &ManyChatConfig) -> Option<Self> {
        let token = config.api_token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(Self::new(token, &config.base_url))
    }

    pub fn new(api_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: api_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// `sendContent` body carrying a single text message.
pub fn send_content_body(subscriber_id: &str, text: &str) -> Value {
    json!({
        "subscriber_id": subscriber_id,
        "data": {
            "version": "v2",
            "content": {
                "messages": [{ "type": "text", "text": text }]
            }
        }
    })
}

#[async_trait]
impl ChannelGateway for ManyChatAdapter {
    fn name(&self) -> &str {
        "manychat"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let url = format!("{}/fb/sending/sendContent", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&send_content_body(&msg.conversation_id, &msg.text))
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        let status = resp.status().as_u16();
        match status {
            200..=299 => {
                debug!(subscriber = %msg.conversation_id, "manychat message sent");
                Ok(())
            }
            401 | 403 => Err(ChannelError::AuthFailed(format!("HTTP {status}"))),
            429 => Err(ChannelError::RateLimited { retry_after_secs: 60 }),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                warn!(status, body = %body, "manychat API error");
                Err(ChannelError::SendFailed(format!("HTTP {status}")))
            }
        }
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_wraps_text_in_v2_content() {
        let body = send_content_body("9001", "yo! 👊");
        assert_eq!(body["subscriber_id"], "9001");
        assert_eq!(body["data"]["version"], "v2");
        assert_eq!(body["data"]["content"]["messages"][0]["type"], "text");
        assert_eq!(body["data"]["content"]["messages"][0]["text"], "yo! 👊");
    }

    #[test]
    fn adapter_requires_token() {
        let mut config = ManyChatConfig::default();
        assert!(ManyChatAdapter::from_config(&config).is_none());
        config.api_token = Some("tok".into());
        let adapter = ManyChatAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.base_url, "https://api.manychat.com");
    }

    #[tokio::test]
    async fn list_unread_is_empty_for_push_channel() {
        let adapter = ManyChatAdapter::new("tok", "https://api.manychat.com/");
        assert!(adapter.list_unread().await.unwrap().is_empty());
    }
}
