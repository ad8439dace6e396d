use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message received from an external channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform conversation (thread / subscriber) the message belongs to.
    pub conversation_id: String,

    /// Platform-native message identifier, unique within the platform.
    pub message_id: String,

    /// Platform-native identifier for the sender.
    pub sender_id: String,

    /// Text content; `None` for media, reactions and other non-text items.
    pub text: Option<String>,

    /// True when the relay's own account authored the message.
    pub is_from_self: bool,

    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Key used for cross-poll deduplication.
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.conversation_id, self.message_id)
    }

    /// Non-empty trimmed text, if any.
    pub fn text_content(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// A message to be delivered to an external channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Conversation the reply goes to.
    pub conversation_id: String,

    /// Plain text to deliver.
    pub text: String,
}

impl OutboundMessage {
    pub fn text(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
        }
    }
}

/// Runtime connection state of a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Authenticated and ready to poll/send.
    Connected,

    /// Attempting to establish or re-establish the session.
    Connecting,

    /// Not connected (initial state, or cleanly stopped).
    Disconnected,

    /// The last operation failed with this error.
    Error(String),
}
