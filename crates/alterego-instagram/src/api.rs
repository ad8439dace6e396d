//! Wire types for the Instagram direct-message endpoints.
//!
//! Ids come back as either JSON numbers or strings depending on the
//! endpoint, so they are read as [`Value`] and normalised to strings.

use alterego_channels::InboundMessage;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CurrentUserResponse {
    pub user: CurrentUser,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUser {
    pub pk: Value,
    #[serde(default)]
    pub username: String,
}

impl CurrentUser {
    pub fn id(&self) -> Option<String> {
        id_string(&self.pk)
    }
}

#[derive(Debug, Deserialize)]
pub struct InboxResponse {
    pub inbox: Inbox,
}

#[derive(Debug, Default, Deserialize)]
pub struct Inbox {
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadResponse {
    pub thread: Thread,
}

#[derive(Debug, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    /// Newest first.
    #[serde(default)]
    pub items: Vec<ThreadItem>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadItem {
    pub item_id: String,
    pub user_id: Value,
    /// Microseconds since the epoch.
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl Thread {
    /// Convert the thread's items to inbound messages, oldest first.
    pub fn into_messages(self, viewer_id: Option<&str>) -> Vec<InboundMessage> {
        let thread_id = self.thread_id;
        let mut messages: Vec<InboundMessage> = self
            .items
            .into_iter()
            .rev()
            .map(|item| item.into_message(&thread_id, viewer_id))
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        messages
    }
}

impl ThreadItem {
    fn into_message(self, thread_id: &str, viewer_id: Option<&str>) -> InboundMessage {
        let sender_id = id_string(&self.user_id).unwrap_or_default();
        let is_from_self = viewer_id.is_some_and(|v| v == sender_id);
        // Only plain text items carry routable content.
        let text = if self.item_type == "text" { self.text } else { None };
        InboundMessage {
            conversation_id: thread_id.to_string(),
            message_id: self.item_id,
            sender_id,
            text,
            is_from_self,
            timestamp: micros_to_datetime(&self.timestamp),
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn micros_to_datetime(value: &Value) -> DateTime<Utc> {
    let micros = match value {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    micros
        .and_then(|us| Utc.timestamp_micros(us).single())
        .unwrap_or_else(Utc::now)
}
