use serde::Deserialize;

/// Body of the ManyChat "external request" webhook.
///
/// ManyChat flows are configured to post the subscriber id and the last
/// text input; other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub subscriber_id: Option<String>,
    #[serde(default, alias = "last_input_text", alias = "message")]
    pub text: Option<String>,
}

impl WebhookPayload {
    /// Subscriber id and trimmed text, when both are present.
    pub fn routable(&self) -> Option<(&str, &str)> {
        let id = self.subscriber_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let text = self.text.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((id, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_extra_fields() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"subscriber_id": "9001", "last_input_text": " hey harsha ", "first_name": "Sam"}"#,
        )
        .unwrap();
        assert_eq!(payload.routable(), Some(("9001", "hey harsha")));
    }

    #[test]
    fn missing_fields_are_not_routable() {
        let payload: WebhookPayload = serde_json::from_str(r#"{"subscriber_id": "9001"}"#).unwrap();
        assert!(payload.routable().is_none());

        let payload: WebhookPayload = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert!(payload.routable().is_none());
    }
}
