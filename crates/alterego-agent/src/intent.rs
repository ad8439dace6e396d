use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::provider::{CompletionProvider, CompletionRequest, Message, SamplingParams};

/// What a message asks of the persona's activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Activate,
    Deactivate,
    Neither,
}

/// Strategy deciding whether a message toggles the persona.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Intent;
}

/// Case-insensitive substring match against trigger phrases.
///
/// When both kinds match, the longer phrase decides; ties activate.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    activate: Vec<String>,
    deactivate: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(activate_phrase: &str, deactivate_phrase: &str) -> Self {
        Self::with_phrases(vec![activate_phrase.to_string()], vec![deactivate_phrase.to_string()])
    }

    pub fn with_phrases(activate: Vec<String>, deactivate: Vec<String>) -> Self {
        let normalize = |v: Vec<String>| -> Vec<String> {
            v.into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect()
        };
        Self {
            activate: normalize(activate),
            deactivate: normalize(deactivate),
        }
    }

    pub fn detect(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();
        let longest = |phrases: &[String]| {
            phrases
                .iter()
                .filter(|p| lower.contains(p.as_str()))
                .map(|p| p.len())
                .max()
        };
        // "deactivate_x" contains "activate_x", so the longer match wins.
        match (longest(&self.activate), longest(&self.deactivate)) {
            (Some(a), Some(d)) if d > a => Intent::Deactivate,
            (Some(_), _) => Intent::Activate,
            (None, Some(_)) => Intent::Deactivate,
            (None, None) => Intent::Neither,
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Intent {
        self.detect(text)
    }
}

const GENERIC_ACTIVATE: &[&str] = &["talk to alter", "activate", "turn on", "start ai", "bot mode"];
const GENERIC_DEACTIVATE: &[&str] = &["bye alter", "deactivate", "turn off", "stop", "disable"];

/// Asks the language model to classify the message.
///
/// When the provider fails, falls back to the configured phrases plus a
/// generic keyword list.
pub struct ModelClassifier {
    provider: Arc<dyn CompletionProvider>,
    fallback: KeywordClassifier,
}

impl ModelClassifier {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        activate_phrase: &str,
        deactivate_phrase: &str,
    ) -> Self {
        let mut activate = vec![activate_phrase.to_string()];
        activate.extend(GENERIC_ACTIVATE.iter().map(|s| s.to_string()));
        let mut deactivate = vec![deactivate_phrase.to_string()];
        deactivate.extend(GENERIC_DEACTIVATE.iter().map(|s| s.to_string()));
        Self {
            provider,
            fallback: KeywordClassifier::with_phrases(activate, deactivate),
        }
    }

    fn fallback(&self, text: &str) -> Intent {
        self.fallback.detect(text)
    }
}

fn intent_prompt(text: &str) -> String {
    format!(
        "Analyze this message and determine if the user wants to:\n\
         1. ACTIVATE an AI alter ego/chatbot\n\
         2. DEACTIVATE/STOP an AI alter ego/chatbot\n\
         3. NEITHER (normal conversation)\n\n\
         Message: \"{text}\"\n\n\
         Examples:\n\
         - \"talk to alter\" → activate\n\
         - \"I want to chat with your alter ego\" → activate\n\
         - \"activate AI\" → activate\n\
         - \"turn on bot mode\" → activate\n\
         - \"bye alter\" → deactivate\n\
         - \"stop the AI\" → deactivate\n\
         - \"turn off bot\" → deactivate\n\
         - \"hello there\" → neither\n\
         - \"how are you\" → neither\n\n\
         Respond with only: \"activate\", \"deactivate\", or \"neither\""
    )
}

fn parse_label(label: &str) -> Intent {
    let label = label
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphabetic())
        .to_lowercase();
    match label.as_str() {
        "activate" => Intent::Activate,
        "deactivate" => Intent::Deactivate,
        _ => Intent::Neither,
    }
}

#[async_trait]
impl IntentClassifier for ModelClassifier {
    async fn classify(&self, text: &str) -> Intent {
        let req = CompletionRequest::new(
            vec![Message::user(intent_prompt(text))],
            SamplingParams {
                temperature: 0.1,
                max_tokens: 5,
                ..SamplingParams::default()
            },
        );

        match self.provider.complete(&req).await {
            Ok(completion) => {
                let intent = parse_label(completion.text.as_deref().unwrap_or_default());
                debug!(?intent, "model intent classification");
                intent
            }
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "intent detection failed, using keywords");
                self.fallback(text)
            }
        }
    }
}
