use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Sampling knobs forwarded verbatim to the chat-completions API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: None,
            max_tokens: 200,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }
}

/// Function definition offered to the model (legacy `functions` API shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

impl FunctionSpec {
    /// A function that takes no arguments.
    pub fn no_args(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}, "required": []}),
        }
    }
}

/// A function call chosen by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Parsed arguments; `{}` when the model sent none or invalid JSON.
    pub arguments: serde_json::Value,
}

/// Request to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full prompt, system turn first.
    pub messages: Vec<Message>,
    pub params: SamplingParams,
    /// Functions the model may call. Empty disables function calling.
    pub functions: Vec<FunctionSpec>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, params: SamplingParams) -> Self {
        Self {
            messages,
            params,
            functions: Vec::new(),
        }
    }
}

/// Result of a completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Generated text; `None` when the model returned no content.
    pub text: Option<String>,
    pub function_call: Option<FunctionCall>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
        }
    }
}

/// Common interface for hosted language models.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a chat-completions request and wait for the full response.
    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },
}
