use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{
    Completion, CompletionProvider, CompletionRequest, FunctionCall, ProviderError,
};

/// Where the chat-completions endpoint lives and how it authenticates.
#[derive(Debug, Clone)]
pub enum OpenAiFlavor {
    /// Azure OpenAI: deployment in the path, `api-key` header.
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
    /// api.openai.com or a compatible server: bearer token, model in the body.
    OpenAi { base_url: String, model: String },
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    flavor: OpenAiFlavor,
}

impl OpenAiProvider {
    pub fn new(api_key: String, flavor: OpenAiFlavor) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            flavor,
        }
    }

    pub fn azure(api_key: String, endpoint: &str, deployment: &str, api_version: &str) -> Self {
        Self::new(
            api_key,
            OpenAiFlavor::Azure {
                endpoint: endpoint.to_string(),
                deployment: deployment.to_string(),
                api_version: api_version.to_string(),
            },
        )
    }

    pub fn openai(api_key: String, base_url: Option<String>, model: String) -> Self {
        Self::new(
            api_key,
            OpenAiFlavor::OpenAi {
                base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
                model,
            },
        )
    }

    fn url(&self) -> String {
        match &self.flavor {
            OpenAiFlavor::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            OpenAiFlavor::OpenAi { base_url, .. } => {
                format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }

    fn model(&self) -> Option<&str> {
        match &self.flavor {
            OpenAiFlavor::Azure { .. } => None,
            OpenAiFlavor::OpenAi { model, .. } => Some(model),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        match self.flavor {
            OpenAiFlavor::Azure { .. } => "azure-openai",
            OpenAiFlavor::OpenAi { .. } => "openai",
        }
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        let body = build_request_body(req, self.model());
        let url = self.url();

        debug!(
            provider = self.name(),
            messages = req.messages.len(),
            functions = req.functions.len(),
            "sending chat completion request"
        );

        let builder = self.client.post(&url).header("content-type", "application/json");
        let builder = match self.flavor {
            OpenAiFlavor::Azure { .. } => builder.header("api-key", &self.api_key),
            OpenAiFlavor::OpenAi { .. } => builder.bearer_auth(&self.api_key),
        };
        let resp = builder.json(&body).send().await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000)
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = self.name(), status, body = %text, "chat completion API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp)
    }
}

fn build_request_body(req: &CompletionRequest, model: Option<&str>) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = req
        .messages
        .iter()
        .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
        .collect();

    let p = &req.params;
    let mut body = serde_json::json!({
        "messages": messages,
        "max_tokens": p.max_tokens,
        "temperature": p.temperature,
    });

    if let Some(model) = model {
        body["model"] = serde_json::json!(model);
    }
    if let Some(top_p) = p.top_p {
        body["top_p"] = serde_json::json!(top_p);
    }
    if let Some(fp) = p.frequency_penalty {
        body["frequency_penalty"] = serde_json::json!(fp);
    }
    if let Some(pp) = p.presence_penalty {
        body["presence_penalty"] = serde_json::json!(pp);
    }
    if !req.functions.is_empty() {
        body["functions"] = serde_json::json!(req.functions);
        body["function_call"] = serde_json::json!("auto");
    }

    body
}

fn parse_response(resp: ApiResponse) -> Result<Completion, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response contained no choices".to_string()))?;

    let function_call = choice.message.function_call.map(|fc| FunctionCall {
        // Models occasionally emit malformed argument JSON; treat it as no arguments.
        arguments: fc
            .arguments
            .as_deref()
            .and_then(|a| serde_json::from_str(a).ok())
            .unwrap_or_else(|| serde_json::json!({})),
        name: fc.name,
    });

    Ok(Completion {
        text: choice.message.content,
        function_call,
    })
}

// Chat-completions response types (deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    function_call: Option<ApiFunctionCall>,
}

#[derive(Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: Option<String>,
}
