use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{CompletionProvider, CompletionRequest, LlmError};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Tried in order; a 429 moves on to the next key.
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiCompletionProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiCompletionProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_keys.iter().all(|key| key.trim().is_empty()) {
            return Err(LlmError::config("missing OpenAI API key"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn build_body(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user_prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = self.build_body(request);
        let keys: Vec<&String> = self
            .config
            .api_keys
            .iter()
            .filter(|key| !key.trim().is_empty())
            .collect();

        let mut last_error: Option<LlmError> = None;
        for (index, key) in keys.iter().enumerate() {
            let response = match self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(LlmError::transport(format!("openai request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < keys.len() {
                    let friendly = openai_rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = keys.len() - index - 1,
                        "OpenAI rate limited completion; switching API key"
                    );
                    last_error = Some(LlmError::RateLimited(friendly));
                    continue;
                }
                if status.as_u16() == 429 {
                    return Err(LlmError::RateLimited(openai_rate_limit_message(&text)));
                }
                return Err(LlmError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| LlmError::invalid_response(format!("openai: {err}")))?;

            if let Some(usage) = &response.usage {
                debug!(
                    target: "openai",
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "completion usage"
                );
            }

            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| LlmError::invalid_response("openai response missing content"));
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::transport("OpenAI request exhausted all API keys")))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorMessage {
    message: Option<String>,
}

fn openai_rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<OpenAiErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!(
                "OpenAI rate limit exceeded: {}. Please retry later or configure a higher tier.",
                message.trim()
            );
        }
    }
    "OpenAI rate limit exceeded; please retry later or reduce usage.".to_string()
}
