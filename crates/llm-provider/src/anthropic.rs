use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CompletionProvider, CompletionRequest, LlmError};

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-3-5-sonnet-latest".to_string(),
            api_base: "https://api.anthropic.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Client for the Anthropic `/messages` endpoint.
pub struct ClaudeCompletionProvider {
    client: Client,
    config: ClaudeConfig,
}

impl ClaudeCompletionProvider {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::config("missing Anthropic API key"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn build_body(&self, request: &CompletionRequest) -> ClaudeRequest {
        ClaudeRequest {
            model: self.config.model.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            system: (!request.system_prompt.trim().is_empty())
                .then(|| request.system_prompt.clone()),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: vec![ClaudeContent {
                    _type: "text".to_string(),
                    text: request.user_prompt.clone(),
                }],
            }],
        }
    }
}

#[async_trait]
impl CompletionProvider for ClaudeCompletionProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|err| LlmError::transport(format!("claude request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(text));
            }
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let response: ClaudeResponse = response
            .json()
            .await
            .map_err(|err| LlmError::invalid_response(format!("claude: {err}")))?;

        let content = response.text();
        if content.is_empty() {
            return Err(LlmError::invalid_response("claude response missing content"));
        }
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Serialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    _type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeResponseContent>,
}

impl ClaudeResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.text.as_ref())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct ClaudeResponseContent {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_prompt_separately() {
        let provider = ClaudeCompletionProvider::new(ClaudeConfig {
            api_key: "key".into(),
            ..ClaudeConfig::default()
        })
        .expect("provider");
        let body = provider.build_body(&CompletionRequest::new("Reply in JSON", "Find tenders"));
        let value = serde_json::to_value(&body).expect("encode");
        assert_eq!(value["system"], "Reply in JSON");
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
        assert_eq!(value["messages"][0]["content"][0]["text"], "Find tenders");
    }

    #[test]
    fn response_text_blocks_are_joined() {
        let response: ClaudeResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"["},{"type":"tool_use"},{"type":"text","text":"]"}]}"#,
        )
        .expect("decode");
        assert_eq!(response.text(), "[\n]");
    }
}
