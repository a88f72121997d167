//! Completion capability for AI steps.
//!
//! [`CompletionProvider`] turns a system prompt and a user prompt into model text.
//! Vendors plug in behind it: an OpenAI-compatible chat-completions client, an
//! Anthropic messages client, and a scripted provider for tests and offline runs.

pub mod anthropic;
mod errors;
pub mod openai;
mod scripted;
pub mod utils;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::{ClaudeCompletionProvider, ClaudeConfig};
pub use errors::LlmError;
pub use openai::{OpenAiCompletionProvider, OpenAiConfig};
pub use scripted::ScriptedCompletionProvider;
pub use utils::{extract_json_payload, strip_code_fence};

/// One completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Abstraction over completion vendors.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short vendor name used in logs.
    fn name(&self) -> &str;

    /// Return the model's text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
