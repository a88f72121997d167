use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::{CompletionProvider, CompletionRequest, LlmError};

/// Deterministic provider used for tests and offline runs.
///
/// Replies are served in order; once the queue is empty the fallback reply (if any)
/// is repeated. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedCompletionProvider {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `reply`.
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(reply.into()));
        self
    }

    pub fn with_error(self, error: LlmError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletionProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().push(request.clone());
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        self.fallback
            .clone()
            .ok_or_else(|| LlmError::invalid_response("no scripted reply left"))
    }
}
