use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider is misconfigured (missing key, bad base URL, ...).
    #[error("invalid llm configuration: {0}")]
    Config(String),

    /// Transport-level failure talking to the vendor.
    #[error("llm request failed: {0}")]
    Transport(String),

    /// The vendor answered with a non-success status.
    #[error("llm returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("llm rate limited: {0}")]
    RateLimited(String),

    /// The vendor answered, but not with usable text.
    #[error("llm response invalid: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}
