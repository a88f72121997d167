use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// High-level error categories surfaced by the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AdapterErrorKind {
    #[error("browser launch failed")]
    LaunchFailed,
    #[error("navigation timed out")]
    NavTimeout,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("target element not found")]
    TargetNotFound,
    #[error("option not found")]
    OptionNotFound,
    #[error("download failed")]
    DownloadFailed,
    #[error("browser already closed")]
    Closed,
    #[error("internal error")]
    Internal,
}

/// Enriched error metadata passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: false,
            data: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn cdp(err: impl fmt::Display) -> Self {
        Self::new(AdapterErrorKind::CdpIo)
            .with_hint(err.to_string())
            .retriable(true)
    }

    pub fn internal(hint: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Internal).with_hint(hint)
    }
}
