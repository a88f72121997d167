//! Error types for action primitives

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action needs a target but none was configured
    #[error("Missing target: {0}")]
    MissingTarget(String),

    /// The action needs a value but none was configured
    #[error("Missing value: {0}")]
    MissingValue(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Element anchor could not be resolved
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    #[error("Download failed: {0}")]
    Download(String),

    /// Persisting a captured file failed
    #[error("Storage upload failed: {0}")]
    StorageUpload(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn is_storage(&self) -> bool {
        matches!(self, ActionError::StorageUpload(_))
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::TargetNotFound => ActionError::AnchorNotFound(message),
            AdapterErrorKind::OptionNotFound => ActionError::OptionNotFound(message),
            AdapterErrorKind::NavTimeout => ActionError::WaitTimeout(message),
            AdapterErrorKind::DownloadFailed => ActionError::Download(message),
            AdapterErrorKind::CdpIo | AdapterErrorKind::Closed => ActionError::CdpIo(message),
            AdapterErrorKind::LaunchFailed | AdapterErrorKind::Internal => {
                ActionError::Internal(message)
            }
        }
    }
}
