//! Step engine error types

use action_primitives::ActionFailure;
use cdp_adapter::AdapterError;
use llm_provider::LlmError;
use tenderscout_core_types::ConfigurationError;
use thiserror::Error;

/// Errors raised while starting sessions and executing steps.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    /// Loaded configuration is unusable (no steps, gaps in `order`)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session id format: {0}")]
    InvalidSessionIdFormat(String),

    #[error("Unknown step type '{step_type}' at step {order}")]
    UnknownStepType { order: u32, step_type: String },

    #[error("Unknown action type at action #{action_order}")]
    UnknownActionType { action_order: u32 },

    #[error("Automation action #{action_order} ({kind}) failed: {reason}")]
    AutomationActionFailed {
        action_order: u32,
        kind: String,
        reason: String,
    },

    #[error("Storage upload failed: {0}")]
    StorageUploadFailed(String),

    /// Model output could not be decoded into typed values or records
    #[error("Model output could not be parsed: {0}")]
    ModelParseFailure(String),

    #[error("Record insert failed for '{title}': {reason}")]
    RecordInsertFailed { title: String, reason: String },

    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Step {requested} requested out of order; next step is {expected}")]
    StepOutOfOrder { expected: usize, requested: usize },

    #[error("Step index {index} out of range ({total} steps)")]
    StepIndexOutOfRange { index: usize, total: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Fatal errors abort the step and tear the session down; soft ones are logged and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::UnknownStepType { .. }
                | EngineError::UnknownActionType { .. }
                | EngineError::ModelParseFailure(_)
                | EngineError::RecordInsertFailed { .. }
        )
    }

    /// Errors caused by the request itself rather than by executing a step.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::SessionNotFound(_)
                | EngineError::InvalidSessionIdFormat(_)
                | EngineError::StepOutOfOrder { .. }
                | EngineError::StepIndexOutOfRange { .. }
        )
    }
}

impl From<ActionFailure> for EngineError {
    fn from(failure: ActionFailure) -> Self {
        if failure.error.is_storage() {
            return EngineError::StorageUploadFailed(failure.error.to_string());
        }
        EngineError::AutomationActionFailed {
            action_order: failure.order,
            kind: failure.kind.to_string(),
            reason: failure.error.to_string(),
        }
    }
}

impl From<LlmError> for EngineError {
    fn from(err: LlmError) -> Self {
        EngineError::CompletionFailed(err.to_string())
    }
}

impl From<ConfigurationError> for EngineError {
    fn from(err: ConfigurationError) -> Self {
        EngineError::InvalidConfiguration(err.to_string())
    }
}

impl From<AdapterError> for EngineError {
    fn from(err: AdapterError) -> Self {
        EngineError::BrowserLaunchFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::{ActionError, StepExecutionContext};
    use tenderscout_core_types::ActionKind;

    #[test]
    fn soft_errors_are_not_fatal() {
        assert!(!EngineError::ModelParseFailure("x".into()).is_fatal());
        assert!(!EngineError::UnknownStepType {
            order: 2,
            step_type: "email".into()
        }
        .is_fatal());
        assert!(EngineError::StorageUploadFailed("disk full".into()).is_fatal());
        assert!(EngineError::StepOutOfOrder {
            expected: 0,
            requested: 2
        }
        .is_caller_error());
    }

    #[test]
    fn storage_failures_keep_their_category() {
        let failure = ActionFailure {
            order: 3,
            kind: ActionKind::PersistDownload,
            error: ActionError::StorageUpload("bucket offline".into()),
            partial: StepExecutionContext::default(),
        };
        assert!(matches!(
            EngineError::from(failure),
            EngineError::StorageUploadFailed(_)
        ));
    }
}
