use chrono::{DateTime, Utc};
use std::time::Duration;
use tenderscout_core_types::{ActionKind, FanOutToken};

/// Default sleep for a `wait` action without `wait_ms`.
pub const DEFAULT_WAIT_MS: u64 = 1_000;

/// Where the current step runs: identifiers for artifact paths plus navigation defaults.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    pub configuration_id: String,
    pub step_id: String,
    /// Navigation target used when a `goto` has no value.
    pub target_url: String,
    /// Fan-out value for this branch, if the step is fanned out.
    pub token: Option<FanOutToken>,
}

impl ExecCtx {
    pub fn new(
        configuration_id: impl Into<String>,
        step_id: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            configuration_id: configuration_id.into(),
            step_id: step_id.into(),
            target_url: target_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<FanOutToken>) -> Self {
        self.token = token;
        self
    }
}

/// Side effects collected while the actions of one step run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepExecutionContext {
    pub stored_artifact_path: Option<String>,
    pub extracted_text: Vec<String>,
    pub download_armed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitCondition {
    NetworkIdle,
    Duration(Duration),
}

/// Per-action execution record.
#[derive(Clone, Debug)]
pub struct ActionReport {
    pub order: u32,
    pub kind: ActionKind,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub skipped: bool,
}
