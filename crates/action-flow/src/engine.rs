//! Engine façade exposed to callers: `start`, `run_step`, `cleanup`.

use artifact_store::ArtifactStore;
use cdp_adapter::BrowserLauncher;
use llm_provider::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tenderscout_core_types::StepResult;
use tracing::{error, info, warn};

use crate::{
    dispatcher::StepDispatcher,
    errors::EngineError,
    extractor::EntityExtractor,
    ports::{ConfigurationLoader, RecordSink},
    prompt::PromptProcessor,
    session::{InMemorySessionStore, SessionManager, SessionStore, StartedSession},
};

/// Collaborators the engine is assembled from.
pub struct EngineComponents {
    pub loader: Arc<dyn ConfigurationLoader>,
    pub launcher: Arc<dyn BrowserLauncher>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub completions: Arc<dyn CompletionProvider>,
    pub records: Arc<dyn RecordSink>,
    /// Defaults to an [`InMemorySessionStore`].
    pub sessions: Option<Arc<dyn SessionStore>>,
}

/// Outcome of one `run_step` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProgress {
    pub success: bool,
    /// All steps have run and the session has been released.
    pub is_complete: bool,
    /// 1-based position of the step that just ran.
    pub current_step: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub steps_completed: usize,
    pub result: StepResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub success: bool,
}

/// Summary of a full start → steps → cleanup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub session_id: String,
    pub configuration_id: String,
    pub total_steps: usize,
    pub steps_completed: usize,
    pub elapsed_ms: u64,
    pub results: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.steps_completed == self.total_steps
    }

    pub fn created_records(&self) -> usize {
        self.results.iter().map(|r| r.created_records.len()).sum()
    }
}

pub struct StepEngine {
    sessions: SessionManager,
    dispatcher: StepDispatcher,
    artifacts: Arc<dyn ArtifactStore>,
}

impl StepEngine {
    pub fn new(components: EngineComponents) -> Self {
        let EngineComponents {
            loader,
            launcher,
            artifacts,
            completions,
            records,
            sessions,
        } = components;
        let sessions = sessions.unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        Self {
            sessions: SessionManager::new(loader, launcher, artifacts.clone(), sessions),
            dispatcher: StepDispatcher::new(
                PromptProcessor::new(completions),
                EntityExtractor::new(records),
            ),
            artifacts,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn start(&self, configuration_id: &str) -> Result<StartedSession, EngineError> {
        self.sessions.start(configuration_id).await
    }

    /// Run the step at 0-based `step_index`, which must be the next one not yet run.
    ///
    /// A fatal failure or the completion of the last step releases the session.
    pub async fn run_step(
        &self,
        session_id: &str,
        step_index: usize,
    ) -> Result<StepProgress, EngineError> {
        let session = self.sessions.lookup(session_id).await?;
        let configuration = session.configuration();
        let total_steps = configuration.total_steps();

        let mut progress = session.lock_progress().await;
        // A step that held the lock may have ended the session while this call waited.
        if !self.sessions.is_registered(&session).await {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }
        if step_index >= total_steps {
            return Err(EngineError::StepIndexOutOfRange {
                index: step_index,
                total: total_steps,
            });
        }
        let expected = progress.steps_completed();
        if step_index != expected {
            return Err(EngineError::StepOutOfOrder {
                expected,
                requested: step_index,
            });
        }

        let step = &configuration.steps[step_index];
        info!(
            session_id,
            step = step.order,
            step_type = step.step_type(),
            name = %step.name,
            "Running step"
        );
        let dispatched = self
            .dispatcher
            .dispatch(step, configuration, &session, &progress.results)
            .await;
        let fatal = dispatched.is_fatal();
        progress.results.push(dispatched.result.clone());
        let steps_run = progress.steps_completed();
        drop(progress);

        let is_last = steps_run == total_steps;
        let steps_completed = if fatal { steps_run - 1 } else { steps_run };
        if fatal {
            error!(
                session_id,
                step = step.order,
                error = dispatched.result.error.as_deref().unwrap_or(""),
                "Step failed, releasing session"
            );
        } else if let Some(error) = &dispatched.error {
            warn!(session_id, step = step.order, %error, "Step skipped");
        }
        if fatal || is_last {
            self.sessions.cleanup(session_id).await?;
        }

        let download_url = dispatched
            .result
            .stored_artifact_path
            .as_deref()
            .map(|path| {
                self.artifacts
                    .public_url(path)
                    .unwrap_or_else(|| path.to_string())
            });

        Ok(StepProgress {
            success: dispatched.result.success,
            is_complete: is_last && !fatal,
            current_step: step_index + 1,
            total_steps,
            download_url,
            step_name: Some(step.name.clone()),
            error: dispatched.result.error.clone(),
            elapsed_ms: session.elapsed_ms(),
            steps_completed,
            result: dispatched.result,
        })
    }

    /// Release the session. Calling it again, or for a session that already ended, is a no-op.
    pub async fn cleanup(&self, session_id: &str) -> Result<CleanupOutcome, EngineError> {
        self.sessions.cleanup(session_id).await?;
        Ok(CleanupOutcome { success: true })
    }

    /// Start a session, run every step in order and clean up, stopping at the first fatal error.
    pub async fn run_configuration(&self, configuration_id: &str) -> Result<RunReport, EngineError> {
        let started_at = Instant::now();
        let started = self.start(configuration_id).await?;
        let mut report = RunReport {
            session_id: started.session_id.clone(),
            configuration_id: configuration_id.to_string(),
            total_steps: started.total_steps,
            steps_completed: 0,
            elapsed_ms: 0,
            results: Vec::with_capacity(started.total_steps),
            error: None,
        };

        for index in 0..started.total_steps {
            match self.run_step(&started.session_id, index).await {
                Ok(progress) => {
                    report.steps_completed = progress.steps_completed;
                    let stop = progress.steps_completed <= index;
                    report.results.push(progress.result);
                    if stop {
                        report.error = progress.error;
                        break;
                    }
                }
                Err(err) => {
                    if err.is_caller_error() {
                        warn!(session_id = %started.session_id, %err, "Step request rejected");
                    } else {
                        error!(session_id = %started.session_id, %err, "Step could not run");
                    }
                    report.error = Some(err.to_string());
                    break;
                }
            }
        }

        self.cleanup(&started.session_id).await?;
        report.elapsed_ms = started_at.elapsed().as_millis() as u64;
        info!(
            session_id = %report.session_id,
            steps_completed = report.steps_completed,
            total_steps = report.total_steps,
            records = report.created_records(),
            elapsed_ms = report.elapsed_ms,
            "Run finished"
        );
        Ok(report)
    }
}
