//! Step dispatcher: routes a step to its handler and fans it out over prior typed values.

use action_primitives::{ActionExecutor, ExecCtx, StepExecutionContext};
use tenderscout_core_types::{
    ActionKind, AutomationAction, Configuration, FanOutToken, StepDefinition, StepKind,
    StepResult, TypedValues,
};
use tracing::{info, warn};

use crate::{
    errors::EngineError, extractor::EntityExtractor, prompt::PromptProcessor,
    session::ExecutionSession,
};

/// Result of one step plus the error that made it fail, if any.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub result: StepResult,
    pub error: Option<EngineError>,
}

impl Dispatched {
    fn ok(result: StepResult) -> Self {
        Self {
            result,
            error: None,
        }
    }

    fn failed(error: EngineError) -> Self {
        Self {
            result: StepResult::failed(error.to_string()),
            error: Some(error),
        }
    }

    /// Whether the failure should stop the run.
    pub fn is_fatal(&self) -> bool {
        match &self.error {
            Some(error) => error.is_fatal(),
            None => !self.result.success,
        }
    }
}

pub struct StepDispatcher {
    prompts: PromptProcessor,
    extractor: EntityExtractor,
}

impl StepDispatcher {
    pub fn new(prompts: PromptProcessor, extractor: EntityExtractor) -> Self {
        Self { prompts, extractor }
    }

    /// Execute `step` once, or once per typed value of the most recent prior result.
    ///
    /// Branches run one after another on the session's single page.
    pub async fn dispatch(
        &self,
        step: &StepDefinition,
        configuration: &Configuration,
        session: &ExecutionSession,
        prior: &[StepResult],
    ) -> Dispatched {
        let tokens = match &step.kind {
            StepKind::Automation { .. } | StepKind::AiPrompt(_) => prior
                .last()
                .map(StepResult::fan_out_tokens)
                .unwrap_or_default(),
            StepKind::CreateRecord(_) | StepKind::Unknown { .. } => Vec::new(),
        };

        if tokens.is_empty() {
            return self.run_branch(step, configuration, session, prior, None).await;
        }

        info!(
            step = step.order,
            step_type = step.step_type(),
            branches = tokens.len(),
            "Fanning out step"
        );
        let mut branches = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            let branch = self
                .run_branch(step, configuration, session, prior, Some(token))
                .await;
            if !branch.result.success {
                warn!(
                    step = step.order,
                    branch = index + 1,
                    value = %token.value,
                    error = branch.result.error.as_deref().unwrap_or(""),
                    "Fan-out branch failed"
                );
            }
            branches.push(branch);
        }
        merge(branches)
    }

    async fn run_branch(
        &self,
        step: &StepDefinition,
        configuration: &Configuration,
        session: &ExecutionSession,
        prior: &[StepResult],
        token: Option<&FanOutToken>,
    ) -> Dispatched {
        match &step.kind {
            StepKind::Automation { actions } => {
                warn_unknown_actions(step, actions);
                let ctx = ExecCtx::new(&configuration.id, step.step_id(), &configuration.target_url)
                    .with_token(token.cloned());
                let executor = ActionExecutor::for_session(session.page(), session.store());
                match executor.run(&ctx, actions).await {
                    Ok(state) => Dispatched::ok(automation_result(StepResult::succeeded(), state)),
                    Err(failure) => {
                        let partial = failure.partial.clone();
                        let error = EngineError::from(failure);
                        Dispatched {
                            result: automation_result(StepResult::failed(error.to_string()), partial),
                            error: Some(error),
                        }
                    }
                }
            }
            StepKind::AiPrompt(spec) => {
                let store = session.store();
                match self
                    .prompts
                    .run(step, spec, store.as_ref(), prior, token)
                    .await
                {
                    Ok(result) => Dispatched::ok(result),
                    Err(error) => Dispatched::failed(error),
                }
            }
            StepKind::CreateRecord(template) => Dispatched::ok(
                self.extractor
                    .extract(step, template, configuration, prior)
                    .await,
            ),
            StepKind::Unknown { step_type } => {
                let error = EngineError::UnknownStepType {
                    order: step.order,
                    step_type: step_type.clone(),
                };
                warn!(step = step.order, %error, "Skipping step");
                Dispatched::failed(error)
            }
        }
    }
}

fn automation_result(base: StepResult, state: StepExecutionContext) -> StepResult {
    let mut result = base.with_extracted_text(state.extracted_text);
    result.stored_artifact_path = state.stored_artifact_path;
    result
}

fn warn_unknown_actions(step: &StepDefinition, actions: &[AutomationAction]) {
    for action in actions
        .iter()
        .filter(|action| action.action_kind == ActionKind::Unknown)
    {
        let error = EngineError::UnknownActionType {
            action_order: action.order,
        };
        warn!(step = step.order, %error, "Action will be skipped");
    }
}

/// Combine fan-out branches into one step result.
///
/// `success` is the AND of all branches and the first failing branch supplies the
/// error; collections are concatenated in branch order.
pub fn merge(branches: Vec<Dispatched>) -> Dispatched {
    let mut merged = StepResult::succeeded();
    let mut first_error: Option<EngineError> = None;
    let mut outputs: Vec<String> = Vec::new();

    for branch in branches {
        let Dispatched { result, error } = branch;
        if !result.success {
            merged.success = false;
            if merged.error.is_none() {
                merged.error = result.error.clone();
                first_error = error;
            }
        }
        if merged.stored_artifact_path.is_none() {
            merged.stored_artifact_path = result
                .stored_artifact_path
                .filter(|path| !path.is_empty());
        }
        merged.extracted_text.extend(result.extracted_text);
        if let Some(raw) = result.raw_model_output {
            outputs.push(raw);
        }
        if let Some(typed) = result.typed_values {
            match merged.typed_values.as_mut() {
                Some(existing) => existing.values.extend(typed.values),
                None => merged.typed_values = Some(TypedValues::new(typed.kind, typed.values)),
            }
        }
        merged.created_records.extend(result.created_records);
    }

    if !outputs.is_empty() {
        merged.raw_model_output = Some(outputs.join("\n\n"));
    }
    Dispatched {
        result: merged,
        error: first_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderscout_core_types::ValueKind;

    #[test]
    fn merge_ands_success_and_keeps_first_error() {
        let branches = vec![
            Dispatched::ok(
                StepResult::succeeded()
                    .with_artifact("cfg/step-2/1-a.pdf")
                    .with_extracted_text(vec!["one".into()]),
            ),
            Dispatched::failed(EngineError::StorageUploadFailed("first".into())),
            Dispatched::failed(EngineError::CompletionFailed("second".into())),
            Dispatched::ok(
                StepResult::succeeded()
                    .with_artifact("cfg/step-2/2-b.pdf")
                    .with_extracted_text(vec!["two".into()]),
            ),
        ];
        let merged = merge(branches);
        assert!(!merged.result.success);
        assert_eq!(merged.error, Some(EngineError::StorageUploadFailed("first".into())));
        assert_eq!(
            merged.result.stored_artifact_path.as_deref(),
            Some("cfg/step-2/1-a.pdf")
        );
        assert_eq!(merged.result.extracted_text, vec!["one", "two"]);
    }

    #[test]
    fn merge_concatenates_model_output() {
        let branches = vec![
            Dispatched::ok(StepResult::succeeded().with_model_output(
                "[\"1\"]",
                Some(TypedValues::new(ValueKind::Id, vec!["1".into()])),
            )),
            Dispatched::ok(StepResult::succeeded().with_model_output("prose", None)),
            Dispatched::ok(StepResult::succeeded().with_model_output(
                "[\"2\"]",
                Some(TypedValues::new(ValueKind::Url, vec!["2".into()])),
            )),
        ];
        let merged = merge(branches);
        assert!(merged.result.success);
        assert!(merged.error.is_none());
        assert_eq!(merged.result.raw_model_output.as_deref(), Some("[\"1\"]\n\nprose\n\n[\"2\"]"));
        let typed = merged.result.typed_values.unwrap();
        assert_eq!(typed.kind, ValueKind::Id);
        assert_eq!(typed.values, vec!["1", "2"]);
    }

    #[test]
    fn soft_failures_are_not_fatal() {
        let unknown = Dispatched::failed(EngineError::UnknownStepType {
            order: 4,
            step_type: "email".into(),
        });
        assert!(!unknown.result.success);
        assert!(!unknown.is_fatal());
        assert!(Dispatched::failed(EngineError::CompletionFailed("x".into())).is_fatal());
    }
}
