use artifact_store::ArtifactStore;
use cdp_adapter::PageDriver;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tenderscout_core_types::{ActionKind, AutomationAction};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    errors::ActionError,
    primitives::{ActionPrimitives, DefaultActionPrimitives},
    target,
    types::{ActionReport, ExecCtx, StepExecutionContext, WaitCondition, DEFAULT_WAIT_MS},
};

/// First failing action of a step, with whatever the earlier actions produced.
#[derive(Debug, Clone, Error)]
#[error("action #{order} ({kind}) failed: {error}")]
pub struct ActionFailure {
    pub order: u32,
    pub kind: ActionKind,
    pub error: ActionError,
    pub partial: StepExecutionContext,
}

/// Interprets automation actions against the session page.
#[derive(Clone)]
pub struct ActionExecutor {
    primitives: Arc<dyn ActionPrimitives>,
}

impl ActionExecutor {
    pub fn new(primitives: Arc<dyn ActionPrimitives>) -> Self {
        Self { primitives }
    }

    pub fn for_session(page: Arc<dyn PageDriver>, store: Arc<dyn ArtifactStore>) -> Self {
        Self::new(Arc::new(DefaultActionPrimitives::new(page, store)))
    }

    /// Run `actions` in ascending `order`, stopping at the first failure.
    pub async fn run(
        &self,
        ctx: &ExecCtx,
        actions: &[AutomationAction],
    ) -> Result<StepExecutionContext, ActionFailure> {
        let mut ordered: Vec<&AutomationAction> = actions.iter().collect();
        ordered.sort_by_key(|action| action.order);

        info!(
            configuration_id = %ctx.configuration_id,
            step_id = %ctx.step_id,
            actions = ordered.len(),
            token = ctx.token.as_ref().map(|t| t.value.as_str()).unwrap_or(""),
            "Running automation actions"
        );

        let mut state = StepExecutionContext::default();
        for action in ordered {
            match self.execute(ctx, action, &mut state).await {
                Ok(report) => {
                    debug!(
                        order = report.order,
                        kind = %report.kind,
                        latency_ms = report.latency_ms,
                        skipped = report.skipped,
                        "Action finished"
                    );
                }
                Err(error) => {
                    warn!(
                        order = action.order,
                        kind = %action.action_kind,
                        %error,
                        "Action failed, aborting step"
                    );
                    return Err(ActionFailure {
                        order: action.order,
                        kind: action.action_kind,
                        error,
                        partial: state,
                    });
                }
            }
        }
        Ok(state)
    }

    /// Execute a single action, recording side effects into `state`.
    pub async fn execute(
        &self,
        ctx: &ExecCtx,
        action: &AutomationAction,
        state: &mut StepExecutionContext,
    ) -> Result<ActionReport, ActionError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut skipped = false;

        match action.action_kind {
            ActionKind::Goto => {
                let url = target::goto_url(action, ctx)?;
                self.primitives.navigate(&url).await?;
            }
            ActionKind::Click => {
                let locator = target::click_locator(action)?;
                self.primitives.click(&locator).await?;
            }
            ActionKind::Type => {
                let locator = target::input_locator(action)?;
                let value = action.value.as_deref().unwrap_or_default();
                self.primitives.type_text(&locator, value).await?;
            }
            ActionKind::Select => {
                let selector = action
                    .trimmed_target()
                    .ok_or_else(|| ActionError::MissingTarget(action.to_string()))?;
                let value = action
                    .value
                    .as_deref()
                    .ok_or_else(|| ActionError::MissingValue(action.to_string()))?;
                self.primitives.select(selector, value).await?;
            }
            ActionKind::Wait => {
                self.primitives.wait(&wait_condition(action)).await?;
            }
            ActionKind::BeginDownloadWait => {
                self.primitives.begin_download_wait(state).await?;
            }
            ActionKind::PersistDownload => {
                let trigger = match action.trimmed_target() {
                    Some(_) => Some(target::click_locator(action)?),
                    None => None,
                };
                self.primitives
                    .persist_download(ctx, trigger.as_ref(), state)
                    .await?;
            }
            ActionKind::ExtractText => {
                let locator = target::text_locator(action)?;
                self.primitives.extract_text(locator.as_ref(), state).await?;
            }
            ActionKind::Unknown => {
                warn!(order = action.order, "Unknown action type, skipping");
                skipped = true;
            }
        }

        Ok(ActionReport {
            order: action.order,
            kind: action.action_kind,
            started_at,
            latency_ms: started.elapsed().as_millis() as u64,
            skipped,
        })
    }
}

fn wait_condition(action: &AutomationAction) -> WaitCondition {
    let network_idle = action
        .value
        .as_deref()
        .map(|value| value.trim().eq_ignore_ascii_case("networkidle"))
        .unwrap_or(false);
    if network_idle {
        WaitCondition::NetworkIdle
    } else {
        WaitCondition::Duration(Duration::from_millis(
            action.wait_ms.unwrap_or(DEFAULT_WAIT_MS),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_store::MemoryArtifactStore;
    use cdp_adapter::scripted::{PageCall, ScriptedPage};
    use cdp_adapter::Locator;
    use tenderscout_core_types::{FanOutToken, TargetKind, ValueKind};

    fn setup(page: ScriptedPage) -> (Arc<ScriptedPage>, Arc<MemoryArtifactStore>, ActionExecutor) {
        let page = Arc::new(page);
        let store = Arc::new(MemoryArtifactStore::new());
        let executor = ActionExecutor::for_session(page.clone(), store.clone());
        (page, store, executor)
    }

    fn ctx() -> ExecCtx {
        ExecCtx::new("cfg-7", "step-1", "https://tenders.example")
    }

    #[tokio::test]
    async fn download_is_stored_under_configuration_and_step() {
        let (page, store, executor) =
            setup(ScriptedPage::new().with_download(Some("results.csv"), b"id\nA-1".to_vec()));
        let actions = vec![
            AutomationAction::new(1, ActionKind::Goto),
            AutomationAction::new(2, ActionKind::BeginDownloadWait),
            AutomationAction::new(3, ActionKind::PersistDownload)
                .with_target("button:Export", TargetKind::Role),
        ];

        let state = executor.run(&ctx(), &actions).await.expect("run");
        let path = state.stored_artifact_path.expect("artifact path");
        assert!(path.starts_with("cfg-7/step-1/"));
        assert!(path.ends_with("-results.csv"));

        let stored = store.get(&path).expect("stored artifact");
        assert_eq!(stored.content_type, "text/csv");
        assert_eq!(stored.bytes, b"id\nA-1");

        assert_eq!(
            page.calls(),
            vec![
                PageCall::Goto("https://tenders.example".into()),
                PageCall::WaitForNetworkIdle,
                PageCall::ArmDownload,
                PageCall::Click(Locator::Role {
                    role: Some("button".into()),
                    name: "Export".into()
                }),
                PageCall::AwaitDownload,
            ]
        );
    }

    #[tokio::test]
    async fn persist_download_arms_when_needed_and_defaults_name() {
        let (_page, store, executor) =
            setup(ScriptedPage::new().with_download(None, vec![0x50, 0x4b]));
        let actions = vec![AutomationAction::new(1, ActionKind::PersistDownload)
            .with_selector("#export")];

        let state = executor.run(&ctx(), &actions).await.expect("run");
        let path = state.stored_artifact_path.expect("path");
        assert!(path.ends_with("-downloaded-file.xlsx"));
        assert_eq!(
            store.get(&path).expect("stored").content_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn storage_failure_is_reported_as_upload_error() {
        let (_page, store, executor) =
            setup(ScriptedPage::new().with_download(Some("a.pdf"), vec![1]));
        store.reject_uploads(true);
        let actions = vec![AutomationAction::new(1, ActionKind::PersistDownload)];

        let failure = tokio_test::block_on(executor.run(&ctx(), &actions)).unwrap_err();
        assert!(failure.error.is_storage());
        assert_eq!(failure.kind, ActionKind::PersistDownload);
    }

    #[tokio::test]
    async fn first_failure_aborts_remaining_actions() {
        let broken = Locator::role_target("Search");
        let (page, _store, executor) = setup(
            ScriptedPage::new()
                .with_text(None, "page body")
                .fail_locator(broken),
        );
        let actions = vec![
            AutomationAction::new(1, ActionKind::ExtractText),
            AutomationAction::new(2, ActionKind::Click).with_target("Search", TargetKind::Role),
            AutomationAction::new(3, ActionKind::Goto),
        ];

        let failure = executor.run(&ctx(), &actions).await.unwrap_err();
        assert_eq!(failure.order, 2);
        assert!(matches!(failure.error, ActionError::AnchorNotFound(_)));
        assert_eq!(failure.partial.extracted_text, vec!["page body".to_string()]);
        assert!(page.visited_urls().is_empty());
    }

    #[tokio::test]
    async fn unknown_actions_are_skipped_and_order_is_respected() {
        let (page, _store, executor) = setup(ScriptedPage::new());
        let actions: Vec<AutomationAction> = form_actions();

        executor.run(&ctx(), &actions).await.expect("run");
        assert_eq!(
            page.calls(),
            vec![
                PageCall::Fill(Locator::textbox("Keywords"), "roads".into()),
                PageCall::SelectOption("#region".into(), "north".into()),
                PageCall::WaitForNetworkIdle,
            ]
        );
    }

    #[tokio::test]
    async fn fan_out_token_drives_navigation() {
        let (page, _store, executor) = setup(ScriptedPage::new());
        let ctx = ctx().with_token(Some(FanOutToken::new(ValueKind::Url, "https://x.example/1")));
        let actions = vec![AutomationAction::new(1, ActionKind::Goto)];

        executor.run(&ctx, &actions).await.expect("run");
        assert_eq!(page.visited_urls(), vec!["https://x.example/1".to_string()]);
    }

    fn form_actions() -> Vec<AutomationAction> {
        vec![
            AutomationAction::new(3, ActionKind::Wait).with_value("networkidle"),
            AutomationAction::new(1, ActionKind::Type)
                .with_target("Keywords", TargetKind::Role)
                .with_value("roads"),
            AutomationAction::new(4, ActionKind::Unknown).with_selector("#menu"),
            AutomationAction::new(2, ActionKind::Select)
                .with_selector("#region")
                .with_value("north"),
        ]
    }
}
