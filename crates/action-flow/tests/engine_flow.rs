use action_flow::{
    EngineComponents, EngineError, InMemoryConfigurationLoader, InMemoryRecordSink, StepEngine,
};
use artifact_store::MemoryArtifactStore;
use cdp_adapter::scripted::{PageCall, ScriptedLauncher, ScriptedPage};
use cdp_adapter::Locator;
use llm_provider::ScriptedCompletionProvider;
use std::sync::Arc;
use tenderscout_core_types::{
    ActionKind, AutomationAction, Configuration, OpportunityStatus, PromptSpec, RecordTemplate,
    StepDefinition, StepKind, TargetKind,
};

const TARGET_URL: &str = "https://tenders.example/search";

struct Harness {
    engine: StepEngine,
    launcher: Arc<ScriptedLauncher>,
    artifacts: Arc<MemoryArtifactStore>,
    completions: Arc<ScriptedCompletionProvider>,
    records: Arc<InMemoryRecordSink>,
}

fn harness(
    configuration: Configuration,
    page: ScriptedPage,
    completions: ScriptedCompletionProvider,
) -> Harness {
    let launcher = Arc::new(ScriptedLauncher::new().with_page(page));
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let completions = Arc::new(completions);
    let records = Arc::new(InMemoryRecordSink::new());
    let engine = StepEngine::new(EngineComponents {
        loader: Arc::new(InMemoryConfigurationLoader::new().with(configuration)),
        launcher: launcher.clone(),
        artifacts: artifacts.clone(),
        completions: completions.clone(),
        records: records.clone(),
        sessions: None,
    });
    Harness {
        engine,
        launcher,
        artifacts,
        completions,
        records,
    }
}

fn download_step(order: u32) -> StepDefinition {
    StepDefinition::new(
        order,
        "Download tender list",
        StepKind::Automation {
            actions: vec![
                AutomationAction::new(1, ActionKind::Goto),
                AutomationAction::new(2, ActionKind::BeginDownloadWait),
                AutomationAction::new(3, ActionKind::PersistDownload)
                    .with_target("button:Export", TargetKind::Role),
            ],
        },
    )
}

fn prompt_step(order: u32, prompt: &str) -> StepDefinition {
    StepDefinition::new(
        order,
        "Extract tenders",
        StepKind::AiPrompt(PromptSpec::new(prompt).with_system_prompt("Answer with JSON only")),
    )
}

fn visit_step(order: u32) -> StepDefinition {
    StepDefinition::new(
        order,
        "Open each tender",
        StepKind::Automation {
            actions: vec![
                AutomationAction::new(1, ActionKind::Goto).with_value("{url}"),
                AutomationAction::new(2, ActionKind::ExtractText),
            ],
        },
    )
}

#[tokio::test]
async fn three_step_run_creates_two_new_opportunities() {
    let configuration = Configuration::new("cfg-e2e", TARGET_URL)
        .with_step(download_step(1))
        .with_step(prompt_step(2, "List the open tenders."))
        .with_step(StepDefinition::new(
            3,
            "Save tenders",
            StepKind::CreateRecord(RecordTemplate::default()),
        ));
    let page = ScriptedPage::new().with_download(Some("tenders.csv"), b"ref,title\nT-1,Roads\nT-2,Bridges".to_vec());
    let reply = r#"{"opportunities":[
        {"title":"Roads","reference_id":"T-1","deadline_at":"2025-05-01"},
        {"title":"Bridges","reference_id":"T-2","estimated_value":"€80,000"}
    ]}"#;
    let h = harness(configuration, page, ScriptedCompletionProvider::new().with_reply(reply));

    let report = h.engine.run_configuration("cfg-e2e").await.unwrap();

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.steps_completed, 3);

    let artifact = report.results[0].stored_artifact_path.clone().unwrap();
    assert!(artifact.starts_with("cfg-e2e/step-1/"));
    assert!(artifact.ends_with("-tenders.csv"));
    assert_eq!(h.artifacts.get(&artifact).unwrap().content_type, "text/csv");

    let request = &h.completions.requests()[0];
    assert!(request.user_prompt.starts_with("List the open tenders."));
    assert!(request.user_prompt.contains("=== DOWNLOADED FILES ==="));
    assert!(request.user_prompt.contains("T-2,Bridges"));

    let created = &report.results[2].created_records;
    assert_eq!(created.len(), 2);
    for record in created {
        assert_eq!(record.as_opportunity().unwrap().status, OpportunityStatus::New);
    }
    assert_eq!(h.records.records().len(), 2);

    let page = &h.launcher.launched()[0];
    assert_eq!(page.visited_urls(), vec![TARGET_URL.to_string()]);
    assert_eq!(page.close_count(), 1);
    assert_eq!(h.engine.sessions().live_sessions().await, 0);
}

#[tokio::test]
async fn fan_out_runs_once_per_value_and_ands_success() {
    let configuration = Configuration::new("cfg-fan", TARGET_URL)
        .with_step(prompt_step(1, "Find tender pages."))
        .with_step(visit_step(2));
    let page = ScriptedPage::new().fail_goto("/b");
    let reply = r#"{"type":"url","values":["https://tenders.example/a","https://tenders.example/b"]}"#;
    let h = harness(configuration, page, ScriptedCompletionProvider::new().with_reply(reply));

    let started = h.engine.start("cfg-fan").await.unwrap();
    let first = h.engine.run_step(&started.session_id, 0).await.unwrap();
    assert!(first.success);
    assert!(!first.is_complete);

    let second = h.engine.run_step(&started.session_id, 1).await.unwrap();
    let page = &h.launcher.launched()[0];
    assert_eq!(
        page.visited_urls(),
        vec![
            "https://tenders.example/a".to_string(),
            "https://tenders.example/b".to_string()
        ]
    );
    assert!(!second.success);
    assert!(second.error.unwrap().contains("https://tenders.example/b"));
    assert_eq!(second.steps_completed, 1);
    assert!(!second.is_complete);

    // fatal failure released the session
    assert_eq!(page.close_count(), 1);
    assert!(matches!(
        h.engine.run_step(&started.session_id, 2).await,
        Err(EngineError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn fan_out_branches_merge_extracted_text() {
    let configuration = Configuration::new("cfg-fan-ok", TARGET_URL)
        .with_step(prompt_step(1, "Find tender pages."))
        .with_step(visit_step(2));
    let page = ScriptedPage::new().with_text(None, "tender body");
    let reply = r#"["https://tenders.example/1","https://tenders.example/2"]"#;
    let h = harness(configuration, page, ScriptedCompletionProvider::new().with_reply(reply));

    let report = h.engine.run_configuration("cfg-fan-ok").await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.results[1].extracted_text, vec!["tender body", "tender body"]);
    let reads = h.launcher.launched()[0]
        .calls()
        .into_iter()
        .filter(|call| matches!(call, PageCall::TextContent(_)))
        .count();
    assert_eq!(reads, 2);
}

#[tokio::test]
async fn steps_must_run_in_ascending_order() {
    let configuration = Configuration::new("cfg-order", TARGET_URL)
        .with_step(prompt_step(1, "a"))
        .with_step(prompt_step(2, "b"));
    let h = harness(
        configuration,
        ScriptedPage::new(),
        ScriptedCompletionProvider::repeating("plain text"),
    );

    let started = h.engine.start("cfg-order").await.unwrap();
    assert_eq!(started.total_steps, 2);
    assert!(matches!(
        h.engine.run_step(&started.session_id, 1).await,
        Err(EngineError::StepOutOfOrder {
            expected: 0,
            requested: 1
        })
    ));
    assert!(matches!(
        h.engine.run_step(&started.session_id, 5).await,
        Err(EngineError::StepIndexOutOfRange { index: 5, total: 2 })
    ));

    h.engine.run_step(&started.session_id, 0).await.unwrap();
    assert!(matches!(
        h.engine.run_step(&started.session_id, 0).await,
        Err(EngineError::StepOutOfOrder {
            expected: 1,
            requested: 0
        })
    ));
    let last = h.engine.run_step(&started.session_id, 1).await.unwrap();
    assert!(last.is_complete);
    assert_eq!(last.current_step, 2);
    assert_eq!(last.step_name.as_deref(), Some("Extract tenders"));
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let configuration = Configuration::new("cfg-clean", TARGET_URL).with_step(prompt_step(1, "a"));
    let h = harness(configuration, ScriptedPage::new(), ScriptedCompletionProvider::new());

    let started = h.engine.start("cfg-clean").await.unwrap();
    assert!(h.engine.cleanup(&started.session_id).await.unwrap().success);
    assert!(h.engine.cleanup(&started.session_id).await.unwrap().success);
    assert_eq!(h.launcher.launched()[0].close_count(), 1);

    assert!(matches!(
        h.engine.cleanup("not-a-session").await,
        Err(EngineError::InvalidSessionIdFormat(_))
    ));
}

#[tokio::test]
async fn unknown_steps_are_skipped() {
    let configuration = Configuration::new("cfg-soft", TARGET_URL)
        .with_step(StepDefinition::new(
            1,
            "Email buyer",
            StepKind::Unknown {
                step_type: "email".into(),
            },
        ))
        .with_step(prompt_step(2, "Summarise"));
    let h = harness(
        configuration,
        ScriptedPage::new(),
        ScriptedCompletionProvider::repeating("[]"),
    );

    let report = h.engine.run_configuration("cfg-soft").await.unwrap();

    assert!(report.succeeded(), "{report:?}");
    assert!(!report.results[0].success);
    assert!(report.results[0].error.as_deref().unwrap().contains("email"));
    assert!(report.results[1].success);
}

#[tokio::test]
async fn storage_failure_is_fatal() {
    let configuration = Configuration::new("cfg-store", TARGET_URL)
        .with_step(download_step(1))
        .with_step(prompt_step(2, "never runs"));
    let page = ScriptedPage::new().with_download(None, b"x".to_vec());
    let h = harness(configuration, page, ScriptedCompletionProvider::repeating("[]"));
    h.artifacts.reject_uploads(true);

    let report = h.engine.run_configuration("cfg-store").await.unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.steps_completed, 0);
    assert_eq!(report.results.len(), 1);
    assert!(report.error.unwrap().contains("Storage upload failed"));
    assert!(h.completions.requests().is_empty());
    assert_eq!(h.launcher.launched()[0].close_count(), 1);
}

#[tokio::test]
async fn failed_click_aborts_remaining_actions() {
    let configuration = Configuration::new("cfg-click", TARGET_URL).with_step(StepDefinition::new(
        1,
        "Filter",
        StepKind::Automation {
            actions: vec![
                AutomationAction::new(1, ActionKind::Goto),
                AutomationAction::new(2, ActionKind::Click).with_selector("#missing"),
                AutomationAction::new(3, ActionKind::ExtractText),
            ],
        },
    ));
    let page = ScriptedPage::new().fail_locator(Locator::css("#missing"));
    let h = harness(configuration, page, ScriptedCompletionProvider::new());

    let started = h.engine.start("cfg-click").await.unwrap();
    let progress = h.engine.run_step(&started.session_id, 0).await.unwrap();

    assert!(!progress.success);
    assert!(progress.error.unwrap().contains("#2"));
    let calls = h.launcher.launched()[0].calls();
    assert!(!calls.iter().any(|call| matches!(call, PageCall::TextContent(_))));
}

#[tokio::test]
async fn waiting_step_sees_session_released_by_cleanup() {
    let configuration = Configuration::new("cfg-race", TARGET_URL).with_step(prompt_step(1, "a"));
    let h = harness(
        configuration,
        ScriptedPage::new(),
        ScriptedCompletionProvider::repeating("[]"),
    );
    let started = h.engine.start("cfg-race").await.unwrap();
    let session = h.engine.sessions().lookup(&started.session_id).await.unwrap();
    let busy = session.lock_progress().await;

    let (outcome, _) = tokio::join!(h.engine.run_step(&started.session_id, 0), async {
        h.engine.cleanup(&started.session_id).await.unwrap();
        drop(busy);
    });

    assert!(matches!(outcome, Err(EngineError::SessionNotFound(_))));
    assert!(h.completions.requests().is_empty());
    assert_eq!(h.launcher.launched()[0].close_count(), 1);
}
