use std::path::PathBuf;
use std::sync::Arc;

use action_flow::{EngineComponents, RunReport, StepEngine};
use anyhow::{bail, Result};
use artifact_store::FsArtifactStore;
use cdp_adapter::ChromiumLauncher;
use clap::Args;
use llm_provider::CompletionProvider;
use tenderscout_core_types::StepResult;
use tracing::info;

use super::context::CliContext;
use super::output::{print_json, OutputFormat};
use crate::sink::JsonLinesRecordSink;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Configuration id (file stem under the configurations directory)
    pub configuration_id: String,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Root directory for stored artifacts, overriding settings
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// JSON-lines file for created records, overriding settings
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let settings = ctx.settings();
    let mut browser = settings.browser.clone();
    if args.headful {
        browser.headless = false;
    }
    let storage_root = args
        .storage_root
        .unwrap_or_else(|| settings.storage.root.clone());
    let records_path = args.records.unwrap_or_else(|| settings.records.path.clone());

    let completions = settings.build_provider()?;
    info!(
        configuration = %args.configuration_id,
        provider = completions.name(),
        storage = %storage_root.display(),
        records = %records_path.display(),
        "Preparing run"
    );

    let engine = StepEngine::new(EngineComponents {
        loader: Arc::new(ctx.loader()),
        launcher: Arc::new(ChromiumLauncher::new(browser)),
        artifacts: Arc::new(FsArtifactStore::new(storage_root)),
        completions,
        records: Arc::new(JsonLinesRecordSink::new(records_path)),
        sessions: None,
    });

    let report = engine.run_configuration(&args.configuration_id).await?;
    match ctx.output() {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => print_report(&report),
    }

    if !report.succeeded() {
        bail!(
            "run stopped after {}/{} steps: {}",
            report.steps_completed,
            report.total_steps,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Session:  {}", report.session_id);
    println!(
        "Steps:    {}/{} completed in {} ms",
        report.steps_completed, report.total_steps, report.elapsed_ms
    );
    for (index, result) in report.results.iter().enumerate() {
        let status = if result.success { "ok" } else { "FAILED" };
        println!("  [{}] step {} {}", status, index + 1, summarize(result));
        if let Some(error) = &result.error {
            println!("        {}", error);
        }
    }
    println!("Records:  {}", report.created_records());
}

fn summarize(result: &StepResult) -> String {
    let mut parts = Vec::new();
    if let Some(path) = &result.stored_artifact_path {
        parts.push(format!("artifact={path}"));
    }
    if !result.extracted_text.is_empty() {
        parts.push(format!("texts={}", result.extracted_text.len()));
    }
    if let Some(typed) = &result.typed_values {
        parts.push(format!("{}s={}", typed.kind, typed.values.len()));
    }
    if !result.created_records.is_empty() {
        parts.push(format!("records={}", result.created_records.len()));
    }
    parts.join(" ")
}
