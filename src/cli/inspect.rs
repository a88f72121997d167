use action_flow::ConfigurationLoader;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tenderscout_core_types::{StepDefinition, StepKind};

use super::context::CliContext;
use super::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    /// Configuration id (file stem under the configurations directory)
    pub configuration_id: String,
}

#[derive(Debug, Serialize)]
struct StepSummary {
    order: u32,
    step_id: String,
    step_type: String,
    name: String,
    detail: String,
}

pub async fn cmd_inspect(args: InspectArgs, ctx: &CliContext) -> Result<()> {
    let configuration = ctx
        .loader()
        .load(&args.configuration_id)
        .await?
        .into_ordered()
        .with_context(|| format!("configuration {} is not runnable", args.configuration_id))?;

    let steps: Vec<StepSummary> = configuration.steps.iter().map(summarize).collect();
    match ctx.output() {
        OutputFormat::Json => print_json(&serde_json::json!({
            "id": configuration.id,
            "name": configuration.name,
            "target_url": configuration.target_url,
            "steps": steps,
        }))?,
        OutputFormat::Human => {
            let name = configuration.name.as_deref().unwrap_or(&configuration.id);
            println!("{} ({})", name, configuration.target_url);
            for step in &steps {
                println!(
                    "  {}. [{}] {} - {}",
                    step.order, step.step_type, step.name, step.detail
                );
            }
        }
    }
    Ok(())
}

fn summarize(step: &StepDefinition) -> StepSummary {
    let detail = match &step.kind {
        StepKind::Automation { actions } => format!("{} actions", actions.len()),
        StepKind::AiPrompt(spec) => {
            let first_line = spec.prompt.lines().next().unwrap_or("");
            truncate(first_line, 60)
        }
        StepKind::CreateRecord(template) => match &template.source {
            Some(source) => format!("source {source}"),
            None => "records".to_string(),
        },
        StepKind::Unknown { .. } => "will be skipped".to_string(),
    };
    StepSummary {
        order: step.order,
        step_id: step.step_id(),
        step_type: step.step_type().to_string(),
        name: step.name.clone(),
        detail,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
