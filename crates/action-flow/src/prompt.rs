//! AI prompt processor: assembles prior artifacts into a prompt and parses the reply.

use artifact_store::ArtifactStore;
use llm_provider::{CompletionProvider, CompletionRequest};
use std::sync::Arc;
use tenderscout_core_types::{FanOutToken, PromptSpec, StepDefinition, StepResult};
use tracing::{debug, info, warn};

use crate::{errors::EngineError, parser::parse_typed_response, spreadsheet};

/// Sampling temperature for extraction prompts.
pub const PROMPT_TEMPERATURE: f32 = 0.1;
pub const MAX_COMPLETION_TOKENS: u32 = 4096;

pub const FILES_SECTION: &str = "=== DOWNLOADED FILES ===";
pub const TEXT_SECTION: &str = "=== PRIOR EXTRACTED TEXT ===";

/// Material gathered from earlier steps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PromptContext {
    /// `(artifact path, embedded content)` in result order.
    pub files: Vec<(String, String)>,
    pub texts: Vec<String>,
}

pub struct PromptProcessor {
    provider: Arc<dyn CompletionProvider>,
}

impl PromptProcessor {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn run(
        &self,
        step: &StepDefinition,
        spec: &PromptSpec,
        store: &dyn ArtifactStore,
        prior: &[StepResult],
        token: Option<&FanOutToken>,
    ) -> Result<StepResult, EngineError> {
        let context = collect_context(store, prior).await;
        let base = match token {
            Some(token) => token.substitute(&spec.prompt),
            None => spec.prompt.clone(),
        };
        let prompt = build_prompt(&base, &context);
        let request = CompletionRequest::new(spec.system_prompt.clone().unwrap_or_default(), prompt)
            .with_temperature(PROMPT_TEMPERATURE)
            .with_max_tokens(MAX_COMPLETION_TOKENS);

        info!(
            step = step.order,
            provider = self.provider.name(),
            files = context.files.len(),
            texts = context.texts.len(),
            prompt_chars = request.user_prompt.len(),
            "Requesting completion"
        );
        let raw = self.provider.complete(&request).await?;

        let typed = parse_typed_response(&raw);
        match &typed {
            Some(values) => debug!(
                step = step.order,
                kind = %values.kind,
                values = values.values.len(),
                "Model output parsed"
            ),
            None => {
                let error = EngineError::ModelParseFailure(format!(
                    "step {} returned {} chars without typed values",
                    step.order,
                    raw.len()
                ));
                warn!(step = step.order, %error, "Keeping raw model output only");
            }
        }

        Ok(StepResult::succeeded().with_model_output(raw, typed))
    }
}

/// Fetch every stored artifact and extracted text referenced by `prior`.
///
/// Artifacts that cannot be downloaded or decoded are skipped.
pub async fn collect_context(store: &dyn ArtifactStore, prior: &[StepResult]) -> PromptContext {
    let mut context = PromptContext::default();
    for result in prior {
        if let Some(path) = result.stored_artifact_path.as_deref() {
            match store.download(path).await {
                Ok(bytes) => match embed_artifact(path, bytes) {
                    Ok(content) => context.files.push((path.to_string(), content)),
                    Err(reason) => warn!(path, %reason, "Skipping unreadable artifact"),
                },
                Err(err) => warn!(path, error = %err, "Skipping artifact that failed to download"),
            }
        }
        context.texts.extend(result.extracted_text.iter().cloned());
    }
    context
}

fn embed_artifact(path: &str, bytes: Vec<u8>) -> Result<String, String> {
    if spreadsheet::is_spreadsheet(path) {
        spreadsheet::first_sheet_to_csv(bytes)
    } else {
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Base prompt, then the downloaded-files section, then the extracted-text section.
pub fn build_prompt(base: &str, context: &PromptContext) -> String {
    let mut prompt = base.trim_end().to_string();

    if !context.files.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(FILES_SECTION);
        for (path, content) in &context.files {
            let name = path.rsplit('/').next().unwrap_or(path);
            prompt.push_str(&format!("\n\n--- File: {name} ---\n{}", content.trim_end()));
        }
    }

    if !context.texts.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(TEXT_SECTION);
        for (index, text) in context.texts.iter().enumerate() {
            prompt.push_str(&format!(
                "\n\n--- Extracted text {} ---\n{}",
                index + 1,
                text.trim_end()
            ));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_store::MemoryArtifactStore;
    use llm_provider::{LlmError, ScriptedCompletionProvider};
    use tenderscout_core_types::{StepKind, ValueKind};

    fn step() -> (StepDefinition, PromptSpec) {
        let spec = PromptSpec::new("Find tender ids in {url}").with_system_prompt("Reply with JSON");
        (
            StepDefinition::new(2, "Extract ids", StepKind::AiPrompt(spec.clone())),
            spec,
        )
    }

    #[test]
    fn sections_follow_the_base_prompt() {
        let context = PromptContext {
            files: vec![("cfg/step-1/17-list.csv".into(), "id,title\n1,Roads".into())],
            texts: vec!["Page one".into(), "Page two".into()],
        };
        let prompt = build_prompt("Extract tenders.", &context);
        let files_at = prompt.find(FILES_SECTION).unwrap();
        let text_at = prompt.find(TEXT_SECTION).unwrap();
        assert!(prompt.starts_with("Extract tenders."));
        assert!(files_at < text_at);
        assert!(prompt.contains("--- File: 17-list.csv ---\nid,title\n1,Roads"));
        assert!(prompt.contains("--- Extracted text 2 ---\nPage two"));
    }

    #[test]
    fn empty_context_leaves_prompt_untouched() {
        assert_eq!(build_prompt("Just this", &PromptContext::default()), "Just this");
    }

    #[tokio::test]
    async fn unreadable_artifacts_are_skipped() {
        let store = MemoryArtifactStore::new();
        store.insert("cfg/step-1/1-notes.txt", b"tender 42".to_vec(), "text/plain");
        store.insert("cfg/step-1/2-broken.xlsx", b"not a workbook".to_vec(), "application/octet-stream");
        let prior = vec![
            StepResult::succeeded().with_artifact("cfg/step-1/1-notes.txt"),
            StepResult::succeeded().with_artifact("cfg/step-1/2-broken.xlsx"),
            StepResult::succeeded().with_artifact("cfg/step-1/missing.pdf"),
        ];
        let context = collect_context(&store, &prior).await;
        assert_eq!(
            context.files,
            vec![("cfg/step-1/1-notes.txt".to_string(), "tender 42".to_string())]
        );
    }

    #[tokio::test]
    async fn request_uses_fixed_sampling_and_substituted_prompt() {
        let provider = Arc::new(ScriptedCompletionProvider::new().with_reply(r#"["T-1","T-2"]"#));
        let processor = PromptProcessor::new(provider.clone());
        let (step, spec) = step();
        let token = FanOutToken::new(ValueKind::Url, "https://tenders.example/7");

        let result = processor
            .run(&step, &spec, &MemoryArtifactStore::new(), &[], Some(&token))
            .await
            .unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.system_prompt, "Reply with JSON");
        assert_eq!(request.user_prompt, "Find tender ids in https://tenders.example/7");
        assert_eq!(request.temperature, PROMPT_TEMPERATURE);
        assert_eq!(request.max_tokens, MAX_COMPLETION_TOKENS);
        assert_eq!(result.typed_values.unwrap().values, vec!["T-1", "T-2"]);
    }

    #[tokio::test]
    async fn malformed_output_still_succeeds() {
        let provider = Arc::new(ScriptedCompletionProvider::repeating("Nothing matched today."));
        let (step, spec) = step();
        let result = PromptProcessor::new(provider)
            .run(&step, &spec, &MemoryArtifactStore::new(), &[], None)
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.typed_values.is_none());
        assert_eq!(result.raw_model_output.as_deref(), Some("Nothing matched today."));
    }

    #[tokio::test]
    async fn completion_errors_fail_the_step() {
        let provider = Arc::new(
            ScriptedCompletionProvider::new().with_error(LlmError::transport("connection reset")),
        );
        let (step, spec) = step();
        let err = PromptProcessor::new(provider)
            .run(&step, &spec, &MemoryArtifactStore::new(), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CompletionFailed(_)));
    }
}
