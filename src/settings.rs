//! Runtime settings for the `tenderscout` binary.
//!
//! Layered with the `config` crate: built-in defaults, then an optional settings file
//! (`--config FILE`, or `tenderscout.{toml,yaml,json}` in the working directory), then
//! `TENDERSCOUT__*` environment variables (`TENDERSCOUT__LLM__PROVIDER=anthropic`).

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cdp_adapter::LaunchConfig;
use llm_provider::{
    ClaudeCompletionProvider, ClaudeConfig, CompletionProvider, OpenAiCompletionProvider,
    OpenAiConfig, ScriptedCompletionProvider,
};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "TENDERSCOUT";
const DEFAULT_SETTINGS_NAME: &str = "tenderscout";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one `<configuration-id>.json` file per crawl configuration.
    pub configurations_dir: PathBuf,
    pub browser: LaunchConfig,
    pub storage: StorageSettings,
    pub llm: LlmSettings,
    pub records: RecordSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: data_dir().join("artifacts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSettings {
    /// JSON-lines file created records are appended to.
    pub path: PathBuf,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            path: data_dir().join("records.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    /// Replays `scripted_reply` for every prompt; no network access.
    Scripted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub api_base: Option<String>,
    /// Rotated on rate limits by the OpenAI-compatible client.
    pub api_keys: Vec<String>,
    pub timeout_secs: u64,
    pub scripted_reply: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            api_base: None,
            api_keys: Vec::new(),
            timeout_secs: 120,
            scripted_reply: None,
        }
    }
}

impl LlmSettings {
    /// Configured keys, falling back to the provider's conventional environment variable.
    pub fn resolved_api_keys(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .api_keys
            .iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        if !configured.is_empty() {
            return configured;
        }
        let fallback = match self.provider {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Scripted => return Vec::new(),
        };
        env::var(fallback)
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Settings {
    /// Load settings from `path` (required when given) plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path.to_path_buf()).required(true),
            None => config::File::with_name(DEFAULT_SETTINGS_NAME).required(false),
        };
        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("llm.api_keys"),
            )
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;
        Ok(settings.with_fallbacks())
    }

    fn with_fallbacks(mut self) -> Self {
        if self.configurations_dir.as_os_str().is_empty() {
            self.configurations_dir = PathBuf::from("configurations");
        }
        self
    }

    pub fn build_provider(&self) -> Result<Arc<dyn CompletionProvider>> {
        let llm = &self.llm;
        match llm.provider {
            ProviderKind::OpenAi => {
                let defaults = OpenAiConfig::default();
                let provider = OpenAiCompletionProvider::new(OpenAiConfig {
                    api_keys: llm.resolved_api_keys(),
                    model: llm.model.clone().unwrap_or(defaults.model),
                    api_base: llm.api_base.clone().unwrap_or(defaults.api_base),
                    timeout: llm.timeout(),
                })
                .context("Failed to configure OpenAI provider (set llm.api_keys or OPENAI_API_KEY)")?;
                Ok(Arc::new(provider))
            }
            ProviderKind::Anthropic => {
                let defaults = ClaudeConfig::default();
                let Some(api_key) = llm.resolved_api_keys().into_iter().next() else {
                    bail!("No Anthropic API key configured (set llm.api_keys or ANTHROPIC_API_KEY)");
                };
                let provider = ClaudeCompletionProvider::new(ClaudeConfig {
                    api_key,
                    model: llm.model.clone().unwrap_or(defaults.model),
                    api_base: llm.api_base.clone().unwrap_or(defaults.api_base),
                    timeout: llm.timeout(),
                })
                .context("Failed to configure Anthropic provider")?;
                Ok(Arc::new(provider))
            }
            ProviderKind::Scripted => {
                let reply = llm.scripted_reply.clone().unwrap_or_else(|| "[]".to_string());
                Ok(Arc::new(ScriptedCompletionProvider::repeating(reply)))
            }
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("tenderscout"))
        .unwrap_or_else(|| PathBuf::from(".tenderscout"))
}
