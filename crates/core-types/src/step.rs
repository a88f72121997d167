//! Stored step definitions.
//!
//! On the wire a step is `{order, type, name, description?, payload}` where the
//! shape of `payload` depends on `type`. In memory the payload becomes the
//! closed [`StepKind`] sum type so that dispatch is matched exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::action::AutomationAction;

/// Raised when a recognised step type carries a payload of the wrong shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("step {order} ({step_type}) has an invalid payload: {reason}")]
pub struct StepDecodeError {
    pub order: u32,
    pub step_type: String,
    pub reason: String,
}

/// One entry of a configuration's ordered step list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStepDefinition", into = "RawStepDefinition")]
pub struct StepDefinition {
    /// Stable identifier used in artifact paths; see [`StepDefinition::step_id`].
    pub id: Option<String>,
    /// 1-based, contiguous position in the configuration.
    pub order: u32,
    pub name: String,
    pub description: Option<String>,
    pub kind: StepKind,
}

impl StepDefinition {
    pub fn new(order: u32, name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: None,
            order,
            name: name.into(),
            description: None,
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier used to key stored artifacts, `step-{order}` when none was authored.
    pub fn step_id(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("step-{}", self.order),
        }
    }

    pub fn step_type(&self) -> &str {
        self.kind.type_tag()
    }
}

/// Type-specific payload of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Browser automation: a list of low-level actions run against the session page.
    Automation { actions: Vec<AutomationAction> },
    /// Language-model analysis of artifacts produced by earlier steps.
    AiPrompt(PromptSpec),
    /// Conversion of the latest model output into domain records.
    CreateRecord(RecordTemplate),
    /// A stored step whose type this engine does not know.
    Unknown { step_type: String },
}

impl StepKind {
    pub fn type_tag(&self) -> &str {
        match self {
            StepKind::Automation { .. } => "automation",
            StepKind::AiPrompt(_) => "ai_prompt",
            StepKind::CreateRecord(_) => "create_record",
            StepKind::Unknown { step_type } => step_type.as_str(),
        }
    }
}

/// Prompt configuration of an AI step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    #[serde(alias = "user_prompt")]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "system")]
    pub system_prompt: Option<String>,
}

impl PromptSpec {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Field templates of a record-creation step.
///
/// Each map goes from a destination field name to a template string with
/// `{{field}}` placeholders resolved against one model-produced object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTemplate {
    #[serde(default, alias = "fields", alias = "opportunities")]
    pub opportunity: BTreeMap<String, String>,

    #[serde(default, alias = "marketInsight", alias = "market_insights")]
    pub market_insight: BTreeMap<String, String>,

    /// Value for the `source` field when no template supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStepDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    order: u32,
    #[serde(rename = "type", alias = "step_type")]
    step_type: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AutomationPayload {
    List(Vec<AutomationAction>),
    Wrapped { actions: Vec<AutomationAction> },
}

impl TryFrom<RawStepDefinition> for StepDefinition {
    type Error = StepDecodeError;

    fn try_from(raw: RawStepDefinition) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StepDecodeError {
            order: raw.order,
            step_type: raw.step_type.clone(),
            reason,
        };

        let kind = match raw.step_type.trim().to_ascii_lowercase().as_str() {
            "automation" | "playwright" => {
                let actions = if raw.payload.is_null() {
                    Vec::new()
                } else {
                    match serde_json::from_value::<AutomationPayload>(raw.payload.clone()) {
                        Ok(AutomationPayload::List(actions))
                        | Ok(AutomationPayload::Wrapped { actions }) => actions,
                        Err(err) => return Err(invalid(err.to_string())),
                    }
                };
                StepKind::Automation { actions }
            }
            "ai_prompt" | "ai" => {
                let spec = serde_json::from_value::<PromptSpec>(raw.payload.clone())
                    .map_err(|err| invalid(err.to_string()))?;
                StepKind::AiPrompt(spec)
            }
            "create_record" => {
                let template = if raw.payload.is_null() {
                    RecordTemplate::default()
                } else {
                    serde_json::from_value::<RecordTemplate>(raw.payload.clone())
                        .map_err(|err| invalid(err.to_string()))?
                };
                StepKind::CreateRecord(template)
            }
            _ => StepKind::Unknown {
                step_type: raw.step_type.clone(),
            },
        };

        Ok(StepDefinition {
            id: raw.id,
            order: raw.order,
            name: raw.name,
            description: raw.description,
            kind,
        })
    }
}

impl From<StepDefinition> for RawStepDefinition {
    fn from(step: StepDefinition) -> Self {
        let step_type = step.kind.type_tag().to_string();
        let payload = match step.kind {
            StepKind::Automation { actions } => serde_json::to_value(actions),
            StepKind::AiPrompt(spec) => serde_json::to_value(spec),
            StepKind::CreateRecord(template) => serde_json::to_value(template),
            StepKind::Unknown { .. } => Ok(Value::Null),
        }
        .unwrap_or(Value::Null);

        RawStepDefinition {
            id: step.id,
            order: step.order,
            step_type,
            name: step.name,
            description: step.description,
            payload,
        }
    }
}
