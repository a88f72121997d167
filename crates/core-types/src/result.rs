use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::CreatedRecord;

/// Tag attached to the strings a step hands forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Url,
    Id,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Url => "url",
            ValueKind::Id => "id",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "url" => Some(ValueKind::Url),
            "id" => Some(ValueKind::Id),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed collection of strings produced by a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedValues {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ValueKind,
    #[serde(default)]
    pub values: Vec<String>,
}

impl TypedValues {
    pub fn new(kind: ValueKind, values: Vec<String>) -> Self {
        Self { kind, values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single fan-out value paired with its kind, substituted into one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutToken {
    pub kind: ValueKind,
    pub value: String,
}

impl FanOutToken {
    pub fn new(kind: ValueKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Replace the `{url}` and `{id}` placeholders in `template` with this token.
    pub fn substitute(&self, template: &str) -> String {
        template
            .replace("{url}", &self.value)
            .replace("{id}", &self.value)
    }
}

/// Outcome of executing one step (or one fan-out branch of a step).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_artifact_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_model_output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typed_values: Option<TypedValues>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted_text: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_records: Vec<CreatedRecord>,
}

impl StepResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_artifact(mut self, path: impl Into<String>) -> Self {
        self.stored_artifact_path = Some(path.into());
        self
    }

    pub fn with_model_output(mut self, raw: impl Into<String>, typed: Option<TypedValues>) -> Self {
        self.raw_model_output = Some(raw.into());
        self.typed_values = typed;
        self
    }

    pub fn with_extracted_text(mut self, text: Vec<String>) -> Self {
        self.extracted_text = text;
        self
    }

    pub fn with_records(mut self, records: Vec<CreatedRecord>) -> Self {
        self.created_records = records;
        self
    }

    /// Tokens the next step should fan out over; empty when there is nothing to multiply by.
    pub fn fan_out_tokens(&self) -> Vec<FanOutToken> {
        match &self.typed_values {
            Some(typed) => typed
                .values
                .iter()
                .map(|value| FanOutToken::new(typed.kind, value.clone()))
                .collect(),
            None => Vec::new(),
        }
    }
}
