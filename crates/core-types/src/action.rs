//! Low-level browser instructions carried by automation steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of browser instruction.
///
/// Unrecognised kinds deserialize to [`ActionKind::Unknown`] so that a
/// single unsupported action does not make the whole configuration
/// unreadable; the executor logs and skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[serde(alias = "navigate")]
    Goto,
    Click,
    #[serde(alias = "fill")]
    Type,
    Select,
    Wait,
    BeginDownloadWait,
    PersistDownload,
    ExtractText,
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Goto => "goto",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Select => "select",
            ActionKind::Wait => "wait",
            ActionKind::BeginDownloadWait => "begin_download_wait",
            ActionKind::PersistDownload => "persist_download",
            ActionKind::ExtractText => "extract_text",
            ActionKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an action's `target` string should be resolved on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Accessible role + name (`"button:Search"` or just `"Search"`).
    Role,
    /// Checkbox nested inside a named option row of a multi-select list.
    #[serde(rename = "option")]
    OptionRow,
    /// Visible text content.
    Text,
    #[serde(alias = "selector")]
    Css,
    Xpath,
    /// The whole page; only meaningful for text extraction.
    Page,
    /// Anything else is treated as a raw selector.
    #[serde(other)]
    Other,
}

/// One instruction inside an automation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationAction {
    pub order: u32,

    #[serde(alias = "action_type")]
    pub action_kind: ActionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target_type")]
    pub target_kind: Option<TargetKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "wait_time")]
    pub wait_ms: Option<u64>,
}

impl AutomationAction {
    pub fn new(order: u32, action_kind: ActionKind) -> Self {
        Self {
            order,
            action_kind,
            target: None,
            target_kind: None,
            value: None,
            wait_ms: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>, kind: TargetKind) -> Self {
        self.target = Some(target.into());
        self.target_kind = Some(kind);
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.target = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Target string with surrounding whitespace removed; empty targets are `None`.
    pub fn trimmed_target(&self) -> Option<&str> {
        self.target
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty())
    }
}

impl fmt::Display for AutomationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.order, self.action_kind)?;
        if let Some(target) = &self.target {
            write!(f, " target={}", target)?;
        }
        Ok(())
    }
}
