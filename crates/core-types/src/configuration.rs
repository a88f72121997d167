use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::StepDefinition;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("configuration {id} has no steps")]
    Empty { id: String },

    #[error("configuration {id}: expected step order {expected}, found {found}")]
    NonContiguousOrder { id: String, expected: u32, found: u32 },
}

/// Stored crawl configuration, as returned by a configuration loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default navigation target for `goto` actions without an explicit value.
    pub target_url: String,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl Configuration {
    pub fn new(id: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            target_url: target_url.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Sort steps by `order` and check they run 1, 2, 3, ... without gaps.
    pub fn into_ordered(mut self) -> Result<Self, ConfigurationError> {
        if self.steps.is_empty() {
            return Err(ConfigurationError::Empty { id: self.id });
        }
        self.steps.sort_by_key(|step| step.order);
        for (index, step) in self.steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.order != expected {
                return Err(ConfigurationError::NonContiguousOrder {
                    id: self.id.clone(),
                    expected,
                    found: step.order,
                });
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{PromptSpec, StepKind};

    fn prompt_step(order: u32) -> StepDefinition {
        StepDefinition::new(order, format!("step {order}"), StepKind::AiPrompt(PromptSpec::new("x")))
    }

    #[test]
    fn steps_are_sorted_by_order() {
        let config = Configuration::new("cfg", "https://example.org")
            .with_step(prompt_step(2))
            .with_step(prompt_step(1))
            .into_ordered()
            .expect("ordered");
        let orders: Vec<u32> = config.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn gaps_are_rejected() {
        let err = Configuration::new("cfg", "https://example.org")
            .with_step(prompt_step(1))
            .with_step(prompt_step(3))
            .into_ordered()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NonContiguousOrder {
                id: "cfg".into(),
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn empty_configuration_is_rejected() {
        assert!(Configuration::new("cfg", "https://example.org")
            .into_ordered()
            .is_err());
    }
}
