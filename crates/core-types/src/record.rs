//! Procurement records produced from model output.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    #[default]
    New,
    Reviewing,
    Submitted,
    Won,
    Lost,
    Archived,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::New => "new",
            OpportunityStatus::Reviewing => "reviewing",
            OpportunityStatus::Submitted => "submitted",
            OpportunityStatus::Won => "won",
            OpportunityStatus::Lost => "lost",
            OpportunityStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tender or contract notice discovered during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub configuration_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub status: OpportunityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Opportunity {
    /// Fresh record with `status = new`; remaining fields are filled by the extractor.
    pub fn new(configuration_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            configuration_id: configuration_id.into(),
            title: title.into(),
            description: String::new(),
            source: String::new(),
            source_url: None,
            reference_id: None,
            organization: None,
            status: OpportunityStatus::New,
            published_at: None,
            deadline_at: None,
            estimated_value: None,
            currency: None,
            location: None,
            categories: Vec::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Market-level observation (price trends, buyer behaviour, ...) reported alongside opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsight {
    pub id: Uuid,
    pub configuration_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MarketInsight {
    pub fn new(configuration_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            configuration_id: configuration_id.into(),
            title: title.into(),
            summary: String::new(),
            source: String::new(),
            insight_type: None,
            published_at: None,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum CreatedRecord {
    Opportunity(Opportunity),
    MarketInsight(MarketInsight),
}

impl CreatedRecord {
    pub fn title(&self) -> &str {
        match self {
            CreatedRecord::Opportunity(record) => &record.title,
            CreatedRecord::MarketInsight(record) => &record.title,
        }
    }

    pub fn as_opportunity(&self) -> Option<&Opportunity> {
        match self {
            CreatedRecord::Opportunity(record) => Some(record),
            CreatedRecord::MarketInsight(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_opportunity_starts_as_new() {
        let record = Opportunity::new("cfg-1", "Road maintenance");
        assert_eq!(record.status, OpportunityStatus::New);

        let encoded = serde_json::to_value(CreatedRecord::Opportunity(record)).expect("encode");
        assert_eq!(encoded["record_type"], "opportunity");
        assert_eq!(encoded["status"], "new");
    }
}
