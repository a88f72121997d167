//! Entity extractor: turns the latest model output into opportunity and market-insight records.
//!
//! Accepted payloads:
//! - `{"opportunities": [...], "marketInsights": [...]}` (also `market_insights`)
//! - a bare array of opportunity objects
//! - a single opportunity object
//!
//! Output that does not decode still yields one opportunity holding the raw text, so a
//! crawl is never lost to a badly formatted reply.

pub mod convert;
pub mod template;

use llm_provider::{extract_json_payload, strip_code_fence};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tenderscout_core_types::{
    Configuration, CreatedRecord, MarketInsight, Opportunity, RecordTemplate, StepDefinition,
    StepResult,
};
use tracing::{debug, info, warn};

use crate::{errors::EngineError, ports::RecordSink};
use convert::{non_empty, parse_date, parse_list, parse_money};

/// Characters of raw model output kept in the fallback record.
pub const FALLBACK_DESCRIPTION_CHARS: usize = 500;

pub const UNTITLED_OPPORTUNITY: &str = "Untitled opportunity";
pub const UNTITLED_INSIGHT: &str = "Untitled market insight";

const DEFAULT_SOURCE: &str = "ai_extraction";

/// Model payload split by record kind, before templates are applied.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedItems {
    pub opportunities: Vec<Value>,
    pub market_insights: Vec<Value>,
}

impl ExtractedItems {
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty() && self.market_insights.is_empty()
    }
}

/// Decode the JSON payload embedded in `raw`, or `None` when there is none.
///
/// A payload found inside prose only counts when it yields at least one non-empty object,
/// so stray brackets such as `[2024]` or `{}` do not swallow the reply. A reply that is
/// itself JSON may decode to zero records (`[]`, `{"opportunities": []}`), but not when
/// every element it carried was discarded.
pub fn decode_payload(raw: &str) -> Option<ExtractedItems> {
    let body = strip_code_fence(raw);
    let standalone = body.starts_with('{') || body.starts_with('[');
    let payload = extract_json_payload(raw)?;

    let mut candidates = 0usize;
    let items = match serde_json::from_str::<Value>(&payload).ok()? {
        Value::Array(items) => {
            candidates += items.len();
            ExtractedItems {
                opportunities: objects(items),
                market_insights: Vec::new(),
            }
        }
        Value::Object(mut object) => {
            let opportunities = object.remove("opportunities");
            let insights = object
                .remove("marketInsights")
                .or_else(|| object.remove("market_insights"));
            if opportunities.is_none() && insights.is_none() {
                if object.is_empty() {
                    return None;
                }
                return Some(ExtractedItems {
                    opportunities: vec![Value::Object(object)],
                    market_insights: Vec::new(),
                });
            }
            ExtractedItems {
                opportunities: opportunities
                    .map(|value| array_objects(value, &mut candidates))
                    .unwrap_or_default(),
                market_insights: insights
                    .map(|value| array_objects(value, &mut candidates))
                    .unwrap_or_default(),
            }
        }
        _ => return None,
    };

    if items.is_empty() && (!standalone || candidates > 0) {
        return None;
    }
    Some(items)
}

fn array_objects(value: Value, candidates: &mut usize) -> Vec<Value> {
    match value {
        Value::Array(items) => {
            *candidates += items.len();
            objects(items)
        }
        Value::Object(_) => {
            *candidates += 1;
            objects(vec![value])
        }
        Value::Null => Vec::new(),
        _ => {
            *candidates += 1;
            Vec::new()
        }
    }
}

fn objects(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| matches!(item, Value::Object(fields) if !fields.is_empty()))
        .collect()
}

pub struct EntityExtractor {
    sink: Arc<dyn RecordSink>,
}

impl EntityExtractor {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }

    /// Build records from the most recent model output in `prior` and insert them one by one.
    ///
    /// Never fails: undecodable output falls back to a single opportunity and failed inserts
    /// are logged and left out of the result.
    pub async fn extract(
        &self,
        step: &StepDefinition,
        template: &RecordTemplate,
        configuration: &Configuration,
        prior: &[StepResult],
    ) -> StepResult {
        let Some(raw) = prior
            .iter()
            .rev()
            .find_map(|result| result.raw_model_output.as_deref())
        else {
            warn!(step = step.order, "No model output to extract records from");
            return StepResult::succeeded();
        };

        let records = build_records(step, template, configuration, raw);
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            match self.sink.insert(&record).await {
                Ok(()) => created.push(record),
                Err(err) => {
                    let error = EngineError::RecordInsertFailed {
                        title: record.title().to_string(),
                        reason: err.to_string(),
                    };
                    warn!(step = step.order, %error, "Skipping record");
                }
            }
        }

        info!(step = step.order, created = created.len(), "Records created");
        StepResult::succeeded().with_records(created)
    }
}

/// Apply the templates to the decoded payload, or build the fallback opportunity.
pub fn build_records(
    step: &StepDefinition,
    template: &RecordTemplate,
    configuration: &Configuration,
    raw: &str,
) -> Vec<CreatedRecord> {
    let source = default_source(template, configuration);
    let Some(items) = decode_payload(raw) else {
        let error = EngineError::ModelParseFailure(format!(
            "no JSON payload in {} chars of model output",
            raw.len()
        ));
        warn!(step = step.order, %error, "Falling back to a single raw-text opportunity");
        return vec![CreatedRecord::Opportunity(fallback_opportunity(
            step,
            configuration,
            &source,
            raw,
        ))];
    };

    debug!(
        opportunities = items.opportunities.len(),
        market_insights = items.market_insights.len(),
        "Decoded model payload"
    );

    let opportunities = items
        .opportunities
        .iter()
        .map(|item| build_opportunity(&template.opportunity, configuration, &source, item))
        .map(CreatedRecord::Opportunity);
    let insights = items
        .market_insights
        .iter()
        .map(|item| build_insight(&template.market_insight, configuration, &source, item))
        .map(CreatedRecord::MarketInsight);
    opportunities.chain(insights).collect()
}

fn default_source(template: &RecordTemplate, configuration: &Configuration) -> String {
    template
        .source
        .clone()
        .or_else(|| configuration.name.clone())
        .and_then(non_empty)
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
}

/// Field renderer: the configured template, or `{{field}}` when none is configured.
struct Fields<'a> {
    templates: &'a BTreeMap<String, String>,
    item: &'a Value,
}

impl Fields<'_> {
    fn text(&self, field: &str) -> String {
        let rendered = match self.templates.get(field) {
            Some(template) => template::render(template, self.item),
            None => template::render(&format!("{{{{{field}}}}}"), self.item),
        };
        rendered.trim().to_string()
    }

    fn optional(&self, field: &str) -> Option<String> {
        non_empty(self.text(field))
    }
}

fn build_opportunity(
    templates: &BTreeMap<String, String>,
    configuration: &Configuration,
    source: &str,
    item: &Value,
) -> Opportunity {
    let fields = Fields { templates, item };
    let title = fields
        .optional("title")
        .unwrap_or_else(|| UNTITLED_OPPORTUNITY.to_string());

    let mut opportunity = Opportunity::new(&configuration.id, title);
    opportunity.description = fields.text("description");
    opportunity.source = fields.optional("source").unwrap_or_else(|| source.to_string());
    opportunity.source_url = fields.optional("source_url");
    opportunity.reference_id = fields.optional("reference_id");
    opportunity.organization = fields.optional("organization");
    opportunity.published_at = parse_date(&fields.text("published_at"));
    opportunity.deadline_at = parse_date(&fields.text("deadline_at"));
    opportunity.estimated_value = parse_money(&fields.text("estimated_value"));
    opportunity.currency = fields.optional("currency");
    opportunity.location = fields.optional("location");
    opportunity.categories = parse_list(&fields.text("categories"));
    opportunity.tags = parse_list(&fields.text("tags"));
    opportunity
}

fn build_insight(
    templates: &BTreeMap<String, String>,
    configuration: &Configuration,
    source: &str,
    item: &Value,
) -> MarketInsight {
    let fields = Fields { templates, item };
    let title = fields
        .optional("title")
        .unwrap_or_else(|| UNTITLED_INSIGHT.to_string());

    let mut insight = MarketInsight::new(&configuration.id, title);
    insight.summary = fields.text("summary");
    insight.source = fields.optional("source").unwrap_or_else(|| source.to_string());
    insight.insight_type = fields.optional("insight_type");
    insight.published_at = parse_date(&fields.text("published_at"));
    insight.tags = parse_list(&fields.text("tags"));
    insight
}

fn fallback_opportunity(
    step: &StepDefinition,
    configuration: &Configuration,
    source: &str,
    raw: &str,
) -> Opportunity {
    let title = match step.name.trim() {
        "" => UNTITLED_OPPORTUNITY.to_string(),
        name => format!("{name} (unstructured result)"),
    };
    let mut opportunity = Opportunity::new(&configuration.id, title);
    opportunity.description = raw.trim().chars().take(FALLBACK_DESCRIPTION_CHARS).collect();
    opportunity.source = source.to_string();
    opportunity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::InMemoryRecordSink;
    use chrono::NaiveDate;
    use tenderscout_core_types::{OpportunityStatus, StepKind};

    fn configuration() -> Configuration {
        Configuration::new("cfg-7", "https://tenders.example")
    }

    fn create_step(template: RecordTemplate) -> StepDefinition {
        StepDefinition::new(3, "Save tenders", StepKind::CreateRecord(template))
    }

    fn prior(raw: &str) -> Vec<StepResult> {
        vec![
            StepResult::succeeded().with_model_output("older", None),
            StepResult::succeeded().with_model_output(raw, None),
        ]
    }

    #[test]
    fn decodes_all_payload_shapes() {
        let both = decode_payload(
            r#"{"opportunities":[{"title":"A"}],"marketInsights":[{"title":"B"}]}"#,
        )
        .unwrap();
        assert_eq!((both.opportunities.len(), both.market_insights.len()), (1, 1));

        let snake = decode_payload(r#"{"market_insights":[{"title":"B"},"junk"]}"#).unwrap();
        assert_eq!(snake.market_insights.len(), 1);

        let array = decode_payload("Here you go:\n```json\n[{\"title\":\"A\"},{\"title\":\"C\"}]\n```").unwrap();
        assert_eq!(array.opportunities.len(), 2);

        let single = decode_payload(r#"{"title":"Only one"}"#).unwrap();
        assert_eq!(single.opportunities, vec![serde_json::json!({"title": "Only one"})]);

        assert!(decode_payload("no json at all").is_none());
    }

    #[test]
    fn templates_drive_field_mapping() {
        let mut template = RecordTemplate::default();
        template
            .opportunity
            .insert("title".into(), "{{name}} - {{buyer.name}}".into());
        template
            .opportunity
            .insert("estimated_value".into(), "{{budget}}".into());
        let raw = r#"{"opportunities":[{
            "name":"Street lighting","buyer":{"name":"Lyon"},
            "budget":"€12,500","deadline_at":"15/04/2025","tags":"lighting; energy",
            "source_url":"https://tenders.example/17"
        }]}"#;

        let records = build_records(&create_step(template.clone()), &template, &configuration(), raw);
        let opportunity = records[0].as_opportunity().unwrap();
        assert_eq!(opportunity.title, "Street lighting - Lyon");
        assert_eq!(opportunity.estimated_value, Some(12500.0));
        assert_eq!(opportunity.deadline_at, NaiveDate::from_ymd_opt(2025, 4, 15));
        assert_eq!(opportunity.tags, vec!["lighting", "energy"]);
        assert_eq!(opportunity.source_url.as_deref(), Some("https://tenders.example/17"));
        assert_eq!(opportunity.source, DEFAULT_SOURCE);
        assert_eq!(opportunity.status, OpportunityStatus::New);
    }

    #[test]
    fn empty_titles_get_a_placeholder() {
        let template = RecordTemplate::default();
        let records = build_records(
            &create_step(template.clone()),
            &template,
            &configuration(),
            r#"[{"description":"no title here","published_at":"not a date"}]"#,
        );
        let opportunity = records[0].as_opportunity().unwrap();
        assert_eq!(opportunity.title, UNTITLED_OPPORTUNITY);
        assert_eq!(opportunity.published_at, None);
    }

    #[tokio::test]
    async fn prose_yields_one_truncated_opportunity() {
        let prose = "No structured data. ".repeat(60);
        let sink = Arc::new(InMemoryRecordSink::new());
        let template = RecordTemplate::default();
        let result = EntityExtractor::new(sink.clone())
            .extract(&create_step(template.clone()), &template, &configuration(), &prior(&prose))
            .await;

        assert!(result.success);
        assert_eq!(result.created_records.len(), 1);
        let opportunity = result.created_records[0].as_opportunity().unwrap();
        assert_eq!(opportunity.description.chars().count(), FALLBACK_DESCRIPTION_CHARS);
        assert!(opportunity.title.starts_with("Save tenders"));
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn stray_brackets_in_prose_still_fall_back() {
        let template = RecordTemplate::default();
        let step = create_step(template.clone());
        for prose in [
            "No open tenders were found for [2024]; the portal was empty.",
            "See note [1]: nothing published this week.",
            "The template placeholder {} was not filled in by the portal.",
        ] {
            let sink = Arc::new(InMemoryRecordSink::new());
            let result = EntityExtractor::new(sink.clone())
                .extract(&step, &template, &configuration(), &prior(prose))
                .await;

            assert_eq!(result.created_records.len(), 1, "{prose}");
            let opportunity = result.created_records[0].as_opportunity().unwrap();
            assert_eq!(opportunity.description, prose);
            assert_eq!(sink.records().len(), 1);
        }
    }

    #[test]
    fn standalone_json_without_objects() {
        assert!(decode_payload("[]").unwrap().is_empty());
        assert!(decode_payload(r#"{"opportunities": []}"#).unwrap().is_empty());
        assert!(decode_payload("[2024]").is_none());
        assert!(decode_payload("{}").is_none());
        let kept = decode_payload(r#"[{}, {"title": "Kept"}]"#).unwrap();
        assert_eq!(kept.opportunities.len(), 1);
    }

    #[tokio::test]
    async fn failed_inserts_do_not_abort_the_batch() {
        let sink = Arc::new(InMemoryRecordSink::new().reject_title("Broken"));
        let template = RecordTemplate::default();
        let raw = r#"{"opportunities":[{"title":"Broken"},{"title":"Fine"}]}"#;
        let result = EntityExtractor::new(sink.clone())
            .extract(&create_step(template.clone()), &template, &configuration(), &prior(raw))
            .await;

        assert!(result.success);
        let titles: Vec<&str> = result.created_records.iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["Fine"]);
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn missing_model_output_creates_nothing() {
        let sink = Arc::new(InMemoryRecordSink::new());
        let template = RecordTemplate::default();
        let step = create_step(template.clone());
        let configuration = configuration();
        let extractor = EntityExtractor::new(sink);
        let result =
            tokio_test::block_on(extractor.extract(&step, &template, &configuration, &[]));
        assert!(result.success);
        assert!(result.created_records.is_empty());
    }
}
