//! Typed response parser.
//!
//! Model replies drive fan-out through one of two shapes:
//! - the typed envelope `{"type": "url" | "id", "values": [...]}`
//! - a bare array, whose kind is inferred from its first element
//!
//! Both are accepted so prompts written for either convention keep working.

use llm_provider::strip_code_fence;
use serde_json::Value;
use tenderscout_core_types::{TypedValues, ValueKind};

/// Decode `raw` into typed values, or `None` when it matches neither shape.
pub fn parse_typed_response(raw: &str) -> Option<TypedValues> {
    let payload = strip_code_fence(raw);
    match serde_json::from_str::<Value>(payload).ok()? {
        Value::Object(object) => {
            let kind = object
                .get("type")
                .and_then(Value::as_str)
                .and_then(ValueKind::from_tag)?;
            let values = object.get("values")?;
            let values = values
                .as_array()
                .map(|items| coerce_all(items))
                .unwrap_or_default();
            Some(TypedValues::new(kind, values))
        }
        Value::Array(items) => {
            let values = coerce_all(&items);
            let kind = values
                .first()
                .map(|first| infer_kind(first))
                .unwrap_or(ValueKind::Id);
            Some(TypedValues::new(kind, values))
        }
        _ => None,
    }
}

/// `url` when the value carries a scheme marker or a path separator, `id` otherwise.
pub fn infer_kind(value: &str) -> ValueKind {
    if value.contains("://") || value.starts_with("http") || value.contains('/') {
        ValueKind::Url
    } else {
        ValueKind::Id
    }
}

fn coerce_all(items: &[Value]) -> Vec<String> {
    items.iter().filter_map(coerce).collect()
}

fn coerce(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
