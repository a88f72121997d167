//! `{{field}}` placeholder rendering against one model-produced JSON object.

use serde_json::Value;

/// Replace every `{{field}}` in `template` with the matching value of `item`.
///
/// Unknown fields render as empty strings; text outside placeholders is kept.
pub fn render(template: &str, item: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let field = after[..end].trim();
                if let Some(value) = lookup(item, field) {
                    out.push_str(&scalar_text(value));
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve `field`: direct key first, then with `_` read as `.` (literal key, then nested path).
pub fn lookup<'a>(item: &'a Value, field: &str) -> Option<&'a Value> {
    if field.is_empty() {
        return None;
    }
    if let Some(value) = item.get(field).filter(|value| !value.is_null()) {
        return Some(value);
    }
    let dotted = field.replace('_', ".");
    if let Some(value) = item.get(dotted.as_str()).filter(|value| !value.is_null()) {
        return Some(value);
    }
    dotted
        .split('.')
        .try_fold(item, |current, segment| current.get(segment))
        .filter(|value| !value.is_null())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
