//! Helpers for pulling JSON out of model replies.

const FENCE: &str = "```";

/// Strip surrounding whitespace and one enclosing Markdown code fence.
///
/// The fence's language tag (```` ```json ````) is dropped with it. Text that is not
/// wrapped in a fence is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) if !rest[..newline].contains(&['{', '['][..]) => &rest[newline + 1..],
        _ => rest.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_'),
    };
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Pull a JSON object or array out of a model reply.
///
/// Accepts a bare payload, a fenced block, or a payload embedded in prose.
/// Whichever of `{` / `[` opens first wins when the payload is embedded in prose.
pub fn extract_json_payload(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trim_symmetric(raw));
    }

    if let Some(block) = fenced_block(raw, &['{', '[']) {
        return Some(block);
    }

    let object = raw.find('{');
    let array = raw.find('[');
    match (object, array) {
        (Some(o), Some(a)) if a < o => balanced_from(raw, '[', ']'),
        (Some(_), _) => balanced_from(raw, '{', '}'),
        (None, Some(_)) => balanced_from(raw, '[', ']'),
        (None, None) => None,
    }
}

fn fenced_block(raw: &str, openers: &[char]) -> Option<String> {
    let start = raw.find(FENCE)?;
    let after_fence = &raw[start + FENCE.len()..];
    let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
    let end = after_lang.find(FENCE)?;
    let block = &after_lang[..end];
    block
        .contains(openers)
        .then(|| trim_symmetric(block))
}

fn balanced_from(raw: &str, open: char, close: char) -> Option<String> {
    let start = raw.find(open)?;
    let rest = &raw[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(trim_symmetric(&rest[..idx + ch.len_utf8()]));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here are the tenders:\n```json\n{\"opportunities\":[]}\n```";
        let extracted = extract_json_payload(input).expect("json");
        assert!(extracted.contains("\"opportunities\""));
        assert!(extracted.starts_with('{'));
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "text { \"foo\": 1 } more";
        let extracted = extract_json_payload(input).expect("json");
        assert_eq!(extracted, "{ \"foo\": 1 }");
    }

    #[test]
    fn returns_none_when_missing() {
        assert!(extract_json_payload("no braces").is_none());
        assert!(extract_json_payload("still nothing").is_none());
    }

    #[test]
    fn payload_prefers_first_opener() {
        let input = "Result: [{\"title\":\"Roads\"}] and {\"ignored\":true}";
        assert_eq!(
            extract_json_payload(input).as_deref(),
            Some("[{\"title\":\"Roads\"}]")
        );
    }

    #[test]
    fn braces_inside_strings_do_not_close() {
        let input = "see {\"title\":\"a } b\",\"n\":1} end";
        assert_eq!(
            extract_json_payload(input).as_deref(),
            Some("{\"title\":\"a } b\",\"n\":1}")
        );
    }

    #[test]
    fn strips_one_fence_with_language_tag() {
        assert_eq!(strip_code_fence("  ```json\n[\"1\"]\n```  "), "[\"1\"]");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("plain"), "plain");
    }
}
