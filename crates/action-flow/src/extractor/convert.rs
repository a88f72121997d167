//! Best-effort conversions from rendered template text to record field types.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Parse a date in one of the formats models commonly emit; anything else is absent.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Keep digits, `.` and `-`, then parse. `"€1,250.50"` becomes `1250.5`.
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// JSON array text, or a list separated by `,` `;` or `|`.
pub fn parse_list(raw: &str) -> Vec<String> {
    let text = raw.trim();
    if text.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(text) {
            return items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|item| !item.is_empty())
                .collect();
        }
    }
    text.split(&[',', ';', '|'][..])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        for raw in [
            "2024-03-05",
            "05/03/2024",
            "2024/03/05",
            "05-03-2024",
            "March 5, 2024",
            "Mar 5, 2024",
            "2024-03-05T10:00:00Z",
        ] {
            assert_eq!(parse_date(raw), expected, "{raw}");
        }
    }

    #[test]
    fn invalid_dates_are_absent() {
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date("2024-02-31"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn money_strips_symbols_and_separators() {
        assert_eq!(parse_money("€1,250.50"), Some(1250.5));
        assert_eq!(parse_money("USD 300"), Some(300.0));
        assert_eq!(parse_money("-12"), Some(-12.0));
        assert_eq!(parse_money("n/a"), None);
        assert_eq!(parse_money("1.2.3"), None);
    }

    #[test]
    fn lists_accept_json_or_separators() {
        assert_eq!(parse_list(r#"["roads", "lighting"]"#), vec!["roads", "lighting"]);
        assert_eq!(parse_list("roads; lighting | parks,"), vec!["roads", "lighting", "parks"]);
        assert!(parse_list("  ").is_empty());
    }
}
