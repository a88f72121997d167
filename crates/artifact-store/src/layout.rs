//! Artifact path convention.

use chrono::{DateTime, Utc};

/// Name used when the browser reports no suggested filename.
pub const DEFAULT_DOWNLOAD_NAME: &str = "downloaded-file.xlsx";

/// `{unix_millis}-{filename}`, falling back to [`DEFAULT_DOWNLOAD_NAME`].
pub fn artifact_file_name(at: DateTime<Utc>, suggested: Option<&str>) -> String {
    let name = suggested
        .map(|name| sanitize_segment(name.rsplit(['/', '\\']).next().unwrap_or(name)))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());
    format!("{}-{}", at.timestamp_millis(), name)
}

/// `{configuration_id}/{step_id}/{file_name}`.
pub fn artifact_path(configuration_id: &str, step_id: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        sanitize_segment(configuration_id),
        sanitize_segment(step_id),
        file_name
    )
}

/// Strip characters that would change the meaning of a path segment.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    if cleaned == "." || cleaned == ".." {
        return "_".to_string();
    }
    cleaned
}
