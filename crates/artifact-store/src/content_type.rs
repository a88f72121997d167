//! Content-type inference by file extension.

const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type for `filename`, decided by its (case-insensitive) extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return OCTET_STREAM,
    };

    match extension.as_str() {
        "pdf" => "application/pdf",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => OCTET_STREAM,
    }
}
