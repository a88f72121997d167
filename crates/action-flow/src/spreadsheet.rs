//! Spreadsheet artifacts are embedded in prompts as CSV text.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

pub fn is_spreadsheet(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Convert the first sheet of a workbook to CSV.
pub fn first_sheet_to_csv(bytes: Vec<u8>) -> Result<String, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| format!("unreadable workbook: {err}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no sheets".to_string())?
        .map_err(|err| format!("unreadable sheet: {err}"))?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        writer
            .write_record(&cells)
            .map_err(|err| format!("csv encoding failed: {err}"))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| format!("csv encoding failed: {err}"))?;
    String::from_utf8(bytes).map_err(|err| format!("csv encoding failed: {err}"))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}
