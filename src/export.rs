use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::data::model::Table;
use crate::error::ExportError;

/// Serialize the header plus the given rows (in the given order) as CSV.
pub fn to_csv(table: &Table, indices: &[usize]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for &i in indices {
        if let Some(row) = table.rows.get(i) {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

/// Write the visible rows to a CSV file, replacing it if present.
pub fn write_csv(path: &Path, table: &Table, indices: &[usize]) -> Result<(), ExportError> {
    let csv = to_csv(table, indices)?;
    std::fs::write(path, csv)?;
    Ok(())
}

/// `data:` URI carrying the CSV payload base64-encoded.
pub fn data_uri(csv: &str) -> String {
    format!("data:file/csv;base64,{}", STANDARD.encode(csv.as_bytes()))
}

/// HTML download link for a CSV export.
pub fn download_link(csv: &str, filename: &str, text: &str) -> String {
    format!(
        r#"<a href="{}" download="{}">📥 {}</a>"#,
        data_uri(csv),
        escape_attr(filename),
        escape_text(text)
    )
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
