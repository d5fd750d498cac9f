use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::Timelike;

use super::model::{CellValue, SheetOrigin, Table};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Extensions handled by calamine.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Every extension `load_file` accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

/// Lower-cased file extension, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Whether the file can carry cell fills that `styles` knows how to read.
pub fn is_ooxml(path: &Path) -> bool {
    matches!(extension_of(path).as_str(), "xlsx" | "xlsm")
}

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first row of the used
///   range is the header; `sheet` picks the worksheet (first one if `None`)
/// * `.csv` – header row plus records; `sheet` is ignored
pub fn load_file(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    let ext = extension_of(path);
    match ext.as_str() {
        "csv" => load_csv(path),
        e if WORKBOOK_EXTENSIONS.contains(&e) => load_workbook(path, sheet),
        other => Err(LoadError::UnsupportedExtension(other.to_string())),
    }
}

/// Worksheet names of a workbook, in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, LoadError> {
    let ext = extension_of(path);
    if !WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        return Err(LoadError::UnsupportedExtension(ext));
    }
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names())
}

/// Resolve the sheet that `load_file` would read for the given request.
pub fn resolve_sheet_name(names: &[String], requested: Option<&str>) -> Result<String, LoadError> {
    match requested {
        Some(name) => names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| LoadError::SheetNotFound(name.to_string())),
        None => names.first().cloned().ok_or(LoadError::NoSheets),
    }
}

// ---------------------------------------------------------------------------
// Workbook loader
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let sheet_name = resolve_sheet_name(&names, sheet)?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let table = table_from_range(&range).ok_or(LoadError::EmptySheet(sheet_name.clone()))?;

    log::debug!(
        "Read sheet '{sheet_name}': {} rows x {} columns, origin {:?}",
        table.len(),
        table.columns.len(),
        table.origin
    );
    Ok(table)
}

/// Turn a used range into a table. `None` when there is no header row.
fn table_from_range(range: &Range<Data>) -> Option<Table> {
    let (start_row, start_col) = range.start()?;
    let mut rows = range.rows();
    let header = rows.next()?;

    let columns = header_names(header.iter().map(|cell| cell.as_string()));
    let body = rows
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();

    Some(Table::new(columns, body).with_origin(SheetOrigin {
        row: start_row,
        col: start_col,
    }))
}

/// Convert a calamine cell into a table value.
fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match dt.as_datetime() {
                // Time-of-day cells sit on the Excel epoch day.
                Some(ndt) if dt.is_duration() || (0.0..1.0).contains(&serial) => {
                    CellValue::String(ndt.format("%H:%M:%S").to_string())
                }
                Some(ndt) if ndt.time().num_seconds_from_midnight() == 0 => {
                    CellValue::Date(ndt.format("%Y-%m-%d").to_string())
                }
                Some(ndt) => CellValue::Date(ndt.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => CellValue::Float(serial),
            }
        }
        Data::DateTimeIso(s) => CellValue::Date(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

/// Header cells to unique column names: blanks become `Unnamed: N`,
/// repeats get `.1`, `.2`, … suffixes.
fn header_names<I>(cells: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    cells
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell.map(|s| s.trim().to_string()) {
                Some(s) if !s.is_empty() => s,
                _ => format!("Unnamed: {idx}"),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base.clone()
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per row.
/// Used for exported views, so cell typing only accepts text whose
/// rendering comes back unchanged.
fn load_csv(path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = header_names(reader.headers()?.iter().map(|h| Some(h.to_string())));

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(Table::new(columns, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        if i.to_string() == s {
            return CellValue::Integer(i);
        }
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() && format!("{f:?}") == s {
            return CellValue::Float(f);
        }
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}
