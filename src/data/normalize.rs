use std::sync::LazyLock;

use regex::Regex;

use super::model::{CellValue, Table};
use crate::config::DatasetProfile;
use crate::error::FormatError;

/// `h:mm:ss` anywhere in a string; seconds are dropped on load.
static TIME_WITH_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2}):\d{2}").expect("valid time regex"));

/// What load-time normalization did to a table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizeReport {
    /// The time column, if the table had one.
    pub time_column: Option<String>,
    /// Columns rewritten with decimal commas.
    pub formatted: Vec<String>,
    /// Columns left untouched because a value would not coerce.
    pub skipped: Vec<(String, FormatError)>,
}

/// Apply per-column normalization in place:
///
/// * the profile's time column becomes text with `h:mm:ss` shortened to `h:mm`
/// * typed-number columns and the profile's numeric columns are rendered
///   with a decimal comma; a column that fails coercion is left as it was
pub fn normalize(table: &mut Table, profile: &DatasetProfile) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let time_col = table.column_index(&profile.time_column);

    if let Some(col) = time_col {
        for row in &mut table.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = strip_seconds(cell);
            }
        }
        report.time_column = Some(profile.time_column.clone());
    }

    for col in 0..table.columns.len() {
        if Some(col) == time_col {
            continue;
        }
        if !(is_numeric_column(table, col) || profile.declares_numeric(table, col)) {
            continue;
        }
        let name = table.columns[col].clone();
        let formatted: Result<Vec<CellValue>, FormatError> = table
            .column_values(col)
            .map(format_decimal_comma)
            .collect();
        match formatted {
            Ok(values) => {
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
                report.formatted.push(name);
            }
            Err(e) => {
                log::warn!("Column '{name}' left unformatted: {e}");
                report.skipped.push((name, e));
            }
        }
    }

    table.rebuild_index();
    report
}

/// Whether every non-null cell of a column is a typed number (and there is
/// at least one).
pub fn is_numeric_column(table: &Table, col: usize) -> bool {
    let mut seen = false;
    for value in table.column_values(col).filter(|v| !v.is_null()) {
        if !value.is_numeric() {
            return false;
        }
        seen = true;
    }
    seen
}

fn strip_seconds(value: &CellValue) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }
    let text = value.to_string();
    CellValue::String(TIME_WITH_SECONDS.replace_all(&text, "$1:$2").into_owned())
}

/// Render a number with a decimal comma. Text that already reads as a
/// number is kept as-is; any other non-null value is an error.
pub fn format_decimal_comma(value: &CellValue) -> Result<CellValue, FormatError> {
    match value {
        CellValue::Null => Ok(CellValue::Null),
        CellValue::Integer(i) => Ok(CellValue::String(i.to_string())),
        CellValue::Float(f) => Ok(CellValue::String(format!("{f:?}").replace('.', ","))),
        CellValue::String(s) if parse_decimal(s).is_some() => Ok(value.clone()),
        other => Err(FormatError(other.to_string())),
    }
}

/// Parse a number written with either a decimal comma or a decimal point.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let value: f64 = text.trim().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Numeric view of any cell, accepting decimal-comma text.
pub fn coerce_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Integer(_) | CellValue::Float(_) => value.as_f64().filter(|f| f.is_finite()),
        CellValue::String(s) => parse_decimal(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NumericColumns, ViewerConfig};

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn profile(numeric: NumericColumns) -> DatasetProfile {
        let mut p = ViewerConfig::default().datasets[0].clone();
        p.numeric_columns = numeric;
        p
    }

    #[test]
    fn time_column_drops_seconds() {
        let mut table = Table::new(
            vec!["ORA".into()],
            vec![
                vec![s("14:30:00")],
                vec![s("9:05:59 - 10:00:00")],
                vec![s("n/a")],
                vec![CellValue::Null],
            ],
        );
        let report = normalize(&mut table, &profile(NumericColumns::Detect));
        assert_eq!(report.time_column.as_deref(), Some("ORA"));
        assert_eq!(table.cell(0, 0), Some(&s("14:30")));
        assert_eq!(table.cell(1, 0), Some(&s("9:05 - 10:00")));
        assert_eq!(table.cell(2, 0), Some(&s("n/a")));
        assert_eq!(table.cell(3, 0), Some(&CellValue::Null));
    }

    #[test]
    fn numeric_columns_get_decimal_commas() {
        let mut table = Table::new(
            vec!["QUOTA".into(), "SQUADRA".into()],
            vec![
                vec![CellValue::Float(1.85), s("Roma")],
                vec![CellValue::Integer(3), s("Lazio")],
                vec![CellValue::Float(2.0), CellValue::Null],
            ],
        );
        let report = normalize(&mut table, &profile(NumericColumns::Detect));
        assert_eq!(report.formatted, vec!["QUOTA"]);
        assert_eq!(table.cell(0, 0), Some(&s("1,85")));
        assert_eq!(table.cell(1, 0), Some(&s("3")));
        assert_eq!(table.cell(2, 0), Some(&s("2,0")));
        assert_eq!(table.cell(0, 1), Some(&s("Roma")));
    }

    #[test]
    fn declared_column_with_text_is_left_alone() {
        let mut table = Table::new(
            vec!["CASA".into(), "FUORI".into()],
            vec![
                vec![CellValue::Float(1.5), s("2,10")],
                vec![s("sospesa"), CellValue::Float(3.25)],
            ],
        );
        let declared = NumericColumns::Named(vec!["CASA".into(), "FUORI".into()]);
        let report = normalize(&mut table, &profile(declared));
        assert_eq!(report.formatted, vec!["FUORI"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "CASA");
        assert_eq!(table.cell(0, 0), Some(&CellValue::Float(1.5)));
        assert_eq!(table.cell(1, 1), Some(&s("3,25")));
        assert_eq!(table.cell(0, 1), Some(&s("2,10")));
    }

    #[test]
    fn coercion_accepts_both_separators() {
        assert_eq!(coerce_number(&s("1,85")), Some(1.85));
        assert_eq!(coerce_number(&s(" 2.5 ")), Some(2.5));
        assert_eq!(coerce_number(&CellValue::Integer(4)), Some(4.0));
        assert_eq!(coerce_number(&s("1.234,5")), None);
        assert_eq!(coerce_number(&s("nan")), None);
        assert_eq!(coerce_number(&CellValue::Null), None);
    }
}
