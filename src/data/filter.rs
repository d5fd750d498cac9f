use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::model::{CellValue, Table};
use super::normalize::coerce_number;
use crate::config::DatasetProfile;

/// First `h:mm` (optionally followed by `:ss`) inside a cell's text.
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})(?::\d{2})?").expect("valid clock regex"));

/// Date layouts accepted by the date-range filter, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// The widget a column is filtered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Categorical,
    Text,
    NumericRange,
    TimeRange,
    DateRange,
}

/// Current control values of one column's filter.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    /// Keep rows whose value is selected; nothing selected keeps everything.
    Categorical { selected: BTreeSet<CellValue> },
    /// Case-insensitive substring; empty keeps everything.
    Text { needle: String },
    /// Inclusive bounds after decimal-comma coercion; non-numbers are dropped.
    NumericRange { min: f64, max: f64 },
    /// Raw `hh:mm` bounds as typed by the user.
    TimeRange { min: String, max: String },
    /// Inclusive calendar-date bounds.
    DateRange { from: NaiveDate, to: NaiveDate },
}

/// Per-column filter state: maps column_name → filter.
/// Columns without an entry are not constrained.
pub type FilterState = BTreeMap<String, ColumnFilter>;

impl ColumnFilter {
    pub fn kind(&self) -> FilterKind {
        match self {
            ColumnFilter::Categorical { .. } => FilterKind::Categorical,
            ColumnFilter::Text { .. } => FilterKind::Text,
            ColumnFilter::NumericRange { .. } => FilterKind::NumericRange,
            ColumnFilter::TimeRange { .. } => FilterKind::TimeRange,
            ColumnFilter::DateRange { .. } => FilterKind::DateRange,
        }
    }

    /// A filter of the given kind that keeps every row of the column.
    pub fn unconstrained(kind: FilterKind, table: &Table, col: usize) -> ColumnFilter {
        match kind {
            FilterKind::Categorical => ColumnFilter::Categorical {
                selected: BTreeSet::new(),
            },
            FilterKind::Text => ColumnFilter::Text {
                needle: String::new(),
            },
            FilterKind::NumericRange => {
                let (min, max) = numeric_bounds(table, col);
                ColumnFilter::NumericRange { min, max }
            }
            FilterKind::TimeRange => ColumnFilter::TimeRange {
                min: "00:00".to_string(),
                max: "23:59".to_string(),
            },
            FilterKind::DateRange => {
                let today = chrono::Local::now().date_naive();
                let (from, to) = date_bounds(table, col).unwrap_or((today, today));
                ColumnFilter::DateRange { from, to }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Time-of-day window
// ---------------------------------------------------------------------------

/// Parse a `hh:mm` bound into minutes since midnight. Extra `:ss` parts are
/// ignored; anything without two numeric parts is rejected.
pub fn parse_clock(text: &str) -> Option<u32> {
    let mut parts = text.split(':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute: u32 = parts.next()?.trim().parse().ok()?;
    hour.checked_mul(60)?.checked_add(minute)
}

/// Minutes since midnight of the first clock time found in a cell.
pub fn cell_minutes(value: &CellValue) -> Option<u32> {
    let text = value.to_string();
    let caps = CLOCK_TIME.captures(&text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    Some(hour * 60 + minute)
}

/// Inclusive `[min, max]` window in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub min: u32,
    pub max: u32,
}

impl TimeWindow {
    /// `None` when either bound is malformed; the filter is then skipped.
    pub fn parse(min: &str, max: &str) -> Option<TimeWindow> {
        Some(TimeWindow {
            min: parse_clock(min)?,
            max: parse_clock(max)?,
        })
    }

    /// Cells without a recognizable time are kept.
    pub fn retains(&self, value: &CellValue) -> bool {
        match cell_minutes(value) {
            Some(t) => self.min <= t && t <= self.max,
            None => true,
        }
    }
}

/// Keep the rows (by index) whose time column falls inside `[min, max]`.
/// Malformed bounds return `indices` unchanged.
pub fn filter_by_time(
    table: &Table,
    indices: &[usize],
    col: usize,
    min: &str,
    max: &str,
) -> Vec<usize> {
    let Some(window) = TimeWindow::parse(min, max) else {
        log::debug!("Time filter skipped: bounds '{min}'..'{max}' are not hh:mm");
        return indices.to_vec();
    };
    indices
        .iter()
        .copied()
        .filter(|&i| table.cell(i, col).is_none_or(|v| window.retains(v)))
        .collect()
}

// ---------------------------------------------------------------------------
// Dates and numbers
// ---------------------------------------------------------------------------

/// Calendar date of a cell: ISO dates (with or without a time part) and
/// day-first layouts.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    if value.is_null() {
        return None;
    }
    let text = value.to_string();
    let head = text.trim().split([' ', 'T']).next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}

/// Whether every non-null cell reads as a date (and there is at least one).
pub fn is_date_column(table: &Table, col: usize) -> bool {
    let mut seen = false;
    for value in table.column_values(col).filter(|v| !v.is_null()) {
        if parse_date(value).is_none() {
            return false;
        }
        seen = true;
    }
    seen
}

/// Earliest and latest date in a column.
pub fn date_bounds(table: &Table, col: usize) -> Option<(NaiveDate, NaiveDate)> {
    table.column_values(col).filter_map(parse_date).fold(None, |acc, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

/// Smallest and largest coercible number of a column, `(0, 100)` when the
/// column holds none.
pub fn numeric_bounds(table: &Table, col: usize) -> (f64, f64) {
    table
        .column_values(col)
        .filter_map(coerce_number)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 100.0))
}

// ---------------------------------------------------------------------------
// Filter-kind selection
// ---------------------------------------------------------------------------

/// The filter kinds offered for a column, preferred first.
///
/// * few distinct values → checkboxes only
/// * otherwise free text, plus a range when the column supports one: the
///   profile's time column, a declared numeric column with at least one
///   number, or a date column
pub fn available_kinds(
    table: &Table,
    col: usize,
    profile: &DatasetProfile,
    categorical_threshold: usize,
) -> Vec<FilterKind> {
    let distinct = table.unique_values(col).map_or(0, |u| u.len());
    if distinct <= categorical_threshold {
        return vec![FilterKind::Categorical];
    }

    let name = table.columns.get(col).map(String::as_str).unwrap_or_default();
    let range = if profile.is_time_column(name) {
        Some(FilterKind::TimeRange)
    } else if profile.declares_numeric(table, col)
        && table.column_values(col).any(|v| coerce_number(v).is_some())
    {
        Some(FilterKind::NumericRange)
    } else if is_date_column(table, col) {
        Some(FilterKind::DateRange)
    } else {
        None
    };

    std::iter::once(FilterKind::Text).chain(range).collect()
}

// ---------------------------------------------------------------------------
// Applying filters
// ---------------------------------------------------------------------------

/// A filter resolved against its column, ready for row tests.
enum Predicate<'a> {
    Categorical(&'a BTreeSet<CellValue>),
    Text(String),
    Numeric(f64, f64),
    Time(TimeWindow),
    Date(NaiveDate, NaiveDate),
}

impl<'a> Predicate<'a> {
    fn compile(filter: &'a ColumnFilter) -> Option<Predicate<'a>> {
        match filter {
            ColumnFilter::Categorical { selected } if selected.is_empty() => None,
            ColumnFilter::Categorical { selected } => Some(Predicate::Categorical(selected)),
            ColumnFilter::Text { needle } if needle.is_empty() => None,
            ColumnFilter::Text { needle } => Some(Predicate::Text(needle.to_lowercase())),
            ColumnFilter::NumericRange { min, max } => Some(Predicate::Numeric(*min, *max)),
            ColumnFilter::TimeRange { min, max } => {
                TimeWindow::parse(min, max).map(Predicate::Time)
            }
            ColumnFilter::DateRange { from, to } => Some(Predicate::Date(*from, *to)),
        }
    }

    fn retains(&self, value: &CellValue) -> bool {
        match self {
            Predicate::Categorical(selected) => selected.contains(value),
            Predicate::Text(needle) => value.to_string().to_lowercase().contains(needle.as_str()),
            Predicate::Numeric(min, max) => {
                coerce_number(value).is_some_and(|v| *min <= v && v <= *max)
            }
            Predicate::Time(window) => window.retains(value),
            Predicate::Date(from, to) => match parse_date(value) {
                Some(d) => *from <= d && d <= *to,
                None => true,
            },
        }
    }
}

/// Return indices of rows that pass all active filters, in table order.
///
/// Filters on columns the table does not have, and time filters with
/// malformed bounds, are ignored.
pub fn filtered_indices(table: &Table, filters: &FilterState) -> Vec<usize> {
    let predicates: Vec<(usize, Predicate<'_>)> = filters
        .iter()
        .filter_map(|(name, filter)| {
            let Some(col) = table.column_index(name) else {
                log::debug!("Filter on unknown column '{name}' ignored");
                return None;
            };
            Predicate::compile(filter).map(|p| (col, p))
        })
        .collect();

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            predicates
                .iter()
                .all(|(col, p)| row.get(*col).is_some_and(|v| p.retains(v)))
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn column(name: &str, values: Vec<CellValue>) -> Table {
        Table::new(vec![name.to_string()], values.into_iter().map(|v| vec![v]).collect())
    }

    fn time_filter(min: &str, max: &str) -> FilterState {
        FilterState::from([(
            "ORA".to_string(),
            ColumnFilter::TimeRange {
                min: min.to_string(),
                max: max.to_string(),
            },
        )])
    }

    #[test]
    fn clock_bounds_parse_to_minutes() {
        assert_eq!(parse_clock("09:00"), Some(540));
        assert_eq!(parse_clock("23:59"), Some(1439));
        assert_eq!(parse_clock("7:05:30"), Some(425));
        assert_eq!(parse_clock("0900"), None);
        assert_eq!(parse_clock("ab:cd"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn documented_time_examples() {
        let table = column("ORA", vec![s("14:30:00")]);
        assert_eq!(filtered_indices(&table, &time_filter("09:00", "17:00")), vec![0]);
        assert!(filtered_indices(&table, &time_filter("18:00", "23:59")).is_empty());

        let unparsed = column("ORA", vec![s("n/a")]);
        assert_eq!(filtered_indices(&unparsed, &time_filter("18:00", "23:59")), vec![0]);
        assert_eq!(filtered_indices(&unparsed, &time_filter("00:00", "00:01")), vec![0]);
    }

    #[test]
    fn time_window_is_inclusive_and_fail_open() {
        let table = column(
            "ORA",
            vec![
                s("08:59"),
                s("09:00"),
                s("12:15"),
                s("17:00"),
                s("17:01"),
                CellValue::Null,
                s("rinviata"),
            ],
        );
        assert_eq!(filtered_indices(&table, &time_filter("09:00", "17:00")), vec![1, 2, 3, 5, 6]);
    }

    #[test]
    fn malformed_time_bounds_skip_the_filter() {
        let table = column("ORA", vec![s("08:00"), s("20:00")]);
        assert_eq!(filtered_indices(&table, &time_filter("9", "17:00")), vec![0, 1]);
        assert_eq!(filtered_indices(&table, &time_filter("09:00", "xx:yy")), vec![0, 1]);
        assert_eq!(filter_by_time(&table, &[1], 0, "nove", "17:00"), vec![1]);
    }

    #[test]
    fn inverted_window_keeps_only_unparsed_rows() {
        let table = column("ORA", vec![s("10:00"), s("-")]);
        assert_eq!(filtered_indices(&table, &time_filter("18:00", "09:00")), vec![1]);
    }

    #[test]
    fn time_is_found_inside_longer_text() {
        assert_eq!(cell_minutes(&s("Sab 21:45 (posticipo)")), Some(1305));
        assert_eq!(cell_minutes(&s("1899-12-31 07:05:00")), Some(425));
        assert_eq!(cell_minutes(&s("n/a")), None);
    }

    #[test]
    fn filter_by_time_works_on_a_subset() {
        let table = column("ORA", vec![s("10:00"), s("20:00"), s("11:00")]);
        assert_eq!(filter_by_time(&table, &[0, 1], 0, "09:00", "12:00"), vec![0]);
    }

    #[test]
    fn categorical_membership_and_empty_selection() {
        let table = column("LEGA", vec![s("Serie A"), s("Liga"), s("Serie A"), CellValue::Null]);
        let mut filters = FilterState::new();
        filters.insert(
            "LEGA".into(),
            ColumnFilter::Categorical {
                selected: BTreeSet::new(),
            },
        );
        assert_eq!(filtered_indices(&table, &filters), vec![0, 1, 2, 3]);

        filters.insert(
            "LEGA".into(),
            ColumnFilter::Categorical {
                selected: BTreeSet::from([s("Serie A")]),
            },
        );
        assert_eq!(filtered_indices(&table, &filters), vec![0, 2]);
    }

    #[test]
    fn text_filter_is_case_insensitive_substring() {
        let table = column(
            "SQUADRA",
            vec![s("Inter"), s("Internacional"), s("Roma"), CellValue::Integer(12)],
        );
        let search = |needle: &str| {
            FilterState::from([(
                "SQUADRA".into(),
                ColumnFilter::Text {
                    needle: needle.into(),
                },
            )])
        };
        assert_eq!(filtered_indices(&table, &search("INTER")), vec![0, 1]);
        assert_eq!(filtered_indices(&table, &search("2")), vec![3]);
    }

    #[test]
    fn numeric_range_coerces_decimal_commas() {
        let table = column(
            "QUOTA",
            vec![s("1,50"), s("2,75"), s("3,10"), s("-"), CellValue::Float(2.0)],
        );
        let filters = FilterState::from([(
            "QUOTA".into(),
            ColumnFilter::NumericRange {
                min: 1.5,
                max: 2.75,
            },
        )]);
        assert_eq!(filtered_indices(&table, &filters), vec![0, 1, 4]);
        assert_eq!(numeric_bounds(&table, 0), (1.5, 3.1));
        assert_eq!(numeric_bounds(&column("X", vec![s("-")]), 0), (0.0, 100.0));
    }

    #[test]
    fn date_range_is_inclusive_and_fail_open() {
        let table = column(
            "DATA",
            vec![
                CellValue::Date("2024-05-01".into()),
                s("02/05/2024"),
                CellValue::Date("2024-05-03 20:45:00".into()),
                s("da definire"),
            ],
        );
        let from = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let filters = FilterState::from([("DATA".into(), ColumnFilter::DateRange { from, to })]);
        assert_eq!(filtered_indices(&table, &filters), vec![1, 2, 3]);
    }

    #[test]
    fn filters_combine_and_ignore_unknown_columns() {
        let table = Table::new(
            vec!["ORA".into(), "LEGA".into()],
            vec![
                vec![s("15:00"), s("Serie A")],
                vec![s("20:45"), s("Serie A")],
                vec![s("15:00"), s("Liga")],
            ],
        );
        let mut filters = time_filter("12:00", "18:00");
        filters.insert("LEGA".into(), ColumnFilter::Text { needle: "serie".into() });
        filters.insert("ASSENTE".into(), ColumnFilter::Text { needle: "x".into() });
        assert_eq!(filtered_indices(&table, &filters), vec![0]);
    }

    #[test]
    fn kinds_follow_cardinality_and_column_role() {
        let profile = ViewerConfig::default().datasets[0].clone();
        let many = |f: &dyn Fn(usize) -> CellValue| (0..12).map(f).collect::<Vec<_>>();
        let kinds = |table: &Table| available_kinds(table, 0, &profile, 10);

        let few = column("LEGA", vec![s("A"), s("B")]);
        assert_eq!(kinds(&few), vec![FilterKind::Categorical]);

        let times = column("ORA", many(&|i| s(&format!("{:02}:00", i + 8))));
        assert_eq!(kinds(&times), vec![FilterKind::Text, FilterKind::TimeRange]);

        let odds = column("CASA", many(&|i| s(&format!("1,{i:02}"))));
        assert_eq!(kinds(&odds), vec![FilterKind::Text, FilterKind::NumericRange]);

        let dates = column(
            "DATA",
            many(&|i| CellValue::Date(format!("2024-05-{:02}", i + 1))),
        );
        assert_eq!(kinds(&dates), vec![FilterKind::Text, FilterKind::DateRange]);

        let teams = column("SQUADRA", many(&|i| s(&format!("Team {i}"))));
        assert_eq!(kinds(&teams), vec![FilterKind::Text]);
    }

    #[test]
    fn unconstrained_filters_keep_every_row() {
        let table = Table::new(
            vec!["ORA".into(), "QUOTA".into(), "DATA".into()],
            vec![
                vec![s("10:00"), s("1,5"), CellValue::Date("2024-01-01".into())],
                vec![s("22:30"), s("4,0"), CellValue::Date("2024-02-01".into())],
            ],
        );
        let mut filters = FilterState::new();
        let kinds = [FilterKind::TimeRange, FilterKind::NumericRange, FilterKind::DateRange];
        for (col, kind) in kinds.into_iter().enumerate() {
            let filter = ColumnFilter::unconstrained(kind, &table, col);
            filters.insert(table.columns[col].clone(), filter);
        }
        assert_eq!(filtered_indices(&table, &filters), vec![0, 1]);
    }
}
