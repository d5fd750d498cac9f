use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use palinsesto_viewer::color::CssColor;
use palinsesto_viewer::config::ViewerConfig;
use palinsesto_viewer::data::filter::{
    available_kinds, filtered_indices, ColumnFilter, FilterKind, FilterState,
};
use palinsesto_viewer::data::model::{CellValue, SheetOrigin};
use palinsesto_viewer::data::{load_dataset, loader, styles};
use palinsesto_viewer::export;
use palinsesto_viewer::state::AppState;
use rust_xlsxwriter::{Color, Format, Workbook};

fn s(v: &str) -> CellValue {
    CellValue::String(v.to_string())
}

/// Two sheets; the schedule starts at B2 and carries a few fills.
fn write_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("palinsesto.xlsx");
    let header = Format::new().set_bold().set_background_color(Color::RGB(0xD9D9D9));
    let time = Format::new().set_num_format("hh:mm:ss");
    let yellow = Format::new().set_background_color(Color::RGB(0xFFEB9C));
    let green = Format::new().set_background_color(Color::RGB(0xC6EFCE));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Palinsesto").unwrap();
    for (i, name) in ["ORA", "LEGA", "QUOTA"].iter().enumerate() {
        sheet.write_string_with_format(1, 1 + i as u16, *name, &header).unwrap();
    }
    sheet.write_number_with_format(2, 1, 870.0 / 1440.0, &time).unwrap();
    sheet.write_string_with_format(2, 2, "Serie A", &yellow).unwrap();
    sheet.write_number(2, 3, 1.85).unwrap();

    sheet.write_number_with_format(3, 1, 1245.0 / 1440.0, &time).unwrap();
    sheet.write_string(3, 2, "Liga").unwrap();
    sheet.write_number_with_format(3, 3, 3.5, &green).unwrap();

    sheet.write_string(4, 1, "n/a").unwrap();
    sheet.write_string(4, 2, "Serie A").unwrap();
    sheet.write_number(4, 3, 2.0).unwrap();

    let today = workbook.add_worksheet();
    today.set_name("Giornata Odierna").unwrap();
    today.write_string(0, 0, "ORA").unwrap();
    today.write_string(0, 1, "ESITO").unwrap();
    today.write_string(1, 0, "18:00").unwrap();
    today.write_string_with_format(1, 1, "1", &yellow).unwrap();

    workbook.save(&path).unwrap();
    path
}

/// First day of the dated fixture, 2024-05-03, as an Excel serial.
const FIRST_DAY: f64 = 45415.0;

/// Twelve consecutive match days; only the first kick-off is off midnight.
fn write_dated_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("calendario.xlsx");
    let date = Format::new().set_num_format("dd/mm/yyyy");
    let date_time = Format::new().set_num_format("yyyy-mm-dd hh:mm");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Calendario").unwrap();
    sheet.write_string(0, 0, "DATA").unwrap();
    sheet.write_string(0, 1, "INIZIO").unwrap();
    sheet.write_string(0, 2, "PARTITA").unwrap();
    for i in 0..12u32 {
        let day = FIRST_DAY + f64::from(i);
        let kickoff = if i == 0 { day + 0.75 } else { day };
        sheet.write_number_with_format(i + 1, 0, day, &date).unwrap();
        sheet.write_number_with_format(i + 1, 1, kickoff, &date_time).unwrap();
        sheet.write_string(i + 1, 2, format!("Giornata {}", i + 1)).unwrap();
    }
    workbook.save(&path).unwrap();
    path
}

/// Sheet names that need XML escaping in `workbook.xml`.
fn write_escaped_names_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("coppe.xlsx");
    let yellow = Format::new().set_background_color(Color::RGB(0xFFEB9C));
    let green = Format::new().set_background_color(Color::RGB(0xC6EFCE));

    let mut workbook = Workbook::new();
    let leagues = workbook.add_worksheet();
    leagues.set_name("Serie A & B").unwrap();
    leagues.write_string(0, 0, "SQUADRA").unwrap();
    leagues.write_string_with_format(1, 0, "Roma", &yellow).unwrap();

    let cup = workbook.add_worksheet();
    cup.set_name("Coppa d'Italia").unwrap();
    cup.write_string(0, 0, "SQUADRA").unwrap();
    cup.write_string_with_format(1, 0, "Lazio", &green).unwrap();

    workbook.save(&path).unwrap();
    path
}

fn config_in(dir: &Path) -> ViewerConfig {
    ViewerConfig {
        snapshot_dir: dir.join("snapshots"),
        ..ViewerConfig::default()
    }
}

#[test]
fn workbook_loads_with_origin_and_normalized_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());
    let profile = ViewerConfig::default().datasets[0].clone();

    let (dataset, report) = load_dataset(&path, Some("Palinsesto"), &profile).unwrap();
    let table = &dataset.table;

    assert_eq!(dataset.source_filename, "palinsesto.xlsx");
    assert_eq!(table.columns, vec!["ORA", "LEGA", "QUOTA"]);
    assert_eq!(table.origin, SheetOrigin { row: 1, col: 1 });
    assert_eq!(table.len(), 3);

    assert_eq!(table.cell(0, 0), Some(&s("14:30")));
    assert_eq!(table.cell(1, 0), Some(&s("20:45")));
    assert_eq!(table.cell(2, 0), Some(&s("n/a")));

    assert_eq!(report.formatted, vec!["QUOTA"]);
    assert_eq!(table.cell(0, 2), Some(&s("1,85")));
    assert_eq!(table.cell(2, 2), Some(&s("2,0")));
}

#[test]
fn fills_line_up_with_table_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());
    let profile = ViewerConfig::default().datasets[0].clone();
    let (dataset, _) = load_dataset(&path, Some("Palinsesto"), &profile).unwrap();
    let (table, colors) = (&dataset.table, &dataset.color_map);

    assert_eq!(colors.color_for_cell(table, 0, 1), Some(&CssColor::new("#FFEB9C")));
    assert_eq!(colors.color_for_cell(table, 1, 2), Some(&CssColor::new("#C6EFCE")));
    assert_eq!(colors.color_for_cell(table, 0, 0), None);
    assert_eq!(colors.color_for_cell(table, 2, 1), None);

    // The header row is filled too (sheet row 2, column B).
    assert_eq!(colors.color_at(2, 2), Some(&CssColor::new("#D9D9D9")));
}

#[test]
fn fills_are_read_per_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());

    let today = styles::extract_fill_colors(&path, "Giornata Odierna").unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today.color_at(2, 2), Some(&CssColor::new("#FFEB9C")));

    assert!(styles::extract_fill_colors(&path, "Archivio").is_err());
}

#[test]
fn filtered_export_reloads_as_the_same_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());
    let profile = ViewerConfig::default().datasets[0].clone();
    let (dataset, _) = load_dataset(&path, Some("Palinsesto"), &profile).unwrap();

    let filters = FilterState::from([(
        "ORA".to_string(),
        ColumnFilter::TimeRange {
            min: "14:00".into(),
            max: "15:00".into(),
        },
    )]);
    let visible = filtered_indices(&dataset.table, &filters);
    assert_eq!(visible, vec![0, 2]);

    let out = dir.path().join("palinsesto_filtrato.csv");
    export::write_csv(&out, &dataset.table, &visible).unwrap();

    let reloaded = loader::load_file(&out, None).unwrap();
    assert_eq!(reloaded.columns, dataset.table.columns);
    assert_eq!(reloaded.rows, dataset.table.select_rows(&visible).rows);
}

#[test]
fn multi_sheet_workbook_waits_for_a_sheet_choice() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());
    let mut state = AppState::new(config_in(dir.path()));

    state.open_workbook(&path);
    assert!(state.session().is_none());
    let choice = state.pending_sheet.as_mut().unwrap();
    assert_eq!(choice.sheets, vec!["Palinsesto", "Giornata Odierna"]);
    choice.selected = 1;

    state.confirm_sheet_choice();
    assert!(state.pending_sheet.is_none());
    let session = state.session().unwrap();
    assert_eq!(session.data.table.columns, vec!["ORA", "ESITO"]);
}

#[test]
fn archive_profile_reads_its_fixed_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());
    let mut state = AppState::new(config_in(dir.path()));

    state.select_dataset(1);
    state.open_workbook(&path);
    assert!(state.pending_sheet.is_none());
    assert_eq!(state.row_counts(), Some((1, 1)));
}

#[test]
fn restored_snapshot_keeps_cell_fills() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(dir.path());
    let expected = {
        let mut state = AppState::new(config_in(dir.path()));
        assert!(state.load_workbook(&path, Some("Palinsesto")));
        state.session().unwrap().data.color_map.clone()
    };

    let mut state = AppState::new(config_in(dir.path()));
    state.ensure_restored();
    let session = state.session().unwrap();
    assert_eq!(session.data.color_map, expected);
    assert_eq!(session.data.table.origin, SheetOrigin { row: 1, col: 1 });
    assert_eq!(
        session.data.color_map.color_for_cell(&session.data.table, 0, 1),
        Some(&CssColor::new("#FFEB9C"))
    );
}

#[test]
fn date_cells_load_as_dates() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dated_workbook(dir.path());
    let profile = ViewerConfig::default().datasets[0].clone();
    let (dataset, _) = load_dataset(&path, Some("Calendario"), &profile).unwrap();
    let table = &dataset.table;

    assert_eq!(table.len(), 12);
    assert_eq!(table.cell(0, 0), Some(&CellValue::Date("2024-05-03".into())));
    assert_eq!(table.cell(11, 0), Some(&CellValue::Date("2024-05-14".into())));
    assert_eq!(
        table.cell(0, 1),
        Some(&CellValue::Date("2024-05-03 18:00:00".into()))
    );
    assert_eq!(table.cell(1, 1), Some(&CellValue::Date("2024-05-04".into())));
    assert_eq!(table.cell(0, 2), Some(&s("Giornata 1")));

    assert_eq!(
        available_kinds(table, 0, &profile, 10),
        vec![FilterKind::Text, FilterKind::DateRange]
    );
}

#[test]
fn date_range_applies_to_loaded_date_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dated_workbook(dir.path());
    let profile = ViewerConfig::default().datasets[0].clone();
    let (dataset, _) = load_dataset(&path, Some("Calendario"), &profile).unwrap();
    let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();

    let by_day = FilterState::from([(
        "DATA".to_string(),
        ColumnFilter::DateRange {
            from: day(5),
            to: day(7),
        },
    )]);
    assert_eq!(filtered_indices(&dataset.table, &by_day), vec![2, 3, 4]);

    let by_kickoff = FilterState::from([(
        "INIZIO".to_string(),
        ColumnFilter::DateRange {
            from: day(3),
            to: day(3),
        },
    )]);
    assert_eq!(filtered_indices(&dataset.table, &by_kickoff), vec![0]);
}

#[test]
fn fills_are_found_for_sheet_names_with_markup_characters() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_escaped_names_workbook(dir.path());

    let leagues = styles::extract_fill_colors(&path, "Serie A & B").unwrap();
    assert_eq!(leagues.color_at(2, 1), Some(&CssColor::new("#FFEB9C")));

    let cup = styles::extract_fill_colors(&path, "Coppa d'Italia").unwrap();
    assert_eq!(cup.color_at(2, 1), Some(&CssColor::new("#C6EFCE")));

    let profile = ViewerConfig::default().datasets[0].clone();
    let (dataset, _) = load_dataset(&path, Some("Serie A & B"), &profile).unwrap();
    assert_eq!(
        dataset.color_map.color_for_cell(&dataset.table, 0, 0),
        Some(&CssColor::new("#FFEB9C"))
    );
}
