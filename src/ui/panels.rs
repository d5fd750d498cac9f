use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{numeric_bounds, ColumnFilter, FilterKind, TimeWindow};
use crate::data::loader::SUPPORTED_EXTENSIONS;
use crate::data::model::CellValue;
use crate::state::{AppState, Notice, NoticeLevel};

// ---------------------------------------------------------------------------
// Left side panel – dataset choice and filter widgets
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Dataset");
    let labels: Vec<String> = state.config.datasets.iter().map(|d| d.label.clone()).collect();
    for (i, label) in labels.iter().enumerate() {
        if ui.radio(state.active_index() == i, label).clicked() {
            state.select_dataset(i);
        }
    }
    ui.separator();

    sheet_choice(ui, state);

    let Some(session) = state.session() else {
        ui.label("No dataset loaded.");
        return;
    };
    ui.label(RichText::new(format!("Source: {}", session.data.source_filename)).weak());

    // Clone what we need so we can mutate state inside the loop.
    let columns = session.data.table.columns.clone();
    let mut chosen = session.filter_columns.clone();
    let max = state.config.max_filter_columns;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Filters");

            egui::CollapsingHeader::new(format!("Columns to filter ({}/{max})", chosen.len()))
                .id_salt("filter_columns")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    let mut changed = false;
                    for col in &columns {
                        let mut checked = chosen.contains(col);
                        let enabled = checked || chosen.len() < max;
                        let checkbox = egui::Checkbox::new(&mut checked, col);
                        if ui.add_enabled(enabled, checkbox).changed() {
                            if checked {
                                chosen.push(col.clone());
                            } else {
                                chosen.retain(|c| c != col);
                            }
                            changed = true;
                        }
                    }
                    if changed {
                        state.set_filter_columns(chosen.clone());
                    }
                });
            ui.separator();

            let filter_columns = state
                .session()
                .map(|s| s.filter_columns.clone())
                .unwrap_or_default();
            for col in &filter_columns {
                filter_widget(ui, state, col);
            }

            ui.add_space(8.0);
            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

fn sheet_choice(ui: &mut Ui, state: &mut AppState) {
    let Some(choice) = &mut state.pending_sheet else {
        return;
    };
    let name = choice
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ui.strong(format!("Choose a sheet of {name}"));

    let selected_text = choice.sheets.get(choice.selected).cloned().unwrap_or_default();
    egui::ComboBox::from_id_salt("sheet_choice")
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            for (i, sheet) in choice.sheets.iter().enumerate() {
                ui.selectable_value(&mut choice.selected, i, sheet);
            }
        });

    let mut load = false;
    let mut cancel = false;
    ui.horizontal(|ui: &mut Ui| {
        load = ui.button("Load sheet").clicked();
        cancel = ui.button("Cancel").clicked();
    });
    if load {
        state.confirm_sheet_choice();
    } else if cancel {
        state.pending_sheet = None;
    }
    ui.separator();
}

fn kind_label(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Categorical => "Values",
        FilterKind::Text => "Text",
        FilterKind::NumericRange | FilterKind::TimeRange | FilterKind::DateRange => "Range",
    }
}

/// One collapsible filter editor; writes back to `state` only on change.
fn filter_widget(ui: &mut Ui, state: &mut AppState, column: &str) {
    let kinds = state.filter_kinds(column);
    let Some(session) = state.session() else {
        return;
    };
    let table = &session.data.table;
    let Some(col) = table.column_index(column) else {
        return;
    };
    let current = session.filters.get(column).cloned();
    let Some(kind) = current
        .as_ref()
        .map(ColumnFilter::kind)
        .filter(|k| kinds.contains(k))
        .or_else(|| kinds.first().copied())
    else {
        return;
    };
    let mut filter = match current {
        Some(f) if f.kind() == kind => f,
        _ => ColumnFilter::unconstrained(kind, table, col),
    };
    let values: Vec<CellValue> = match kind {
        FilterKind::Categorical => table
            .unique_values(col)
            .map(|u| u.iter().cloned().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    let bounds = numeric_bounds(table, col);

    let mut chosen_kind = kind;
    let mut changed = false;
    egui::CollapsingHeader::new(RichText::new(column).strong())
        .id_salt(column)
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if kinds.len() > 1 {
                ui.horizontal(|ui: &mut Ui| {
                    for k in &kinds {
                        ui.radio_value(&mut chosen_kind, *k, kind_label(*k));
                    }
                });
            }
            changed = edit_filter(ui, column, &mut filter, &values, bounds);
        });

    if chosen_kind != kind {
        state.set_filter_kind(column, chosen_kind);
    } else if changed {
        state.set_filter(column, filter);
    }
}

fn edit_filter(
    ui: &mut Ui,
    column: &str,
    filter: &mut ColumnFilter,
    values: &[CellValue],
    bounds: (f64, f64),
) -> bool {
    let mut changed = false;
    match filter {
        ColumnFilter::Categorical { selected } => {
            ui.label(format!("{} of {} selected", selected.len(), values.len()));
            if ui.small_button("Clear").clicked() {
                selected.clear();
                changed = true;
            }
            for val in values {
                let mut checked = selected.contains(val);
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    if checked {
                        selected.insert(val.clone());
                    } else {
                        selected.remove(val);
                    }
                    changed = true;
                }
            }
        }
        ColumnFilter::Text { needle } => {
            changed = ui
                .add(egui::TextEdit::singleline(needle).hint_text(format!("Search in {column}")))
                .changed();
        }
        ColumnFilter::NumericRange { min, max } => {
            let (lo, hi) = bounds;
            changed |= ui.add(egui::Slider::new(min, lo..=hi).text("min")).changed();
            changed |= ui.add(egui::Slider::new(max, lo..=hi).text("max")).changed();
        }
        ColumnFilter::TimeRange { min, max } => {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("From");
                changed |= ui.add(egui::TextEdit::singleline(min).desired_width(50.0)).changed();
                ui.label("to");
                changed |= ui.add(egui::TextEdit::singleline(max).desired_width(50.0)).changed();
            });
            if TimeWindow::parse(min, max).is_none() {
                ui.label(RichText::new("Use the hh:mm format").color(Color32::YELLOW));
            }
        }
        ColumnFilter::DateRange { from, to } => {
            let from_id = format!("{column}_from");
            let to_id = format!("{column}_to");
            ui.horizontal(|ui: &mut Ui| {
                ui.label("From");
                changed |= ui.add(DatePickerButton::new(from).id_salt(&from_id)).changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("To");
                changed |= ui.add(DatePickerButton::new(to).id_salt(&to_id)).changed();
            });
        }
    }
    changed
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let loaded = state.session().is_some();
            if ui.add_enabled(loaded, egui::Button::new("Export filtered CSV…")).clicked() {
                export_file_dialog(state);
                ui.close_menu();
            }
            if ui.add_enabled(loaded, egui::Button::new("Copy download link")).clicked() {
                match state.download_link() {
                    Ok(link) => {
                        ui.ctx().copy_text(link);
                        state.notice = Some(Notice::new(
                            NoticeLevel::Info,
                            "Download link copied to the clipboard",
                        ));
                    }
                    Err(e) => {
                        let message = format!("Export failed: {e:#}");
                        state.notice = Some(Notice::new(NoticeLevel::Error, message));
                    }
                }
                ui.close_menu();
            }
            ui.separator();
            if ui.add_enabled(loaded, egui::Button::new("Forget saved data")).clicked() {
                if let Err(e) = state.forget_dataset() {
                    log::error!("{e:#}");
                    state.notice = Some(Notice::new(NoticeLevel::Error, format!("{e:#}")));
                }
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some((visible, total)) = state.row_counts() {
            ui.label(format!("Showing {visible} of {total} rows"));
            ui.separator();
        }

        if let Some(notice) = &state.notice {
            let color = match notice.level {
                NoticeLevel::Success => Color32::from_rgb(80, 180, 80),
                NoticeLevel::Info => ui.visuals().text_color(),
                NoticeLevel::Warning => Color32::YELLOW,
                NoticeLevel::Error => Color32::RED,
            };
            ui.label(RichText::new(&notice.message).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title(format!("Open {}", state.profile().label))
        .add_filter("Spreadsheets", SUPPORTED_EXTENSIONS)
        .add_filter("Excel", &["xlsx", "xlsm", "xls"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open_workbook(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name(state.profile().export_filename.clone())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_csv(&path) {
            log::error!("Export failed: {e:#}");
            state.notice = Some(Notice::new(NoticeLevel::Error, format!("Export failed: {e:#}")));
        }
    }
}
