use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::{text_color_for, CssColor};
use crate::state::AppState;

const ROW_HEIGHT: f32 = 20.0;

/// Render the visible rows of the active dataset, painting each cell with
/// its workbook fill.
pub fn data_table(ui: &mut Ui, state: &AppState) {
    let Some(session) = state.session() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Open a spreadsheet from the File menu.");
        });
        return;
    };
    let table = &session.data.table;
    let colors = &session.data.color_map;
    let rows = &session.visible_indices;

    if rows.is_empty() {
        ui.label("No rows match the current filters.");
    }

    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(colors.is_empty())
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(60.0).clip(true), table.columns.len())
            .min_scrolled_height(0.0)
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for name in &table.columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                    let r = rows[row.index()];
                    for c in 0..table.columns.len() {
                        row.col(|ui: &mut Ui| {
                            let text =
                                table.cell(r, c).map(ToString::to_string).unwrap_or_default();
                            let fill = colors.color_for_cell(table, r, c);
                            match fill.and_then(CssColor::to_color32) {
                                Some(bg) => {
                                    ui.painter().rect_filled(ui.max_rect(), 0.0, bg);
                                    ui.label(RichText::new(text).color(text_color_for(bg)));
                                }
                                None => {
                                    ui.label(text);
                                }
                            }
                        });
                    }
                });
            });
    });
}
