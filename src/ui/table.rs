use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use msanalyzer::data::model::COLUMNS;

use crate::state::{row_cells, AppState};

/// Scrollable grid of the selected table, limited to ticked channels and
/// narrowed by the search box.
pub fn table_view(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Search:");
        ui.text_edit_singleline(&mut state.table_query);
        if ui.small_button("Clear").clicked() {
            state.table_query.clear();
        }
    });

    let state = &*state;
    let Some(table) = state
        .selected
        .as_deref()
        .and_then(|label| state.session.table(label).ok())
    else {
        ui.label("No table selected.");
        return;
    };

    let rows = state.visible_rows();

    ui.label(format!(
        "{}: showing {} of {} rows, {} edit(s)",
        table.label(),
        rows.len(),
        table.len(),
        table.modifications
    ));
    ui.separator();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(90.0), COLUMNS.len())
        .header(20.0, |mut header| {
            for name in COLUMNS {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows.len(), |mut row| {
                for cell in row_cells(rows[row.index()]) {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell.as_str());
                    });
                }
            });
        });
}
