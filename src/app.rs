use eframe::egui;

use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MsAnalyzerApp {
    pub state: AppState,
}

impl MsAnalyzerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for MsAnalyzerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar + tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: function / channel selection ----
        egui::SidePanel::left("selection_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: active tab ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.tab {
            Tab::Plot => {
                panels::plot_controls(ui, &mut self.state);
                plot::chromatogram_plot(ui, &self.state);
            }
            Tab::Table => table::table_view(ui, &mut self.state),
            Tab::Compare => {
                panels::compare_controls(ui, &mut self.state);
                plot::comparison_plot(ui, &self.state);
            }
            Tab::FindReplace => panels::find_replace_panel(ui, &mut self.state),
        });
    }
}
