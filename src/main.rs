mod app;
mod state;
mod ui;

use std::path::PathBuf;

use app::MsAnalyzerApp;
use eframe::egui;
use msanalyzer::config::Settings;
use state::AppState;

/// Optional settings file: `MSANALYZER_SETTINGS=/path/settings.json`.
fn initial_state() -> AppState {
    let mut state = AppState::default();
    if let Some(path) = std::env::var_os("MSANALYZER_SETTINGS").map(PathBuf::from) {
        match Settings::from_file(&path) {
            Ok(settings) => {
                state.tolerance_text = settings.find.tolerance.to_string();
                state.plot_draft = settings.plot.clone();
                state.settings = settings;
            }
            Err(e) => state.set_error(format!("Ignoring settings: {e:#}")),
        }
    }
    state
}

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "MSAnalyzer – Mass Spectrometry Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(MsAnalyzerApp::new(initial_state())))),
    )
}
