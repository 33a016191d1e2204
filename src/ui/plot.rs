use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use msanalyzer::color::generate_palette;
use msanalyzer::render::channel_traces;

use super::color32;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Chromatogram plot (Plot tab)
// ---------------------------------------------------------------------------

/// Intensity against retention time for every ticked channel.
pub fn chromatogram_plot(ui: &mut Ui, state: &AppState) {
    let Some(table) = state
        .selected
        .as_deref()
        .and_then(|label| state.session.table(label).ok())
    else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Parse or load a file to view chromatograms  (File → …)");
        });
        return;
    };

    let channels: Vec<i64> = state.channel_selection.iter().copied().collect();
    if channels.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Select one or more channels.");
        });
        return;
    }
    let traces = channel_traces(table, &channels);

    Plot::new("chromatogram_plot")
        .legend(Legend::default())
        .x_axis_label("Retention Time")
        .y_axis_label("Intensity")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (trace, &channel) in traces.iter().zip(&channels) {
                let color = state
                    .channel_colors
                    .as_ref()
                    .map(|cm| color32(cm.color_for(channel)))
                    .unwrap_or(Color32::LIGHT_BLUE);

                let points: PlotPoints = trace.points.iter().map(|&(x, y)| [x, y]).collect();
                plot_ui.line(Line::new(points).name(&trace.label).color(color).width(1.5));
            }
        });
}

// ---------------------------------------------------------------------------
// Comparison plot (Compare tab)
// ---------------------------------------------------------------------------

/// Overlay of one channel from two tables.
pub fn comparison_plot(ui: &mut Ui, state: &AppState) {
    let Some((a, b)) = &state.comparison else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Pick two functions and a common channel.");
        });
        return;
    };

    let palette = generate_palette(2);
    Plot::new("comparison_plot")
        .legend(Legend::default())
        .x_axis_label("Retention Time")
        .y_axis_label(format!("Intensity (channel {})", a.channel))
        .show(ui, |plot_ui| {
            for (series, rgb) in [a, b].into_iter().zip(palette) {
                let points: PlotPoints = series.points.iter().map(|&(x, y)| [x, y]).collect();
                plot_ui.line(Line::new(points).name(&series.label).color(color32(rgb)).width(1.5));
            }
        });
}
