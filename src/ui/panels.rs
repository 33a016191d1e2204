use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use super::color32;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – function and channel selection
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Functions");
    ui.separator();

    if state.session.is_empty() {
        ui.label("No tables loaded.");
        return;
    }

    let labels = state.session.labels();
    let current = state.selected.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("function_select")
        .selected_text(&current)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for label in &labels {
                if ui.selectable_label(current == *label, label).clicked() {
                    state.select_table(label.clone());
                }
            }
        });
    ui.separator();

    let Some(label) = state.selected.clone() else {
        return;
    };
    let channels = state.session.channels(&label).unwrap_or_default();

    ui.horizontal(|ui: &mut Ui| {
        ui.strong(format!(
            "Channels  ({}/{})",
            state.channel_selection.len(),
            channels.len()
        ));
        if ui.small_button("All").clicked() {
            state.select_all_channels();
        }
        if ui.small_button("None").clicked() {
            state.select_no_channels();
        }
    });

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for channel in channels {
                let mut text = RichText::new(channel.to_string());
                if let Some(cm) = &state.channel_colors {
                    text = text.color(color32(cm.color_for(channel)));
                }
                let mut checked = state.channel_selection.contains(&channel);
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_channel(channel);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Choose output folder…").clicked() {
                choose_output_dir(state);
                ui.close_menu();
            }
            if ui.button("Parse raw files…").clicked() {
                parse_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load CSV tables…").clicked() {
                load_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Save table as…").clicked() {
                save_table_dialog(state);
                ui.close_menu();
            }
            if ui.button("Export ticked channels…").clicked() {
                export_channels_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save plot as PNG…").clicked() {
                save_plot_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.selectable_value(&mut state.tab, Tab::Plot, "Plot");
        ui.selectable_value(&mut state.tab, Tab::Table, "Table");
        ui.selectable_value(&mut state.tab, Tab::Compare, "Compare");
        ui.selectable_value(&mut state.tab, Tab::FindReplace, "Find & Replace");

        ui.separator();

        match &state.output_dir {
            Some(dir) => ui.label(format!("Output: {}", dir.display())),
            None => ui.label(RichText::new("No output folder").italics()),
        };

        if let Some(msg) = &state.status_message {
            let color = if state.status_is_error {
                Color32::RED
            } else {
                Color32::DARK_GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Plot tab controls
// ---------------------------------------------------------------------------

/// Figure size used for PNG export.
pub fn plot_controls(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Width (in)");
        ui.add(egui::DragValue::new(&mut state.plot_draft.width).speed(0.1).range(0.1..=100.0));
        ui.label("Height (in)");
        ui.add(egui::DragValue::new(&mut state.plot_draft.height).speed(0.1).range(0.1..=100.0));
        ui.label("DPI");
        ui.add(egui::DragValue::new(&mut state.plot_draft.dpi).speed(1.0).range(1..=1200));

        let changed = state.plot_draft != state.settings.plot;
        if ui.add_enabled(changed, egui::Button::new("Apply")).clicked() {
            state.apply_plot_settings();
        }
        if let Some((w, h)) = state.plot_draft.pixel_size() {
            ui.label(RichText::new(format!("{w} x {h} px")).weak());
        } else {
            ui.label(RichText::new("too large").color(Color32::RED));
        }
    });
    ui.separator();
}

// ---------------------------------------------------------------------------
// Compare tab controls
// ---------------------------------------------------------------------------

pub fn compare_controls(ui: &mut Ui, state: &mut AppState) {
    let labels = state.session.labels();
    let mut changed = false;

    ui.horizontal(|ui: &mut Ui| {
        for (salt, title, slot) in [
            ("compare_a", "Function A", &mut state.compare_a),
            ("compare_b", "Function B", &mut state.compare_b),
        ] {
            ui.label(title);
            egui::ComboBox::from_id_salt(salt)
                .selected_text(slot.clone().unwrap_or_default())
                .width(260.0)
                .show_ui(ui, |ui: &mut Ui| {
                    for label in &labels {
                        let is_current = slot.as_deref() == Some(label.as_str());
                        if ui.selectable_label(is_current, label).clicked() {
                            *slot = Some(label.clone());
                            changed = true;
                        }
                    }
                });
        }
    });

    let candidates = state.compare_candidates();
    ui.horizontal_wrapped(|ui: &mut Ui| {
        ui.label("Common channels:");
        if candidates.is_empty() {
            ui.label(RichText::new("none").italics());
        }
        for channel in &candidates {
            let is_current = state.compare_channel == Some(*channel);
            if ui.selectable_label(is_current, channel.to_string()).clicked() {
                state.compare_channel = Some(*channel);
                changed = true;
            }
        }
    });

    if changed {
        if state
            .compare_channel
            .is_some_and(|c| !candidates.contains(&c))
        {
            state.compare_channel = None;
        }
        state.refresh_comparison();
    }
    ui.separator();
}

// ---------------------------------------------------------------------------
// Find & Replace tab
// ---------------------------------------------------------------------------

pub fn find_replace_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(label) = state.selected.clone() else {
        ui.label("Select a function in the side panel.");
        return;
    };
    ui.heading(format!("Find & Replace in {label}"));
    ui.label("Matches compare the Intensity column against the find value ± tolerance.");
    ui.add_space(6.0);

    egui::Grid::new("find_replace_grid")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("Find value:");
            ui.text_edit_singleline(&mut state.find_text);
            ui.end_row();

            ui.label("Replace with:");
            ui.text_edit_singleline(&mut state.replace_text);
            ui.end_row();

            ui.label("Tolerance:");
            ui.text_edit_singleline(&mut state.tolerance_text);
            ui.end_row();
        });

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Find").clicked() {
            state.run_find();
        }
        if ui.button("Replace").clicked() {
            state.request_replace();
        }
    });

    if let Some(pending) = state.pending_replace.clone() {
        ui.separator();
        ui.label(format!(
            "Replace {} occurrence(s) of {} with {}?",
            pending.count, pending.target, pending.replacement
        ));
        ui.horizontal(|ui: &mut Ui| {
            if ui.button("Confirm").clicked() {
                state.confirm_replace();
            }
            if ui.button("Cancel").clicked() {
                state.pending_replace = None;
            }
        });
    }

    if let Some(result) = &state.find_result {
        ui.separator();
        ui.label(result.as_str());
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn choose_output_dir(state: &mut AppState) {
    if let Some(dir) = rfd::FileDialog::new()
        .set_title("Select output directory")
        .pick_folder()
    {
        log::info!("output directory set to {}", dir.display());
        state.output_dir = Some(dir);
    }
}

pub fn parse_dialog(state: &mut AppState) {
    if state.output_dir.is_none() {
        choose_output_dir(state);
    }
    let files = rfd::FileDialog::new()
        .set_title("Select ASCII/CDF files")
        .add_filter("Raw files", &["txt", "asc", "dat", "cdf", "nc"])
        .add_filter("ASCII", &["txt", "asc", "dat"])
        .add_filter("NetCDF", &["cdf", "nc"])
        .pick_files();

    if let Some(paths) = files {
        state.parse_files(paths);
    }
}

pub fn load_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Select CSV files")
        .add_filter("Tables", &["csv", "parquet"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet"])
        .pick_files();

    if let Some(paths) = files {
        state.load_tables(paths);
    }
}

fn selected_label(state: &mut AppState) -> Option<String> {
    let label = state.selected.clone();
    if label.is_none() {
        state.set_error("Select a function first.");
    }
    label
}

pub fn save_table_dialog(state: &mut AppState) {
    let Some(label) = selected_label(state) else {
        return;
    };
    let path: Option<PathBuf> = rfd::FileDialog::new()
        .set_title("Save table")
        .set_file_name(format!("{label}.csv"))
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet"])
        .save_file();

    if let Some(path) = path {
        match state.session.save_table(&label, &path) {
            Ok(()) => state.set_status(format!("Saved {}", path.display())),
            Err(e) => state.set_error(format!("Failed to save table: {e}")),
        }
    }
}

pub fn export_channels_dialog(state: &mut AppState) {
    let Some(label) = selected_label(state) else {
        return;
    };
    if state.channel_selection.is_empty() {
        state.set_error("Select a channel to export.");
        return;
    }
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Export channels to folder")
        .pick_folder()
    else {
        return;
    };

    let channels: Vec<i64> = state.channel_selection.iter().copied().collect();
    let mut written = 0;
    for channel in channels {
        match state.session.export_channel(&label, channel, &dir) {
            Ok(_) => written += 1,
            Err(e) => return state.set_error(format!("Failed to save channel: {e}")),
        }
    }
    state.set_status(format!("Saved {written} channel file(s) to {}", dir.display()));
}

pub fn save_plot_dialog(state: &mut AppState) {
    let Some(label) = selected_label(state) else {
        return;
    };
    let path = rfd::FileDialog::new()
        .set_title("Save plot")
        .set_file_name(format!("{label}.png"))
        .add_filter("PNG", &["png"])
        .save_file();

    if let Some(path) = path {
        let channels: Vec<i64> = state.channel_selection.iter().copied().collect();
        match state
            .session
            .plot(&label, &channels, &state.settings.plot, &path)
        {
            Ok(()) => state.set_status(format!("Saved {}", path.display())),
            Err(e) => state.set_error(format!("Error generating plot: {e}")),
        }
    }
}
