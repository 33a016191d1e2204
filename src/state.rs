use std::collections::BTreeSet;
use std::path::PathBuf;

use msanalyzer::color::ChannelColors;
use msanalyzer::config::{PlotSettings, Settings};
use msanalyzer::data::{ChannelSeries, MeasurementRow};
use msanalyzer::session::{ParseRequest, Session};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Which view the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Plot,
    Table,
    Compare,
    FindReplace,
}

/// A replacement waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReplace {
    pub target: f64,
    pub replacement: f64,
    pub tolerance: f64,
    pub count: usize,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded tables and every action on them.
    pub session: Session,

    pub settings: Settings,

    /// Where parse runs write `csv/` and `plots/`.
    pub output_dir: Option<PathBuf>,

    /// Label of the table shown in Plot / Table / Find & Replace.
    pub selected: Option<String>,

    /// Channels ticked in the side panel.
    pub channel_selection: BTreeSet<i64>,

    /// Colours for the selected table's channels.
    pub channel_colors: Option<ChannelColors>,

    pub tab: Tab,

    /// Figure size being edited in the Plot tab; applied after validation.
    pub plot_draft: PlotSettings,

    /// Free-text row search of the Table tab.
    pub table_query: String,

    pub compare_a: Option<String>,
    pub compare_b: Option<String>,
    pub compare_channel: Option<i64>,
    pub comparison: Option<(ChannelSeries, ChannelSeries)>,

    pub find_text: String,
    pub replace_text: String,
    pub tolerance_text: String,
    pub pending_replace: Option<PendingReplace>,
    pub find_result: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
    pub status_is_error: bool,
}

impl Default for AppState {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            session: Session::new(),
            tolerance_text: settings.find.tolerance.to_string(),
            output_dir: None,
            selected: None,
            channel_selection: BTreeSet::new(),
            channel_colors: None,
            tab: Tab::Plot,
            plot_draft: settings.plot.clone(),
            table_query: String::new(),
            settings,
            compare_a: None,
            compare_b: None,
            compare_channel: None,
            comparison: None,
            find_text: String::new(),
            replace_text: String::new(),
            pending_replace: None,
            find_result: None,
            status_message: None,
            status_is_error: false,
        }
    }
}

impl AppState {
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::error!("{msg}");
        self.status_message = Some(msg);
        self.status_is_error = true;
    }

    /// Parse raw files into the output directory and show the first table.
    pub fn parse_files(&mut self, paths: Vec<PathBuf>) {
        let Some(output_dir) = self.output_dir.clone() else {
            self.set_error("Please select an output directory first.");
            return;
        };
        let request = ParseRequest {
            output_dir,
            format: None,
            export: self.settings.export.clone(),
            plot: self.settings.plot.clone(),
        };
        match self.session.parse_files(&paths, &request) {
            Ok(report) => {
                if report.is_clean() {
                    self.set_status(report.summary());
                } else {
                    self.set_error(report.summary());
                }
                if let Some(first) = report.tables.first().cloned() {
                    self.select_table(first);
                }
            }
            Err(e) => self.set_error(format!("Error: {e}")),
        }
    }

    /// Load exported CSV / Parquet tables.
    pub fn load_tables(&mut self, paths: Vec<PathBuf>) {
        let report = self.session.load_tables(&paths);
        if report.skipped.is_empty() {
            self.set_status(format!("Loaded {} table(s).", report.loaded.len()));
        } else {
            let skipped: Vec<String> = report
                .skipped
                .iter()
                .map(|(name, reason)| format!("{name} ({reason})"))
                .collect();
            self.set_error(format!("Skipped files: {}", skipped.join(", ")));
        }
        if self.selected.is_none() {
            if let Some(first) = report.loaded.first().cloned() {
                self.select_table(first);
            }
        }
    }

    /// Switch the current table; all of its channels start selected.
    pub fn select_table(&mut self, label: String) {
        let channels = self.session.channels(&label).unwrap_or_default();
        self.channel_colors = Some(ChannelColors::new(&channels));
        self.channel_selection = channels.into_iter().collect();
        self.pending_replace = None;
        self.find_result = None;
        self.selected = Some(label);
    }

    pub fn toggle_channel(&mut self, channel: i64) {
        if !self.channel_selection.remove(&channel) {
            self.channel_selection.insert(channel);
        }
    }

    pub fn select_all_channels(&mut self) {
        if let Some(label) = &self.selected {
            let channels = self.session.channels(label).unwrap_or_default();
            self.channel_selection = channels.into_iter().collect();
        }
    }

    pub fn select_no_channels(&mut self) {
        self.channel_selection.clear();
    }

    /// Check the edited figure size and make it the one used for PNGs.
    pub fn apply_plot_settings(&mut self) {
        let candidate = Settings {
            plot: self.plot_draft.clone(),
            ..self.settings.clone()
        };
        match candidate.validate() {
            Ok(()) => {
                self.settings = candidate;
                let p = &self.settings.plot;
                let msg = format!("Figure size set to {} x {} in at {} dpi.", p.width, p.height, p.dpi);
                self.set_status(msg);
            }
            Err(e) => {
                self.plot_draft = self.settings.plot.clone();
                self.set_error(format!("Invalid figure size: {e}"));
            }
        }
    }

    /// Rows of the selected table shown in the Table tab: ticked channels
    /// only, narrowed by the search text when there is one.
    pub fn visible_rows(&self) -> Vec<&MeasurementRow> {
        let Some(table) = self
            .selected
            .as_deref()
            .and_then(|label| self.session.table(label).ok())
        else {
            return Vec::new();
        };
        let query = self.table_query.trim().to_lowercase();
        table
            .rows
            .iter()
            .filter(|r| self.channel_selection.contains(&r.channel))
            .filter(|r| query.is_empty() || row_matches(r, &query))
            .collect()
    }

    /// Channels common to both compare selections.
    pub fn compare_candidates(&self) -> Vec<i64> {
        match (&self.compare_a, &self.compare_b) {
            (Some(a), Some(b)) => self.session.common_channels(a, b).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Rebuild the comparison after any selection change.
    pub fn refresh_comparison(&mut self) {
        self.comparison = None;
        let (Some(a), Some(b), Some(channel)) = (&self.compare_a, &self.compare_b, self.compare_channel) else {
            return;
        };
        match self.session.compare(a, b, channel) {
            Ok(pair) => self.comparison = Some(pair),
            Err(e) => {
                let msg = format!("Failed to compare: {e}");
                self.set_error(msg);
            }
        }
    }

    fn parse_number(text: &str, what: &str) -> Result<f64, String> {
        text.trim()
            .parse::<f64>()
            .map_err(|_| format!("{what} must be numeric."))
    }

    /// Count matches of the find value in the selected table.
    pub fn run_find(&mut self) {
        self.pending_replace = None;
        let Some(label) = self.selected.clone() else {
            self.set_error("Select a function.");
            return;
        };
        let parsed = Self::parse_number(&self.find_text, "Find value")
            .and_then(|t| Ok((t, Self::parse_number(&self.tolerance_text, "Tolerance")?)));
        let (target, tolerance) = match parsed {
            Ok(v) => v,
            Err(msg) => return self.set_error(msg),
        };
        match self.session.find(&label, target, tolerance) {
            Ok(count) => self.find_result = Some(format!("Found {count} occurrence(s) of {target} in {label}.")),
            Err(e) => self.set_error(e.to_string()),
        }
    }

    /// First step of a replacement: count and ask for confirmation.
    pub fn request_replace(&mut self) {
        let Some(label) = self.selected.clone() else {
            self.set_error("Select a function.");
            return;
        };
        let parsed = (|| -> Result<(f64, f64, f64), String> {
            Ok((
                Self::parse_number(&self.find_text, "Find value")?,
                Self::parse_number(&self.replace_text, "Replace value")?,
                Self::parse_number(&self.tolerance_text, "Tolerance")?,
            ))
        })();
        let (target, replacement, tolerance) = match parsed {
            Ok(v) => v,
            Err(msg) => return self.set_error(msg),
        };
        match self.session.find(&label, target, tolerance) {
            Ok(0) => {
                self.pending_replace = None;
                self.find_result = Some(format!("Value {target} not found in {label}."));
            }
            Ok(count) => {
                self.pending_replace = Some(PendingReplace {
                    target,
                    replacement,
                    tolerance,
                    count,
                });
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    /// Second step: apply the confirmed replacement.
    pub fn confirm_replace(&mut self) {
        let (Some(pending), Some(label)) = (self.pending_replace.take(), self.selected.clone()) else {
            return;
        };
        match self
            .session
            .replace(&label, pending.target, pending.replacement, pending.tolerance)
        {
            Ok(count) => {
                self.find_result = Some(format!(
                    "Replaced {count} occurrence(s) of {} with {} in {label}.",
                    pending.target, pending.replacement
                ));
                self.refresh_comparison();
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }
}

/// Cells as the Table tab displays them.
pub fn row_cells(row: &MeasurementRow) -> [String; 4] {
    [
        row.scan.to_string(),
        format!("{:.4}", row.retention_time),
        row.channel.to_string(),
        row.intensity.to_string(),
    ]
}

/// `query` is already lower-cased.
fn row_matches(row: &MeasurementRow, query: &str) -> bool {
    row_cells(row)
        .iter()
        .any(|cell| cell.to_lowercase().contains(query))
}
