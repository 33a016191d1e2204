use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ExportSettings, PlotSettings};
use crate::data::export::{csv_file_name, export_channel, parquet_file_name};
use crate::data::{
    common_channels, compare, find_value, load_table, normalize, parse_file, replace_value,
    write_csv, write_parquet, ChannelSeries, FunctionTable, SourceFormat,
};
use crate::error::{Error, Result};
use crate::render::{render_channels, render_comparison};

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// Inputs of a parse run.
#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub output_dir: PathBuf,
    /// Force a format instead of guessing from each file's extension.
    pub format: Option<SourceFormat>,
    pub export: ExportSettings,
    pub plot: PlotSettings,
}

impl ParseRequest {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: None,
            export: ExportSettings::default(),
            plot: PlotSettings::default(),
        }
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.output_dir.join(&self.export.csv_dir)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_dir.join(&self.export.plots_dir)
    }
}

/// What a parse run produced, file by file.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    /// Labels of tables now held by the session, in parse order.
    pub tables: Vec<String>,
    pub files_written: Vec<PathBuf>,
    /// Recovered per-line problems, summed over all inputs.
    pub warnings: usize,
    /// One line per failure; the run continued past each of them.
    pub messages: Vec<String>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.messages.is_empty()
    }

    /// Status line for a front end.
    pub fn summary(&self) -> String {
        if self.messages.is_empty() {
            format!(
                "Parsing complete: {} table(s), {} file(s) written, {} warning(s).",
                self.tables.len(),
                self.files_written.len(),
                self.warnings
            )
        } else {
            self.messages.join("\n")
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// `(file name, reason)`
    pub skipped: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Tables the user is working with, keyed by label.
///
/// Every user action is a method that returns its result or a typed error;
/// front ends only decide how to present them.
///
/// Labels are derived from file names, so two files may claim the same one.
/// The file that supplied a label keeps it; a table with that label from
/// any other file is refused with [`Error::DuplicateLabel`]. Reading the
/// same file again replaces its tables.
#[derive(Debug, Default)]
pub struct Session {
    tables: BTreeMap<String, FunctionTable>,
    origins: BTreeMap<String, PathBuf>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, label: &str) -> Result<&FunctionTable> {
        self.tables
            .get(label)
            .ok_or_else(|| Error::UnknownTable(label.to_string()))
    }

    fn table_mut(&mut self, label: &str) -> Result<&mut FunctionTable> {
        self.tables
            .get_mut(label)
            .ok_or_else(|| Error::UnknownTable(label.to_string()))
    }

    /// Add (or replace) a table under its own label.
    pub fn insert(&mut self, table: FunctionTable) -> String {
        let label = table.label();
        self.origins.remove(&label);
        if self.tables.insert(label.clone(), table).is_some() {
            log::debug!("replaced table {label}");
        }
        label
    }

    /// Add a table read from `origin`, unless a different file already
    /// supplied its label.
    pub fn insert_from(&mut self, table: FunctionTable, origin: &Path) -> Result<String> {
        let label = table.label();
        self.check_origin(&label, origin)?;
        let label = self.insert(table);
        self.origins.insert(label.clone(), origin.to_path_buf());
        Ok(label)
    }

    fn check_origin(&self, label: &str, origin: &Path) -> Result<()> {
        match self.origins.get(label) {
            Some(existing) if existing != origin => Err(Error::DuplicateLabel {
                label: label.to_string(),
                existing: existing.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Parse raw files, write their tables (and plots) under the output
    /// directory and keep them in the session.
    ///
    /// A failing file is reported and skipped; the others still run.
    pub fn parse_files(&mut self, paths: &[PathBuf], request: &ParseRequest) -> Result<ParseReport> {
        let csv_dir = request.csv_dir();
        let plots_dir = request.plots_dir();
        std::fs::create_dir_all(&csv_dir).map_err(|e| Error::write(&csv_dir, e))?;
        if request.export.write_plots {
            std::fs::create_dir_all(&plots_dir).map_err(|e| Error::write(&plots_dir, e))?;
        }

        let mut report = ParseReport::default();
        for path in paths {
            let name = display_name(path);
            let Some(format) = request.format.or_else(|| SourceFormat::from_path(path)) else {
                log::warn!("{}: unsupported format", path.display());
                report.messages.push(format!("Unsupported format: {}", path.display()));
                continue;
            };

            let outcome = match parse_file(path, format) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("{e}");
                    report.messages.push(format!("Error parsing {name}: {e}"));
                    continue;
                }
            };
            report.warnings += outcome.warnings.len();

            for raw in &outcome.tables {
                let table = normalize(raw);
                let label = table.label();
                if let Err(e) = self.check_origin(&label, path) {
                    log::warn!("{}: {e}", path.display());
                    report.messages.push(format!("Skipped {label} from {name}: {e}"));
                    continue;
                }

                let csv_path = csv_dir.join(csv_file_name(&table));
                match write_csv(&table, &csv_path) {
                    Ok(()) => report.files_written.push(csv_path),
                    Err(e) => report.messages.push(format!("Failed to write CSV for {label}: {e}")),
                }
                if request.export.write_parquet {
                    let pq_path = csv_dir.join(parquet_file_name(&table));
                    match write_parquet(&table, &pq_path) {
                        Ok(()) => report.files_written.push(pq_path),
                        Err(e) => report.messages.push(format!("Failed to write Parquet for {label}: {e}")),
                    }
                }
                if request.export.write_plots {
                    let png_path = plots_dir.join(format!("{label}.png"));
                    match render_channels(&table, &[], &request.plot, &png_path) {
                        Ok(()) => report.files_written.push(png_path),
                        Err(e) => report.messages.push(format!("Failed to plot {label}: {e}")),
                    }
                }

                self.insert_from(table, path)?;
                report.tables.push(label);
            }
        }
        Ok(report)
    }

    /// Load exported CSV / Parquet tables. Unreadable files and tables whose
    /// label another file already holds are skipped.
    pub fn load_tables(&mut self, paths: &[PathBuf]) -> LoadReport {
        let mut report = LoadReport::default();
        for path in paths {
            match load_table(path) {
                Ok(table) => match self.insert_from(table, path) {
                    Ok(label) => report.loaded.push(label),
                    Err(e) => {
                        log::warn!("skipping {}: {e}", path.display());
                        report.skipped.push((display_name(path), e.to_string()));
                    }
                },
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    report.skipped.push((display_name(path), e.to_string()));
                }
            }
        }
        report
    }

    pub fn channels(&self, label: &str) -> Result<Vec<i64>> {
        Ok(self.table(label)?.channels())
    }

    pub fn common_channels(&self, a: &str, b: &str) -> Result<Vec<i64>> {
        Ok(common_channels(self.table(a)?, self.table(b)?))
    }

    /// Write one channel of a table to `dir/<label>_channel_<c>.csv`.
    pub fn export_channel(&self, label: &str, channel: i64, dir: &Path) -> Result<PathBuf> {
        let table = self.table(label)?;
        if !table.has_channel(channel) {
            return Err(Error::MissingChannel {
                table: label.to_string(),
                channel,
            });
        }
        export_channel(table, channel, dir)
    }

    /// Write the current state of a table (after edits) to `path`.
    pub fn save_table(&self, label: &str, path: &Path) -> Result<()> {
        let table = self.table(label)?;
        let is_parquet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
        if is_parquet {
            write_parquet(table, path)
        } else {
            write_csv(table, path)
        }
    }

    pub fn find(&self, label: &str, target: f64, tolerance: f64) -> Result<usize> {
        Ok(find_value(self.table(label)?, target, tolerance))
    }

    pub fn replace(&mut self, label: &str, target: f64, replacement: f64, tolerance: f64) -> Result<usize> {
        Ok(replace_value(self.table_mut(label)?, target, replacement, tolerance))
    }

    pub fn compare(&self, a: &str, b: &str, channel: i64) -> Result<(ChannelSeries, ChannelSeries)> {
        compare(self.table(a)?, self.table(b)?, channel)
    }

    pub fn plot(&self, label: &str, channels: &[i64], settings: &PlotSettings, path: &Path) -> Result<()> {
        render_channels(self.table(label)?, channels, settings, path)
    }

    pub fn plot_comparison(
        &self,
        a: &str,
        b: &str,
        channel: i64,
        settings: &PlotSettings,
        path: &Path,
    ) -> Result<()> {
        let (sa, sb) = self.compare(a, b, channel)?;
        render_comparison(&sa, &sb, settings, path)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: &str = "\
FUNCTION 1
1 0.1 73 10
2 0.2 73 20
1 0.1 74 5
FUNCTION 2
1 0.1 73 7
bad line here
";

    fn quick_request(out: &Path) -> ParseRequest {
        let mut request = ParseRequest::new(out);
        request.plot = PlotSettings {
            width: 2.0,
            height: 1.0,
            dpi: 40,
        };
        request
    }

    #[test]
    fn parse_run_writes_csv_and_png_per_function() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("run.txt");
        std::fs::write(&raw, RUN).unwrap();
        let out = dir.path().join("out");

        let mut session = Session::new();
        let report = session.parse_files(&[raw], &quick_request(&out)).unwrap();

        assert!(report.is_clean(), "{:?}", report.messages);
        assert_eq!(report.tables, vec!["run_Function_1", "run_Function_2"]);
        assert_eq!(report.warnings, 1);
        assert!(out.join("csv/run_Function_1.csv").is_file());
        assert!(out.join("csv/run_Function_2.csv").is_file());
        assert!(out.join("plots/run_Function_1.png").is_file());
        assert_eq!(session.channels("run_Function_1").unwrap(), vec![73, 74]);
    }

    #[test]
    fn bad_inputs_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "1 0.1 73 10\n").unwrap();
        let paths = vec![
            dir.path().join("notes.docx"),
            dir.path().join("missing.txt"),
            good,
        ];

        let mut session = Session::new();
        let mut request = quick_request(dir.path());
        request.export.write_plots = false;
        let report = session.parse_files(&paths, &request).unwrap();

        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].starts_with("Unsupported format"));
        assert!(report.messages[1].starts_with("Error parsing missing.txt"));
        assert_eq!(report.tables, vec!["good_Function_1"]);
        assert!(!dir.path().join("plots").exists());
    }

    #[test]
    fn find_replace_and_unknown_labels() {
        let mut session = Session::new();
        let label = session.insert(FunctionTable::new(
            "s",
            1,
            vec![
                crate::data::MeasurementRow::new(1, 0.1, 73, 100.2),
                crate::data::MeasurementRow::new(2, 0.2, 73, 99.9),
            ],
        ));
        assert_eq!(session.find(&label, 100.0, 0.5).unwrap(), 2);
        assert_eq!(session.replace(&label, 100.0, 0.0, 0.5).unwrap(), 2);
        assert_eq!(session.table(&label).unwrap().modifications, 2);
        assert_eq!(session.find(&label, 100.0, 0.5).unwrap(), 0);
        assert!(matches!(session.find("nope", 1.0, 0.0), Err(Error::UnknownTable(_))));
    }

    #[test]
    fn export_of_absent_channel_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new();
        let label = session.insert(FunctionTable::new(
            "s",
            1,
            vec![crate::data::MeasurementRow::new(1, 0.1, 73, 1.0)],
        ));
        assert!(matches!(
            session.export_channel(&label, 74, dir.path()),
            Err(Error::MissingChannel { channel: 74, .. })
        ));
        let path = session.export_channel(&label, 73, dir.path()).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn same_label_from_another_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (day, intensity) in [("day1", 10.0), ("day2", 99.0)] {
            let sub = dir.path().join(day);
            std::fs::create_dir(&sub).unwrap();
            let path = sub.join("run_Function_1.csv");
            let table = FunctionTable::new(
                "run",
                1,
                vec![crate::data::MeasurementRow::new(1, 0.1, 73, intensity)],
            );
            write_csv(&table, &path).unwrap();
            paths.push(path);
        }

        let mut session = Session::new();
        let report = session.load_tables(&paths);
        assert_eq!(report.loaded, vec!["run_Function_1"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].1.contains("already loaded"), "{:?}", report.skipped);
        assert_eq!(session.len(), 1);
        let (kept, _) = session.compare("run_Function_1", "run_Function_1", 73).unwrap();
        assert_eq!(kept.points, vec![(0.1, 10.0)]);

        // Reloading the file that owns the label refreshes it.
        let again = session.load_tables(&paths[..1]);
        assert_eq!(again.loaded, vec!["run_Function_1"]);
        assert!(again.skipped.is_empty());
    }

    #[test]
    fn raw_files_claiming_the_same_label_do_not_overwrite_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut raws = Vec::new();
        for (day, intensity) in [("day1", "10"), ("day2", "99")] {
            let sub = dir.path().join(day);
            std::fs::create_dir(&sub).unwrap();
            let raw = sub.join("run.txt");
            std::fs::write(&raw, format!("FUNCTION 1\n1 0.1 73 {intensity}\n")).unwrap();
            raws.push(raw);
        }
        let out = dir.path().join("out");
        let mut request = quick_request(&out);
        request.export.write_plots = false;

        let mut session = Session::new();
        let report = session.parse_files(&raws, &request).unwrap();
        assert_eq!(report.tables, vec!["run_Function_1"]);
        assert_eq!(report.messages.len(), 1);
        assert!(report.messages[0].starts_with("Skipped run_Function_1 from run.txt"));

        let saved = std::fs::read_to_string(out.join("csv/run_Function_1.csv")).unwrap();
        assert!(saved.contains(",73,10"), "{saved}");
    }
}
