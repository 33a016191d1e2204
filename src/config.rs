//! JSON settings shared by the viewer and the command line tool.
//!
//! Every field is optional; missing fields take the defaults below.
//!
//! ```json
//! {
//!   "plot":   { "width": 8.0, "height": 5.0, "dpi": 300 },
//!   "export": { "csv_dir": "csv", "plots_dir": "plots",
//!               "write_plots": true, "write_parquet": false },
//!   "find":   { "tolerance": 0.0 }
//! }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_TOLERANCE;

/// Root settings structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub plot: PlotSettings,
    pub export: ExportSettings,
    pub find: FindSettings,
}

/// Size of rendered figures. The pixel size is `width * dpi` by
/// `height * dpi`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    /// Inches.
    pub width: f64,
    /// Inches.
    pub height: f64,
    pub dpi: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 5.0,
            dpi: 300,
        }
    }
}

/// Largest figure side accepted, in pixels.
pub const MAX_PIXELS_PER_SIDE: u32 = 10_000;

impl PlotSettings {
    /// Canvas size in pixels, or `None` when a side is not finite, rounds
    /// below one pixel or exceeds [`MAX_PIXELS_PER_SIDE`].
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        let px = |inches: f64| {
            let v = (inches * f64::from(self.dpi)).round();
            (v.is_finite() && v >= 1.0 && v <= f64::from(MAX_PIXELS_PER_SIDE)).then_some(v as u32)
        };
        Some((px(self.width)?, px(self.height)?))
    }
}

/// Layout of a parse run's output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub csv_dir: String,
    pub plots_dir: String,
    pub write_plots: bool,
    pub write_parquet: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            csv_dir: "csv".to_string(),
            plots_dir: "plots".to_string(),
            write_plots: true,
            write_parquet: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindSettings {
    pub tolerance: f64,
}

impl Default for FindSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse settings from a JSON string.
    pub fn from_str(content: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(content).context("Failed to parse JSON settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let plot = &self.plot;
        if !(plot.width > 0.0 && plot.width.is_finite()) || !(plot.height > 0.0 && plot.height.is_finite()) {
            bail!("plot width and height must be positive, got {}x{}", plot.width, plot.height);
        }
        if plot.dpi == 0 {
            bail!("plot dpi must be at least 1");
        }
        if plot.pixel_size().is_none() {
            bail!(
                "plot size {}x{} in at {} dpi is outside 1..={MAX_PIXELS_PER_SIDE} pixels per side",
                plot.width,
                plot.height,
                plot.dpi
            );
        }
        if !(self.find.tolerance >= 0.0) {
            bail!("find tolerance must be non-negative, got {}", self.find.tolerance);
        }
        if self.export.csv_dir.is_empty() || self.export.plots_dir.is_empty() {
            bail!("export directory names must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let s = Settings::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.plot.pixel_size(), Some((2400, 1500)));
        assert!(s.export.write_plots);
        assert_eq!(s.find.tolerance, 0.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let s = Settings::from_str(r#"{ "plot": { "dpi": 100 }, "export": { "write_parquet": true } }"#).unwrap();
        assert_eq!(s.plot.dpi, 100);
        assert_eq!(s.plot.width, 8.0);
        assert_eq!(s.plot.pixel_size(), Some((800, 500)));
        assert!(s.export.write_parquet);
        assert_eq!(s.export.csv_dir, "csv");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Settings::from_str(r#"{ "plot": { "width": 0 } }"#).is_err());
        assert!(Settings::from_str(r#"{ "plot": { "dpi": 0 } }"#).is_err());
        assert!(Settings::from_str(r#"{ "find": { "tolerance": -1 } }"#).is_err());
        assert!(Settings::from_str("not json").is_err());
    }

    #[test]
    fn oversized_figures_are_rejected() {
        let huge = PlotSettings {
            width: 1e6,
            height: 1e6,
            dpi: 300,
        };
        assert_eq!(huge.pixel_size(), None);
        let settings = Settings {
            plot: huge,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let tiny = PlotSettings {
            width: 0.001,
            height: 1.0,
            dpi: 72,
        };
        assert_eq!(tiny.pixel_size(), None);

        let edge = PlotSettings {
            width: 100.0,
            height: 1.0,
            dpi: 100,
        };
        assert_eq!(edge.pixel_size(), Some((MAX_PIXELS_PER_SIDE, 100)));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = Settings::from_file(Path::new("/no/such/settings.json")).unwrap_err();
        assert!(format!("{err:#}").contains("settings file"));
    }
}
