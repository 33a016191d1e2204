use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column names of the exported schema, in output order.
pub const COLUMNS: [&str; 4] = ["Scan", "Retention Time", "Channel", "Intensity"];

// ---------------------------------------------------------------------------
// MeasurementRow – one ordinal data point
// ---------------------------------------------------------------------------

/// A single (scan, retention time, channel, intensity) data point.
///
/// The field order is the column order of every exported file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    #[serde(rename = "Scan")]
    pub scan: u32,
    #[serde(rename = "Retention Time")]
    pub retention_time: f64,
    #[serde(rename = "Channel")]
    pub channel: i64,
    #[serde(rename = "Intensity")]
    pub intensity: f64,
}

impl MeasurementRow {
    pub fn new(scan: u32, retention_time: f64, channel: i64, intensity: f64) -> Self {
        Self {
            scan,
            retention_time,
            channel,
            intensity,
        }
    }

    /// Total order over all four fields (floats via `total_cmp`).
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.scan
            .cmp(&other.scan)
            .then(self.channel.cmp(&other.channel))
            .then(self.retention_time.total_cmp(&other.retention_time))
            .then(self.intensity.total_cmp(&other.intensity))
    }

    /// Bitwise equality, so NaN rows still deduplicate.
    pub fn same_as(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

/// Convert a mass value to its nominal integer channel.
///
/// Returns `None` for NaN / infinite input or values outside `i64`.
pub fn nominal_channel(mass: f64) -> Option<i64> {
    if !mass.is_finite() {
        return None;
    }
    let rounded = mass.round();
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

// ---------------------------------------------------------------------------
// FunctionTable – the normalized output of one function block
// ---------------------------------------------------------------------------

/// Rows of one acquisition function, tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTable {
    /// Stem of the originating file name.
    pub source: String,
    /// 1-based function ordinal.
    pub function: u32,
    pub rows: Vec<MeasurementRow>,
    /// Number of intensity cells rewritten by find & replace.
    pub modifications: u64,
}

impl FunctionTable {
    pub fn new(source: impl Into<String>, function: u32, rows: Vec<MeasurementRow>) -> Self {
        Self {
            source: source.into(),
            function,
            rows,
            modifications: 0,
        }
    }

    /// `<source>_Function_<n>`, used for file names and session keys.
    pub fn label(&self) -> String {
        format!("{}_Function_{}", self.source, self.function)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted unique channel ids.
    pub fn channels(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|r| r.channel)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_channel(&self, channel: i64) -> bool {
        self.rows.iter().any(|r| r.channel == channel)
    }
}

/// Split a label (or file stem) back into `(source, function)`.
///
/// Stems without a `_Function_<n>` suffix are treated as function 1.
pub fn split_label(stem: &str) -> (String, u32) {
    if let Some(pos) = stem.rfind("_Function_") {
        let digits = &stem[pos + "_Function_".len()..];
        if let Ok(n) = digits.parse::<u32>() {
            return (stem[..pos].to_string(), n);
        }
    }
    (stem.to_string(), 1)
}

// ---------------------------------------------------------------------------
// Parse results
// ---------------------------------------------------------------------------

/// A recovered malformation in ASCII input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number in the input file.
    pub line: usize,
    /// Function block the line belonged to (0 before the first header).
    pub function: u32,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} (function {}): {}",
            self.line, self.function, self.message
        )
    }
}

/// Tables in input order plus every warning recorded along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub tables: Vec<FunctionTable>,
    pub warnings: Vec<ParseWarning>,
}

impl ParseOutcome {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_split() {
        let table = FunctionTable::new("run_01", 3, Vec::new());
        assert_eq!(table.label(), "run_01_Function_3");
        assert_eq!(split_label(&table.label()), ("run_01".to_string(), 3));
    }

    #[test]
    fn split_label_without_suffix_defaults_to_function_one() {
        assert_eq!(split_label("blank"), ("blank".to_string(), 1));
        assert_eq!(split_label("x_Function_abc"), ("x_Function_abc".to_string(), 1));
    }

    #[test]
    fn nominal_channel_rounds_and_rejects_non_finite() {
        assert_eq!(nominal_channel(73.04), Some(73));
        assert_eq!(nominal_channel(72.5), Some(73));
        assert_eq!(nominal_channel(f64::NAN), None);
        assert_eq!(nominal_channel(f64::INFINITY), None);
    }

    #[test]
    fn channels_are_sorted_and_unique() {
        let rows = vec![
            MeasurementRow::new(1, 0.1, 5, 1.0),
            MeasurementRow::new(1, 0.1, 2, 1.0),
            MeasurementRow::new(2, 0.2, 5, 1.0),
        ];
        let table = FunctionTable::new("s", 1, rows);
        assert_eq!(table.channels(), vec![2, 5]);
        assert!(table.has_channel(2));
        assert!(!table.has_channel(3));
    }
}
