use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;

use arrow::array::{Array, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{Error, Result};

use super::ascii::{parse_ascii, source_stem};
use super::cdf::parse_cdf;
use super::model::{split_label, FunctionTable, MeasurementRow, ParseOutcome, COLUMNS};

// ---------------------------------------------------------------------------
// Raw input formats
// ---------------------------------------------------------------------------

/// Declared format of a raw instrument file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Text export with `FUNCTION <n>` blocks.
    Ascii,
    /// NetCDF classic (ANDI-MS) container.
    Cdf,
}

impl SourceFormat {
    /// Guess from the extension: `.txt`/`.asc`/`.dat` → ASCII,
    /// `.cdf`/`.nc` → CDF.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "asc" | "dat" => Some(SourceFormat::Ascii),
            "cdf" | "nc" => Some(SourceFormat::Cdf),
            _ => None,
        }
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" | "txt" => Ok(SourceFormat::Ascii),
            "cdf" | "netcdf" => Ok(SourceFormat::Cdf),
            other => Err(format!("unknown format '{other}' (expected ascii or cdf)")),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Ascii => write!(f, "ascii"),
            SourceFormat::Cdf => write!(f, "cdf"),
        }
    }
}

/// Parse a raw file in the declared format.
///
/// ASCII files yield one table per `FUNCTION` block; CDF files always yield
/// a single table with function index 1.
pub fn parse_file(path: &Path, format: SourceFormat) -> Result<ParseOutcome> {
    match format {
        SourceFormat::Ascii => parse_ascii(path),
        SourceFormat::Cdf => parse_cdf(path),
    }
}

// ---------------------------------------------------------------------------
// Exported tables
// ---------------------------------------------------------------------------

/// Load a previously exported table. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header with `Scan`, `Retention Time`, `Channel`, `Intensity`
///   (any case, any column order, extra columns ignored)
/// * `.parquet` – the schema written by [`super::export::write_parquet`]
///
/// The label is recovered from the file stem.
pub fn load_table(path: &Path) -> Result<FunctionTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => load_csv_rows(path)?,
        "parquet" | "pq" => load_parquet_rows(path)?,
        other => return Err(Error::format(path, format!("unsupported table extension .{other}"))),
    };

    let (source, function) = split_label(&source_stem(path));
    Ok(FunctionTable::new(source, function, rows))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv_rows(path: &Path) -> Result<Vec<MeasurementRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| Error::access(path, io::Error::from(e)))?;
    let headers = reader
        .headers()
        .map_err(|e| Error::format(path, format!("reading CSV header: {e}")))?
        .clone();

    let mut idx = [0usize; 4];
    for (slot, name) in idx.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::format(path, format!("CSV missing '{name}' column")))?;
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::format(path, format!("CSV row {row_no}: {e}")))?;
        let field = |i: usize| record.get(idx[i]).unwrap_or("").trim();
        let bad = |col: &str| Error::format(path, format!("CSV row {row_no}: '{col}' is not a number"));

        let scan = parse_scan_cell(field(0)).ok_or_else(|| bad(COLUMNS[0]))?;
        let retention_time = field(1).parse::<f64>().map_err(|_| bad(COLUMNS[1]))?;
        let channel = parse_channel_cell(field(2)).ok_or_else(|| bad(COLUMNS[2]))?;
        let intensity = field(3).parse::<f64>().map_err(|_| bad(COLUMNS[3]))?;
        rows.push(MeasurementRow::new(scan, retention_time, channel, intensity));
    }

    log::info!("{}: loaded {} rows", path.display(), rows.len());
    Ok(rows)
}

/// Integer cells written by other tools may carry a `.0` suffix.
fn parse_scan_cell(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().or_else(|| {
        let v = s.parse::<f64>().ok()?;
        (v.fract() == 0.0 && v >= 0.0 && v <= f64::from(u32::MAX)).then_some(v as u32)
    })
}

fn parse_channel_cell(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(super::model::nominal_channel))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet_rows(path: &Path) -> Result<Vec<MeasurementRow>> {
    let file = File::open(path).map_err(|e| Error::access(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::format(path, format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| Error::format(path, format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| Error::format(path, format!("reading record batch: {e}")))?;
        let scans = int_column(&batch, COLUMNS[0]).map_err(|r| Error::format(path, r))?;
        let rts = float_column(&batch, COLUMNS[1]).map_err(|r| Error::format(path, r))?;
        let channels = int_column(&batch, COLUMNS[2]).map_err(|r| Error::format(path, r))?;
        let intensities = float_column(&batch, COLUMNS[3]).map_err(|r| Error::format(path, r))?;

        for row in 0..batch.num_rows() {
            let scan = u32::try_from(scans.value(row))
                .map_err(|_| Error::format(path, format!("row {row}: scan out of range")))?;
            rows.push(MeasurementRow::new(
                scan,
                rts.value(row),
                channels.value(row),
                intensities.value(row),
            ));
        }
    }
    Ok(rows)
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> std::result::Result<&'a Int64Array, String> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| format!("parquet file missing '{name}' column"))?;
    if col.null_count() > 0 {
        return Err(format!("column '{name}' contains nulls"));
    }
    col.as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| format!("column '{name}' is {:?}, expected Int64", col.data_type()))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> std::result::Result<&'a Float64Array, String> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| format!("parquet file missing '{name}' column"))?;
    if col.null_count() > 0 {
        return Err(format!("column '{name}' contains nulls"));
    }
    col.as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| format!("column '{name}' is {:?}, expected Float64", col.data_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a/run.TXT")), Some(SourceFormat::Ascii));
        assert_eq!(SourceFormat::from_path(Path::new("export.dat")), Some(SourceFormat::Ascii));
        assert_eq!(SourceFormat::from_path(Path::new("run.cdf")), Some(SourceFormat::Cdf));
        assert_eq!(SourceFormat::from_path(Path::new("run.nc")), Some(SourceFormat::Cdf));
        assert_eq!(SourceFormat::from_path(Path::new("run.raw")), None);
        assert_eq!("NetCDF".parse::<SourceFormat>(), Ok(SourceFormat::Cdf));
        assert!("xml".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn missing_raw_file_is_a_file_access_error() {
        let path = PathBuf::from("/definitely/not/here.txt");
        assert!(matches!(parse_file(&path, SourceFormat::Ascii), Err(Error::FileAccess { .. })));
        let path = PathBuf::from("/definitely/not/here.cdf");
        assert!(matches!(parse_file(&path, SourceFormat::Cdf), Err(Error::FileAccess { .. })));
    }

    #[test]
    fn csv_columns_are_matched_case_insensitively_and_reordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab_Function_4.csv");
        std::fs::write(
            &path,
            "intensity,channel,Note,scan,retention time\n5.5,73.0,x,2,0.25\n-1,74,y,3.0,0.5\n",
        )
        .unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(table.source, "lab");
        assert_eq!(table.function, 4);
        assert_eq!(
            table.rows,
            vec![
                MeasurementRow::new(2, 0.25, 73, 5.5),
                MeasurementRow::new(3, 0.5, 74, -1.0),
            ]
        );
    }

    #[test]
    fn csv_without_required_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        std::fs::write(&path, "Scan,Channel,Intensity\n1,2,3\n").unwrap();
        assert!(matches!(load_table(&path), Err(Error::Format { .. })));
    }

    #[test]
    fn unsupported_table_extension() {
        assert!(matches!(
            load_table(Path::new("table.xlsx")),
            Err(Error::Format { .. })
        ));
    }
}
