use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::error::{Error, Result};

use super::filter::filter_channel;
use super::model::{FunctionTable, COLUMNS};

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// `<label>.csv`
pub fn csv_file_name(table: &FunctionTable) -> String {
    format!("{}.csv", table.label())
}

/// `<label>.parquet`
pub fn parquet_file_name(table: &FunctionTable) -> String {
    format!("{}.parquet", table.label())
}

/// `<label>_channel_<c>.csv`
pub fn channel_file_name(table: &FunctionTable, channel: i64) -> String {
    format!("{}_channel_{channel}.csv", table.label())
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Write `Scan,Retention Time,Channel,Intensity` rows with a header line.
///
/// An existing file at `path` is overwritten without warning. Empty tables
/// still get the header.
pub fn write_csv(table: &FunctionTable, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| Error::write(path, io::Error::from(e)))?;

    writer
        .write_record(COLUMNS)
        .map_err(|e| Error::write(path, io::Error::from(e)))?;
    for row in &table.rows {
        writer
            .serialize(row)
            .map_err(|e| Error::write(path, io::Error::from(e)))?;
    }
    writer.flush().map_err(|e| Error::write(path, e))?;

    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Write only the rows of `channel` to `dir/<label>_channel_<c>.csv`.
pub fn export_channel(table: &FunctionTable, channel: i64, dir: &Path) -> Result<PathBuf> {
    let subset = filter_channel(table, channel);
    let path = dir.join(channel_file_name(table, channel));
    write_csv(&subset, &path)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

pub fn table_schema() -> Schema {
    Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Int64, false),
        Field::new(COLUMNS[1], DataType::Float64, false),
        Field::new(COLUMNS[2], DataType::Int64, false),
        Field::new(COLUMNS[3], DataType::Float64, false),
    ])
}

/// Write the table as a single Parquet record batch with the CSV schema.
pub fn write_parquet(table: &FunctionTable, path: &Path) -> Result<()> {
    let schema = Arc::new(table_schema());
    let rows = &table.rows;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| i64::from(r.scan)))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.retention_time))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.channel))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.intensity))),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| Error::write(path, io::Error::other(e)))?;

    let file = File::create(path).map_err(|e| Error::write(path, e))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).map_err(|e| Error::write(path, io::Error::other(e)))?;
    writer
        .write(&batch)
        .map_err(|e| Error::write(path, io::Error::other(e)))?;
    writer
        .close()
        .map_err(|e| Error::write(path, io::Error::other(e)))?;

    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MeasurementRow;

    fn sample() -> FunctionTable {
        FunctionTable::new(
            "run",
            2,
            vec![
                MeasurementRow::new(1, 0.05, 73, 1200.5),
                MeasurementRow::new(2, 0.1, 74, -3.0),
            ],
        )
    }

    #[test]
    fn csv_has_header_and_rows_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(csv_file_name(&sample()));
        write_csv(&sample(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Scan,Retention Time,Channel,Intensity");
        assert_eq!(lines[1], "1,0.05,73,1200.5");
        assert_eq!(lines[2], "2,0.1,74,-3.0");
        assert!(path.ends_with("run_Function_2.csv"));
    }

    #[test]
    fn empty_table_still_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&FunctionTable::new("e", 1, Vec::new()), &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            "Scan,Retention Time,Channel,Intensity"
        );
    }

    #[test]
    fn existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale content that is much longer than the new file\n".repeat(50)).unwrap();
        write_csv(&sample(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn unwritable_destination_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.csv");
        assert!(matches!(write_csv(&sample(), &path), Err(Error::Write { .. })));
    }

    #[test]
    fn channel_export_names_the_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_channel(&sample(), 74, dir.path()).unwrap();
        assert!(path.ends_with("run_Function_2_channel_74.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
