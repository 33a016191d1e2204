use std::io;
use std::path::Path;

use netcdf3::{DataSet, DataVector, FileReader, FileWriter, Version};

use crate::error::{Error, Result};

use super::ascii::source_stem;
use super::model::{nominal_channel, FunctionTable, MeasurementRow, ParseOutcome};

// ---------------------------------------------------------------------------
// Variable-name conventions
// ---------------------------------------------------------------------------

/// Where one dialect of CDF export keeps its arrays. Each slot lists the
/// accepted variable names in order of preference.
#[derive(Debug, Clone, Copy)]
pub struct CdfConvention {
    pub name: &'static str,
    pub scan_index: &'static [&'static str],
    pub point_count: &'static [&'static str],
    pub mass: &'static [&'static str],
    pub intensity: &'static [&'static str],
    pub retention_time: &'static [&'static str],
}

/// ANDI-MS names written by most instrument software.
pub const ANDI_MS: CdfConvention = CdfConvention {
    name: "ANDI-MS",
    scan_index: &["scan_index"],
    point_count: &["point_count"],
    mass: &["mass_values"],
    intensity: &["intensity_values"],
    retention_time: &["scan_acquisition_time"],
};

/// Names used by older converters.
pub const FALLBACK: CdfConvention = CdfConvention {
    name: "fallback",
    scan_index: &["scan_index"],
    point_count: &["point_count"],
    mass: &["mass_range", "mz"],
    intensity: &["intensity"],
    retention_time: &["scan_time", "retention_time"],
};

pub const CONVENTIONS: [CdfConvention; 2] = [ANDI_MS, FALLBACK];

/// Concrete variable names resolved against one file.
#[derive(Debug)]
struct ResolvedNames {
    scan_index: &'static str,
    point_count: &'static str,
    mass: &'static str,
    intensity: &'static str,
    retention_time: &'static str,
}

impl CdfConvention {
    /// Accepted names per slot, in slot order.
    fn slots(&self) -> [&'static [&'static str]; 5] {
        [
            self.scan_index,
            self.point_count,
            self.mass,
            self.intensity,
            self.retention_time,
        ]
    }
}

const SLOT_NAMES: [&str; 5] = ["scan index", "point count", "mass", "intensity", "retention time"];

/// Resolve every slot on its own, trying each convention's names in turn,
/// so one file may mix names from different conventions. Unresolved slots
/// are returned with every name that was tried.
fn resolve(
    conventions: &[CdfConvention],
    has_var: impl Fn(&str) -> bool,
) -> std::result::Result<ResolvedNames, Vec<String>> {
    let mut found = [None; 5];
    let mut missing = Vec::new();
    for (slot, hit) in found.iter_mut().enumerate() {
        let mut tried: Vec<&str> = Vec::new();
        for convention in conventions {
            for &name in convention.slots()[slot] {
                if hit.is_none() && has_var(name) {
                    *hit = Some(name);
                }
                if !tried.contains(&name) {
                    tried.push(name);
                }
            }
        }
        if hit.is_none() {
            missing.push(format!("{}: {}", SLOT_NAMES[slot], tried.join(" | ")));
        }
    }

    match found {
        [Some(scan_index), Some(point_count), Some(mass), Some(intensity), Some(retention_time)] => {
            Ok(ResolvedNames {
                scan_index,
                point_count,
                mass,
                intensity,
                retention_time,
            })
        }
        _ => Err(missing),
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse a NetCDF (ANDI-MS) file.
///
/// Binary files are always a single function with index 1, whatever the
/// number of channels they hold.
pub fn parse_cdf(path: &Path) -> Result<ParseOutcome> {
    let meta = std::fs::metadata(path).map_err(|e| Error::access(path, e))?;
    if meta.len() == 0 {
        log::info!("{}: empty file", path.display());
        return Ok(ParseOutcome::default());
    }

    let mut reader = FileReader::open(path)
        .map_err(|e| Error::format(path, format!("not a NetCDF classic file ({e:?})")))?;

    let data_set = reader.data_set();
    let names = resolve(&CONVENTIONS, |name| data_set.has_var(name)).map_err(|missing| {
        Error::format(path, format!("missing variables ({})", missing.join("; ")))
    })?;
    log::debug!("{}: using variables {names:?}", path.display());

    let mut read = |name: &str| -> Result<Vec<f64>> {
        reader
            .read_var(name)
            .map(to_f64)
            .map_err(|e| Error::format(path, format!("cannot read variable {name} ({e:?})")))
    };
    let scan_index = read(names.scan_index)?;
    let point_count = read(names.point_count)?;
    let mass = read(names.mass)?;
    let intensity = read(names.intensity)?;
    let retention_time = read(names.retention_time)?;
    drop(reader);

    let rows = assemble_rows(&scan_index, &point_count, &mass, &intensity, &retention_time)
        .map_err(|reason| Error::format(path, reason))?;

    log::info!("{}: {} rows in 1 function", path.display(), rows.len());
    Ok(ParseOutcome {
        tables: vec![FunctionTable::new(source_stem(path), 1, rows)],
        warnings: Vec::new(),
    })
}

fn to_f64(data: DataVector) -> Vec<f64> {
    match data {
        DataVector::I8(v) => v.into_iter().map(f64::from).collect(),
        DataVector::U8(v) => v.into_iter().map(f64::from).collect(),
        DataVector::I16(v) => v.into_iter().map(f64::from).collect(),
        DataVector::I32(v) => v.into_iter().map(f64::from).collect(),
        DataVector::F32(v) => v.into_iter().map(f64::from).collect(),
        DataVector::F64(v) => v,
    }
}

/// Expand the per-scan slices into rows. Scan numbers are 1-based.
pub fn assemble_rows(
    scan_index: &[f64],
    point_count: &[f64],
    mass: &[f64],
    intensity: &[f64],
    retention_time: &[f64],
) -> std::result::Result<Vec<MeasurementRow>, String> {
    if point_count.len() < scan_index.len() {
        return Err(format!(
            "point_count has {} entries for {} scans",
            point_count.len(),
            scan_index.len()
        ));
    }

    let mut rows = Vec::with_capacity(mass.len());
    for (i, (&start, &count)) in scan_index.iter().zip(point_count).enumerate() {
        if start < 0.0 || count < 0.0 {
            return Err(format!("scan {}: negative offset or point count", i + 1));
        }
        let start = start as usize;
        let end = start
            .checked_add(count as usize)
            .ok_or_else(|| format!("scan {}: point range overflows", i + 1))?;
        if end > mass.len() || end > intensity.len() {
            return Err(format!(
                "scan {}: points {start}..{end} exceed the {} stored values",
                i + 1,
                mass.len().min(intensity.len())
            ));
        }
        let scan = u32::try_from(i + 1).map_err(|_| "too many scans".to_string())?;
        let rt = retention_time.get(i).copied().unwrap_or(0.0);
        for (&m, &value) in mass[start..end].iter().zip(&intensity[start..end]) {
            let channel = nominal_channel(m)
                .ok_or_else(|| format!("scan {scan}: mass value {m} is not finite"))?;
            rows.push(MeasurementRow::new(scan, rt, channel, value));
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write a table as a minimal ANDI-MS file (the primary variable names).
///
/// Rows are grouped by scan in ascending order; each scan takes the
/// retention time of its first row. Reading the file back renumbers scans
/// from 1.
pub fn write_andi_cdf(table: &FunctionTable, path: &Path) -> Result<()> {
    let mut rows = table.rows.clone();
    rows.sort_by_key(|r| r.scan);

    let mut scan_index: Vec<i32> = Vec::new();
    let mut point_count: Vec<i32> = Vec::new();
    let mut scan_time: Vec<f64> = Vec::new();
    let mut last_scan = None;
    for (i, row) in rows.iter().enumerate() {
        if last_scan != Some(row.scan) {
            let start = i32::try_from(i)
                .map_err(|_| Error::write(path, io::Error::other("too many points")))?;
            scan_index.push(start);
            point_count.push(0);
            scan_time.push(row.retention_time);
            last_scan = Some(row.scan);
        }
        if let Some(count) = point_count.last_mut() {
            *count += 1;
        }
    }
    let mass: Vec<f64> = rows.iter().map(|r| r.channel as f64).collect();
    let intensity: Vec<f64> = rows.iter().map(|r| r.intensity).collect();

    let fail = |what: &str, detail: String| {
        Error::write(path, io::Error::other(format!("{what}: {detail}")))
    };

    let mut data_set = DataSet::new();
    // Classic NetCDF treats a zero-sized dimension as unlimited.
    data_set
        .add_fixed_dim("scan_number", scan_index.len().max(1))
        .map_err(|e| fail("scan dimension", format!("{e:?}")))?;
    data_set
        .add_fixed_dim("point_number", mass.len().max(1))
        .map_err(|e| fail("point dimension", format!("{e:?}")))?;
    for (name, dim) in [("scan_index", "scan_number"), ("point_count", "scan_number")] {
        data_set
            .add_var_i32(name, &[dim])
            .map_err(|e| fail(name, format!("{e:?}")))?;
    }
    data_set
        .add_var_f64("scan_acquisition_time", &["scan_number"])
        .map_err(|e| fail("scan_acquisition_time", format!("{e:?}")))?;
    for name in ["mass_values", "intensity_values"] {
        data_set
            .add_var_f64(name, &["point_number"])
            .map_err(|e| fail(name, format!("{e:?}")))?;
    }

    // Pad empty tables so every variable matches its dimension size.
    let pad_i32 = |v: Vec<i32>| if v.is_empty() { vec![0] } else { v };
    let pad_f64 = |v: Vec<f64>| if v.is_empty() { vec![0.0] } else { v };
    let empty = rows.is_empty();
    let point_count = if empty { vec![0] } else { point_count };

    let mut writer = FileWriter::open(path).map_err(|e| fail("create", format!("{e:?}")))?;
    writer
        .set_def(&data_set, Version::Classic, 0)
        .map_err(|e| fail("header", format!("{e:?}")))?;
    writer
        .write_var_i32("scan_index", &pad_i32(scan_index))
        .map_err(|e| fail("scan_index", format!("{e:?}")))?;
    writer
        .write_var_i32("point_count", &point_count)
        .map_err(|e| fail("point_count", format!("{e:?}")))?;
    writer
        .write_var_f64("scan_acquisition_time", &pad_f64(scan_time))
        .map_err(|e| fail("scan_acquisition_time", format!("{e:?}")))?;
    writer
        .write_var_f64("mass_values", &pad_f64(mass))
        .map_err(|e| fail("mass_values", format!("{e:?}")))?;
    writer
        .write_var_f64("intensity_values", &pad_f64(intensity))
        .map_err(|e| fail("intensity_values", format!("{e:?}")))?;
    writer.close().map_err(|e| fail("close", format!("{e:?}")))?;

    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_slices_per_scan() {
        let rows = assemble_rows(
            &[0.0, 2.0],
            &[2.0, 1.0],
            &[73.0, 74.2, 73.0],
            &[10.0, 20.0, 30.0],
            &[1.5, 3.0],
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                MeasurementRow::new(1, 1.5, 73, 10.0),
                MeasurementRow::new(1, 1.5, 74, 20.0),
                MeasurementRow::new(2, 3.0, 73, 30.0),
            ]
        );
    }

    #[test]
    fn short_retention_array_defaults_to_zero() {
        let rows = assemble_rows(&[0.0, 1.0], &[1.0, 1.0], &[5.0, 6.0], &[1.0, 2.0], &[9.0]).unwrap();
        assert_eq!(rows[1].retention_time, 0.0);
    }

    #[test]
    fn slice_past_end_is_rejected() {
        assert!(assemble_rows(&[0.0], &[5.0], &[1.0], &[1.0], &[0.0]).is_err());
    }

    #[test]
    fn fallback_convention_accepts_alternate_names() {
        let vars = ["scan_index", "point_count", "mz", "intensity", "retention_time"];
        let names = resolve(&CONVENTIONS, |n| vars.contains(&n)).unwrap();
        assert_eq!(names.mass, "mz");
        assert_eq!(names.intensity, "intensity");
        assert_eq!(names.retention_time, "retention_time");
    }

    #[test]
    fn names_from_both_conventions_can_mix() {
        let vars = ["scan_index", "point_count", "mass_values", "intensity_values", "scan_time"];
        let names = resolve(&CONVENTIONS, |n| vars.contains(&n)).unwrap();
        assert_eq!(names.mass, "mass_values");
        assert_eq!(names.intensity, "intensity_values");
        assert_eq!(names.retention_time, "scan_time");
    }

    #[test]
    fn primary_names_win_when_both_are_present() {
        let vars = [
            "scan_index",
            "point_count",
            "mass_values",
            "mz",
            "intensity_values",
            "intensity",
            "scan_acquisition_time",
        ];
        let names = resolve(&CONVENTIONS, |n| vars.contains(&n)).unwrap();
        assert_eq!(names.mass, "mass_values");
        assert_eq!(names.intensity, "intensity_values");
    }

    #[test]
    fn unresolved_slots_are_named() {
        let missing = resolve(&CONVENTIONS, |n| n == "scan_index" || n == "mz").unwrap_err();
        assert_eq!(
            missing,
            vec![
                "point count: point_count",
                "intensity: intensity_values | intensity",
                "retention time: scan_acquisition_time | scan_time | retention_time",
            ]
        );
    }
}
