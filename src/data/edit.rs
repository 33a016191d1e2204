use super::model::FunctionTable;

/// Exact match. Floating-point values rarely compare equal after
/// arithmetic, so callers usually pass an explicit tolerance.
pub const DEFAULT_TOLERANCE: f64 = 0.0;

fn matches(intensity: f64, target: f64, tolerance: f64) -> bool {
    (intensity - target).abs() <= tolerance
}

/// Count rows whose intensity lies within `tolerance` of `target`.
pub fn find_value(table: &FunctionTable, target: f64, tolerance: f64) -> usize {
    table
        .rows
        .iter()
        .filter(|r| matches(r.intensity, target, tolerance))
        .count()
}

/// Overwrite matching intensities with `replacement`, in place.
///
/// Returns the number of rows changed; that number is also added to the
/// table's modification counter.
pub fn replace_value(table: &mut FunctionTable, target: f64, replacement: f64, tolerance: f64) -> usize {
    let mut changed = 0;
    for row in table.rows.iter_mut() {
        if matches(row.intensity, target, tolerance) {
            row.intensity = replacement;
            changed += 1;
        }
    }
    table.modifications += changed as u64;
    if changed > 0 {
        log::info!(
            "{}: replaced {changed} intensity value(s) {target} -> {replacement}",
            table.label()
        );
    }
    changed
}
