use super::model::FunctionTable;

/// Bring a table to its canonical form.
///
/// Rows are ordered by scan, then channel, then retention time and intensity
/// (so scans ascend within every channel group). Exact duplicate rows are
/// dropped. Rows left sharing a `(scan, channel)` pair, as happens when
/// several fractional masses round to one nominal channel, are folded into
/// one: intensities are summed and the earliest retention time is kept.
///
/// Applying it twice gives the same table as applying it once.
pub fn normalize(table: &FunctionTable) -> FunctionTable {
    let mut rows = table.rows.clone();
    rows.sort_by(|a, b| a.total_cmp(b));
    let before = rows.len();
    rows.dedup_by(|a, b| a.same_as(b));
    let duplicates = before - rows.len();

    let distinct = rows.len();
    rows.dedup_by(|later, kept| {
        let same_cell = later.scan == kept.scan && later.channel == kept.channel;
        if same_cell {
            kept.intensity += later.intensity;
        }
        same_cell
    });
    let folded = distinct - rows.len();

    if duplicates > 0 || folded > 0 {
        log::debug!(
            "{}: dropped {duplicates} duplicate row(s), folded {folded} row(s) into shared (scan, channel) cells",
            table.label()
        );
    }

    FunctionTable {
        source: table.source.clone(),
        function: table.function,
        rows,
        modifications: table.modifications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MeasurementRow;
    use proptest::prelude::*;

    fn table(rows: Vec<MeasurementRow>) -> FunctionTable {
        FunctionTable::new("t", 1, rows)
    }

    #[test]
    fn sorts_and_drops_exact_duplicates() {
        let t = table(vec![
            MeasurementRow::new(2, 0.2, 73, 5.0),
            MeasurementRow::new(1, 0.1, 74, 3.0),
            MeasurementRow::new(1, 0.1, 73, 4.0),
            MeasurementRow::new(2, 0.2, 73, 5.0),
        ]);
        let n = normalize(&t);
        assert_eq!(
            n.rows,
            vec![
                MeasurementRow::new(1, 0.1, 73, 4.0),
                MeasurementRow::new(1, 0.1, 74, 3.0),
                MeasurementRow::new(2, 0.2, 73, 5.0),
            ]
        );
    }

    #[test]
    fn shared_scan_and_channel_are_summed() {
        let t = table(vec![
            MeasurementRow::new(1, 0.1, 73, 6.0),
            MeasurementRow::new(2, 0.2, 73, 1.0),
            MeasurementRow::new(1, 0.1, 73, 5.0),
            MeasurementRow::new(1, 0.12, 73, 0.5),
        ]);
        assert_eq!(
            normalize(&t).rows,
            vec![
                MeasurementRow::new(1, 0.1, 73, 11.5),
                MeasurementRow::new(2, 0.2, 73, 1.0),
            ]
        );
    }

    #[test]
    fn rounded_masses_fold_into_one_channel() {
        let text = "FUNCTION 1\nScan 1\nRetention Time 0.1\n73.05 1000\n73.3 500\n";
        let parsed = crate::data::ascii::parse_ascii_str("p", text);
        assert!(parsed.warnings.is_empty());
        let n = normalize(&parsed.tables[0]);
        assert_eq!(n.rows, vec![MeasurementRow::new(1, 0.1, 73, 1500.0)]);
    }

    fn arb_row() -> impl Strategy<Value = MeasurementRow> {
        (0u32..20, 0.0f64..30.0, 40i64..45, -100.0f64..1e5)
            .prop_map(|(s, rt, c, i)| MeasurementRow::new(s, rt, c, i))
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(rows in prop::collection::vec(arb_row(), 0..200)) {
            let once = normalize(&table(rows));
            let twice = normalize(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn scans_ascend_within_each_channel(rows in prop::collection::vec(arb_row(), 0..200)) {
            let n = normalize(&table(rows));
            for channel in n.channels() {
                let scans: Vec<u32> = n.rows.iter().filter(|r| r.channel == channel).map(|r| r.scan).collect();
                prop_assert!(scans.windows(2).all(|w| w[0] <= w[1]));
            }
        }

        #[test]
        fn scan_channel_pairs_are_unique(rows in prop::collection::vec(arb_row(), 0..200)) {
            let n = normalize(&table(rows));
            let mut cells: Vec<(u32, i64)> = n.rows.iter().map(|r| (r.scan, r.channel)).collect();
            let total = cells.len();
            cells.sort_unstable();
            cells.dedup();
            prop_assert_eq!(cells.len(), total);
        }

        #[test]
        fn parsed_pairs_are_unique_after_normalize(
            pairs in prop::collection::vec((1u32..5, 70.0f64..76.0, 0.0f64..1e4), 0..80)
        ) {
            let mut text = String::from("FUNCTION 1\n");
            for (scan, mass, intensity) in &pairs {
                text.push_str(&format!("Scan {scan}\nRetention Time {}\n{mass} {intensity}\n", f64::from(*scan) * 0.1));
            }
            let parsed = crate::data::ascii::parse_ascii_str("p", &text);
            prop_assert_eq!(parsed.tables.len(), 1);
            let n = normalize(&parsed.tables[0]);
            let total = n.rows.len();
            let mut cells: Vec<(u32, i64)> = n.rows.iter().map(|r| (r.scan, r.channel)).collect();
            cells.sort_unstable();
            cells.dedup();
            prop_assert_eq!(cells.len(), total);
        }
    }
}
