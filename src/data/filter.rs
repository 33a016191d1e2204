use std::collections::BTreeSet;

use crate::error::{Error, Result};

use super::model::FunctionTable;

// ---------------------------------------------------------------------------
// Channel selection
// ---------------------------------------------------------------------------

/// Rows of `channel`, in their original relative order.
///
/// A channel with no rows gives an empty table, not an error.
pub fn filter_channel(table: &FunctionTable, channel: i64) -> FunctionTable {
    FunctionTable {
        source: table.source.clone(),
        function: table.function,
        rows: table
            .rows
            .iter()
            .filter(|r| r.channel == channel)
            .copied()
            .collect(),
        modifications: table.modifications,
    }
}

/// Channels present in both tables, ascending.
pub fn common_channels(a: &FunctionTable, b: &FunctionTable) -> Vec<i64> {
    let left: BTreeSet<i64> = a.rows.iter().map(|r| r.channel).collect();
    let right: BTreeSet<i64> = b.rows.iter().map(|r| r.channel).collect();
    left.intersection(&right).copied().collect()
}

// ---------------------------------------------------------------------------
// Side-by-side comparison
// ---------------------------------------------------------------------------

/// One channel trace of one table, ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    /// Label of the table the trace came from.
    pub label: String,
    pub channel: i64,
    /// `(retention time, intensity)` in table order.
    pub points: Vec<(f64, f64)>,
}

impl ChannelSeries {
    pub fn extract(table: &FunctionTable, channel: i64) -> Result<Self> {
        let points: Vec<(f64, f64)> = table
            .rows
            .iter()
            .filter(|r| r.channel == channel)
            .map(|r| (r.retention_time, r.intensity))
            .collect();
        if points.is_empty() {
            return Err(Error::MissingChannel {
                table: table.label(),
                channel,
            });
        }
        Ok(Self {
            label: table.label(),
            channel,
            points,
        })
    }
}

/// Extract the same channel from two tables.
///
/// Fails with [`Error::MissingChannel`] naming the first table lacking it.
pub fn compare(a: &FunctionTable, b: &FunctionTable, channel: i64) -> Result<(ChannelSeries, ChannelSeries)> {
    Ok((ChannelSeries::extract(a, channel)?, ChannelSeries::extract(b, channel)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MeasurementRow;
    use proptest::prelude::*;

    fn sample(source: &str, channels: &[i64]) -> FunctionTable {
        let rows = channels
            .iter()
            .enumerate()
            .map(|(i, &c)| MeasurementRow::new(i as u32 + 1, i as f64 * 0.5, c, 10.0 * i as f64))
            .collect();
        FunctionTable::new(source, 1, rows)
    }

    #[test]
    fn filter_keeps_matching_rows_only() {
        let t = sample("a", &[73, 74, 73, 75]);
        let f = filter_channel(&t, 73);
        assert_eq!(f.len(), 2);
        assert_eq!(f.rows[0].scan, 1);
        assert_eq!(f.rows[1].scan, 3);
        assert!(filter_channel(&t, 99).is_empty());
    }

    #[test]
    fn common_channels_intersect() {
        let a = sample("a", &[73, 74, 75]);
        let b = sample("b", &[75, 76, 73]);
        assert_eq!(common_channels(&a, &b), vec![73, 75]);
    }

    #[test]
    fn compare_extracts_both_series() {
        let a = sample("a", &[73, 74]);
        let b = sample("b", &[74, 74]);
        let (sa, sb) = compare(&a, &b, 74).unwrap();
        assert_eq!(sa.label, "a_Function_1");
        assert_eq!(sa.points, vec![(0.5, 10.0)]);
        assert_eq!(sb.points.len(), 2);
    }

    #[test]
    fn compare_reports_missing_channel() {
        let a = sample("a", &[73]);
        let b = sample("b", &[74]);
        match compare(&a, &b, 73) {
            Err(Error::MissingChannel { table, channel }) => {
                assert_eq!(table, "b_Function_1");
                assert_eq!(channel, 73);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn filter_preserves_relative_order(channels in prop::collection::vec(0i64..4, 0..100), pick in 0i64..4) {
            let t = sample("p", &channels);
            let f = filter_channel(&t, pick);
            prop_assert!(f.rows.iter().all(|r| r.channel == pick));
            let expected: Vec<_> = t.rows.iter().filter(|r| r.channel == pick).copied().collect();
            prop_assert_eq!(f.rows, expected);
        }
    }
}
