use std::path::Path;

use crate::error::{Error, Result};

use super::model::{nominal_channel, FunctionTable, MeasurementRow, ParseOutcome, ParseWarning};

const FUNCTION_MARKER: &str = "FUNCTION";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an ASCII export into one table per `FUNCTION <n>` block.
///
/// The file is decoded lossily so stray non-UTF-8 bytes never abort a run.
pub fn parse_ascii(path: &Path) -> Result<ParseOutcome> {
    let bytes = std::fs::read(path).map_err(|e| Error::access(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let outcome = parse_ascii_str(&source_stem(path), &text);
    log::info!(
        "{}: {} function(s), {} warning(s)",
        path.display(),
        outcome.tables.len(),
        outcome.warnings.len()
    );
    Ok(outcome)
}

/// Parse already-loaded ASCII text. `source` tags the produced tables.
///
/// Data lines are split on whitespace and/or commas and may be either
///
/// * `Scan <n>` / `Retention Time <t>` context lines followed by
///   `<channel> <intensity>` pairs (the instrument's native layout), or
/// * four-field rows `<scan> <retention time> <channel> <intensity>`.
///
/// Anything else inside a block is skipped and recorded as a warning.
pub fn parse_ascii_str(source: &str, text: &str) -> ParseOutcome {
    let (blocks, mut warnings) = split_blocks(text);

    let tables = blocks
        .iter()
        .map(|block| {
            let rows = parse_block(block, &mut warnings);
            log::debug!(
                "{source}: function {} (header line {}) -> {} rows",
                block.index,
                block.header_line,
                rows.len()
            );
            FunctionTable::new(source, block.index, rows)
        })
        .collect();

    ParseOutcome { tables, warnings }
}

/// File name without directory and last extension.
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}

// ---------------------------------------------------------------------------
// Block splitting
// ---------------------------------------------------------------------------

/// One contiguous `FUNCTION` segment of the input, still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFunctionBlock {
    pub index: u32,
    /// Line of the header marker (0 for the implicit block).
    pub header_line: usize,
    /// `(line number, trimmed text)` of every non-blank line in the block.
    pub lines: Vec<(usize, String)>,
}

/// Split text into blocks. Without any header the whole file is function 1.
pub fn split_blocks(text: &str) -> (Vec<RawFunctionBlock>, Vec<ParseWarning>) {
    let mut blocks = Vec::new();
    let mut warnings = Vec::new();
    let mut preamble: Vec<(usize, String)> = Vec::new();
    let mut current: Option<RawFunctionBlock> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(index) = function_header(line) {
            if index == 0 {
                let message = "function index 0 (numbering starts at 1); block kept as function 0".to_string();
                log::warn!("line {line_no}: {message}");
                warnings.push(ParseWarning {
                    line: line_no,
                    function: 0,
                    message,
                });
            }
            let next = RawFunctionBlock {
                index,
                header_line: line_no,
                lines: Vec::new(),
            };
            if let Some(done) = current.replace(next) {
                blocks.push(done);
            }
            continue;
        }
        match current.as_mut() {
            Some(block) => block.lines.push((line_no, line.to_string())),
            None => preamble.push((line_no, line.to_string())),
        }
    }
    if let Some(done) = current {
        blocks.push(done);
    }

    if blocks.is_empty() {
        if !preamble.is_empty() {
            blocks.push(RawFunctionBlock {
                index: 1,
                header_line: 0,
                lines: preamble,
            });
        }
    } else if let Some((first_line, _)) = preamble.first() {
        let message = format!(
            "{} line(s) before the first FUNCTION header ignored",
            preamble.len()
        );
        log::warn!("line {first_line}: {message}");
        warnings.insert(
            0,
            ParseWarning {
                line: *first_line,
                function: 0,
                message,
            },
        );
    }

    (blocks, warnings)
}

/// `FUNCTION <n>` (marker case-insensitive) → `Some(n)`.
fn function_header(line: &str) -> Option<u32> {
    let marker = line.get(..FUNCTION_MARKER.len())?;
    if !marker.eq_ignore_ascii_case(FUNCTION_MARKER) {
        return None;
    }
    let rest = &line[FUNCTION_MARKER.len()..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

/// Scan / retention-time context carried between lines of a block.
#[derive(Debug, Default)]
struct ScanContext {
    scan: Option<u32>,
    retention_time: Option<f64>,
}

fn parse_block(block: &RawFunctionBlock, warnings: &mut Vec<ParseWarning>) -> Vec<MeasurementRow> {
    let mut ctx = ScanContext::default();
    let mut rows = Vec::new();

    for (line_no, line) in &block.lines {
        match parse_line(line, &mut ctx) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {}
            Err(message) => {
                log::warn!("line {line_no} (function {}): {message}", block.index);
                warnings.push(ParseWarning {
                    line: *line_no,
                    function: block.index,
                    message,
                });
            }
        }
    }
    rows
}

/// `Ok(None)` for context lines, `Err` with a reason for malformed lines.
fn parse_line(line: &str, ctx: &mut ScanContext) -> std::result::Result<Option<MeasurementRow>, String> {
    let fields: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect();

    match fields.as_slice() {
        [keyword, value] if keyword.eq_ignore_ascii_case("scan") => {
            ctx.scan = Some(parse_scan(value)?);
            Ok(None)
        }
        [kw1, kw2, value]
            if kw1.eq_ignore_ascii_case("retention") && kw2.eq_ignore_ascii_case("time") =>
        {
            ctx.retention_time = Some(parse_float(value, "retention time")?);
            Ok(None)
        }
        [scan, rt, channel, intensity] => Ok(Some(MeasurementRow::new(
            parse_scan(scan)?,
            parse_float(rt, "retention time")?,
            parse_channel(channel)?,
            parse_float(intensity, "intensity")?,
        ))),
        [channel, intensity] => {
            let (Some(scan), Some(retention_time)) = (ctx.scan, ctx.retention_time) else {
                return Err("channel/intensity pair without preceding Scan and Retention Time".to_string());
            };
            Ok(Some(MeasurementRow::new(
                scan,
                retention_time,
                parse_channel(channel)?,
                parse_float(intensity, "intensity")?,
            )))
        }
        other => Err(format!(
            "expected 4 fields or a channel/intensity pair, found {} field(s)",
            other.len()
        )),
    }
}

fn parse_scan(tok: &str) -> std::result::Result<u32, String> {
    tok.parse::<u32>()
        .map_err(|_| format!("scan '{tok}' is not a non-negative integer"))
}

fn parse_float(tok: &str, what: &str) -> std::result::Result<f64, String> {
    match tok.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("{what} '{tok}' is not a number")),
    }
}

fn parse_channel(tok: &str) -> std::result::Result<i64, String> {
    if let Ok(c) = tok.parse::<i64>() {
        return Ok(c);
    }
    tok.parse::<f64>()
        .ok()
        .and_then(nominal_channel)
        .ok_or_else(|| format!("channel '{tok}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TWO_FUNCTIONS: &str = "\
FUNCTION 1
1 0.05 73 1200.5
2 0.10 73 1300
3 0.15 73 1250
4 0.20 seventy-three 1
FUNCTION 2
1 0.05 147 10
2 0.10 147 20
3 0.15
3 0.15 147 30
";

    #[test]
    fn two_blocks_with_one_malformed_row_each() {
        let out = parse_ascii_str("run", TWO_FUNCTIONS);
        assert_eq!(out.tables.len(), 2);
        assert_eq!(out.tables[0].len(), 3);
        assert_eq!(out.tables[1].len(), 3);
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.warnings[0].line, 5);
        assert_eq!(out.warnings[0].function, 1);
        assert_eq!(out.warnings[1].function, 2);
        assert_eq!(out.tables[1].label(), "run_Function_2");
        assert_eq!(out.tables[0].rows[1], MeasurementRow::new(2, 0.10, 73, 1300.0));
    }

    #[test]
    fn file_without_headers_is_function_one() {
        let out = parse_ascii_str("flat", "1,0.5,40,9.5\n2,1.0,40,10.5\n");
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].function, 1);
        assert_eq!(out.tables[0].len(), 2);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(parse_ascii_str("e", "").is_empty());
        assert!(parse_ascii_str("e", "\n   \n\t\n").is_empty());
    }

    #[test]
    fn every_header_yields_a_table_even_when_empty() {
        let text = "FUNCTION 1\nFUNCTION 2\n1 0.1 50 5\nfunction 3\n";
        let out = parse_ascii_str("s", text);
        let indices: Vec<u32> = out.tables.iter().map(|t| t.function).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(out.tables[0].is_empty());
        assert_eq!(out.tables[1].len(), 1);
    }

    #[test]
    fn native_layout_uses_scan_and_retention_context() {
        let text = "\
FUNCTION 1
Scan\t\t1
Retention Time\t0.045
73.05\t1000
74\t200
Scan\t\t2
Retention Time\t0.090
73.0\t1100
";
        let out = parse_ascii_str("native", text);
        assert!(out.warnings.is_empty());
        assert_eq!(
            out.tables[0].rows,
            vec![
                MeasurementRow::new(1, 0.045, 73, 1000.0),
                MeasurementRow::new(1, 0.045, 74, 200.0),
                MeasurementRow::new(2, 0.090, 73, 1100.0),
            ]
        );
    }

    #[test]
    fn pair_without_context_is_a_warning() {
        let out = parse_ascii_str("s", "FUNCTION 1\n73 1000\n");
        assert_eq!(out.tables[0].len(), 0);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn preamble_before_first_header_is_reported_once() {
        let out = parse_ascii_str("s", "Instrument: X\nDate: today\nFUNCTION 1\n1 0.1 2 3\n");
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].function, 0);
        assert_eq!(out.warnings[0].line, 1);
    }

    #[test]
    fn header_detection() {
        assert_eq!(function_header("FUNCTION 12"), Some(12));
        assert_eq!(function_header("Function\t4 (MS)"), Some(4));
        assert_eq!(function_header("FUNCTION"), None);
        assert_eq!(function_header("FUNCTIONS 2"), None);
        assert_eq!(function_header("FUNCTION x"), None);
    }

    #[test]
    fn negative_scan_and_nan_intensity_are_malformed() {
        let out = parse_ascii_str("s", "-1 0.1 5 5\n1 0.1 5 NaN\n1 0.1 5 -3.5\n");
        assert_eq!(out.tables[0].rows, vec![MeasurementRow::new(1, 0.1, 5, -3.5)]);
        assert_eq!(out.warnings.len(), 2);
    }

    #[test]
    fn function_zero_is_kept_with_a_warning() {
        let out = parse_ascii_str("z", "FUNCTION 0\n1 0.1 73 5\nFUNCTION 1\n1 0.1 73 6\n");
        assert_eq!(out.tables.len(), 2);
        assert_eq!(out.tables[0].function, 0);
        assert_eq!(out.tables[0].len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 1);
    }

    fn arb_block() -> impl Strategy<Value = (u32, Vec<(u32, i64, u32)>)> {
        (
            0u32..6,
            prop::collection::vec((0u32..50, 1i64..500, 0u32..100_000), 0..6),
        )
    }

    proptest! {
        #[test]
        fn one_table_per_header(
            headers in prop::collection::vec(arb_block(), 0..8),
            loose in prop::collection::vec((0u32..50, 1i64..500, 0u32..100_000), 0..4),
            blank_lines in 0usize..3,
        ) {
            let row = |(scan, channel, intensity): &(u32, i64, u32)| {
                format!("{scan} {:.2} {channel} {intensity}\n", f64::from(*scan) * 0.05)
            };
            let mut text = String::new();
            if headers.is_empty() {
                loose.iter().for_each(|r| text.push_str(&row(r)));
            }
            for (index, rows) in &headers {
                text.push_str(&format!("FUNCTION {}\n", index + 1));
                text.push_str(&"\n".repeat(blank_lines));
                rows.iter().for_each(|r| text.push_str(&row(r)));
            }

            let out = parse_ascii_str("gen", &text);
            let expected = if headers.is_empty() { usize::from(!loose.is_empty()) } else { headers.len() };
            prop_assert_eq!(out.tables.len(), expected);
            prop_assert!(out.warnings.is_empty());
            for (table, (index, rows)) in out.tables.iter().zip(&headers) {
                prop_assert_eq!(table.function, index + 1);
                prop_assert_eq!(table.len(), rows.len());
            }
        }
    }
}
