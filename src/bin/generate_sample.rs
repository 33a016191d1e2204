//! Writes a synthetic GC-MS run in both raw formats:
//! `sample_run.txt` (two ASCII functions) and `sample_run.cdf` (ANDI-MS).

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use msanalyzer::data::cdf::write_andi_cdf;
use msanalyzer::data::{FunctionTable, MeasurementRow};

/// Generate sample raw files for trying out msanalyzer
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Destination directory
    #[arg(default_value = ".")]
    output: PathBuf,

    /// Number of scans per function
    #[arg(long, default_value_t = 120)]
    scans: u32,

    /// PRNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Elution profile of one channel: (apex time, width, height).
type Peak = (f64, f64, f64);

struct Function {
    index: u32,
    scan_interval: f64,
    channels: Vec<(i64, Vec<Peak>)>,
}

fn synthesize(function: &Function, scans: u32, rng: &mut SimpleRng) -> Vec<MeasurementRow> {
    let mut rows = Vec::new();
    for scan in 1..=scans {
        let rt = f64::from(scan) * function.scan_interval;
        for (channel, peaks) in &function.channels {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(rt, mu, sigma, amp))
                .sum();
            let intensity = (signal + rng.gauss(50.0, 15.0)).max(0.0).round();
            let rt = (rt * 1000.0).round() / 1000.0;
            rows.push(MeasurementRow::new(scan, rt, *channel, intensity));
        }
    }
    rows
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Render rows in the instrument's ASCII layout: a `Scan` line, a
/// `Retention Time` line, then one `channel<TAB>intensity` pair per line.
fn ascii_block(out: &mut String, function: u32, rows: &[MeasurementRow]) {
    let _ = writeln!(out, "FUNCTION {function}");
    let mut current = None;
    for row in rows {
        if current != Some(row.scan) {
            let _ = writeln!(out, "Scan\t\t{}", row.scan);
            let _ = writeln!(out, "Retention Time\t{:.3}", row.retention_time);
            current = Some(row.scan);
        }
        let _ = writeln!(out, "{}\t{}", row.channel, row.intensity);
    }
    out.push('\n');
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let functions = [
        Function {
            index: 1,
            scan_interval: 0.05,
            channels: vec![
                (73, vec![(1.8, 0.08, 9000.0), (4.1, 0.12, 3500.0)]),
                (147, vec![(1.8, 0.08, 4200.0)]),
                (207, vec![(3.0, 0.20, 1500.0)]),
            ],
        },
        Function {
            index: 2,
            scan_interval: 0.05,
            channels: vec![
                (73, vec![(2.6, 0.10, 6000.0)]),
                (191, vec![(2.6, 0.10, 2400.0), (5.0, 0.15, 800.0)]),
            ],
        },
    ];

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let mut text = String::new();
    let mut first = None;
    for function in &functions {
        let rows = synthesize(function, args.scans, &mut rng);
        ascii_block(&mut text, function.index, &rows);
        if first.is_none() {
            first = Some(FunctionTable::new("sample_run", function.index, rows));
        }
    }

    let ascii_path = args.output.join("sample_run.txt");
    std::fs::write(&ascii_path, text)
        .with_context(|| format!("Failed to write {}", ascii_path.display()))?;
    println!("Wrote {} functions to {}", functions.len(), ascii_path.display());

    if let Some(table) = first {
        let cdf_path = args.output.join("sample_run.cdf");
        write_andi_cdf(&table, &cdf_path)?;
        println!("Wrote {} rows to {}", table.len(), cdf_path.display());
    }
    Ok(())
}
