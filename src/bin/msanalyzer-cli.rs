//! # MSAnalyzer command line
//!
//! Converts raw mass-spectrometry exports to CSV tables and PNG plots, and
//! runs the viewer's table operations without a display.
//!
//! ## Usage
//!
//! ```bash
//! # Parse raw files into out/csv and out/plots
//! msanalyzer-cli parse run1.txt run2.cdf -o out
//!
//! # Inspect and edit an exported table
//! msanalyzer-cli channels out/csv/run1_Function_1.csv
//! msanalyzer-cli find out/csv/run1_Function_1.csv --value 100 --tolerance 0.5
//! msanalyzer-cli replace out/csv/run1_Function_1.csv --value 100 --with 0 --tolerance 0.5
//!
//! # Compare one channel across two functions
//! msanalyzer-cli compare out/csv/run1_Function_1.csv out/csv/run1_Function_2.csv --channel 73 -o cmp.png
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use msanalyzer::config::{PlotSettings, Settings};
use msanalyzer::data::SourceFormat;
use msanalyzer::session::{ParseRequest, Session};

/// MSAnalyzer - mass spectrometry raw data converter
#[derive(Parser)]
#[command(name = "msanalyzer-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON settings file (plot size, output layout, default tolerance)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the figure size from the settings file.
#[derive(Args, Debug, Default)]
struct PlotArgs {
    /// Figure width in inches
    #[arg(long)]
    width: Option<f64>,

    /// Figure height in inches
    #[arg(long)]
    height: Option<f64>,

    /// Dots per inch
    #[arg(long)]
    dpi: Option<u32>,
}

impl PlotArgs {
    fn apply(&self, base: &PlotSettings) -> Result<PlotSettings> {
        let settings = PlotSettings {
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
            dpi: self.dpi.unwrap_or(base.dpi),
        };
        let check = Settings {
            plot: settings.clone(),
            ..Settings::default()
        };
        check.validate()?;
        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse ASCII / CDF files into CSV tables (and PNG plots)
    Parse {
        /// Raw input files (.txt, .asc, .dat, .cdf, .nc)
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Output directory; csv/ and plots/ are created inside
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Force the input format (ascii or cdf) instead of using extensions
        #[arg(short, long)]
        format: Option<SourceFormat>,

        /// Skip PNG rendering
        #[arg(long)]
        no_plots: bool,

        /// Also write each table as Parquet
        #[arg(long)]
        parquet: bool,

        #[command(flatten)]
        plot: PlotArgs,
    },

    /// List the channels of an exported table
    Channels {
        /// Table file (.csv or .parquet)
        table: PathBuf,
    },

    /// Write one channel of a table to <label>_channel_<c>.csv
    ExportChannel {
        table: PathBuf,

        #[arg(short, long)]
        channel: i64,

        /// Destination directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },

    /// Count intensities equal to a value (within a tolerance)
    Find {
        table: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Absolute tolerance; defaults to the settings value (exact match)
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Replace matching intensities and save the table
    Replace {
        table: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Replacement value
        #[arg(long = "with", allow_negative_numbers = true)]
        replacement: f64,

        #[arg(long)]
        tolerance: Option<f64>,

        /// Where to save the edited table (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare one channel of two tables
    Compare {
        a: PathBuf,
        b: PathBuf,

        #[arg(short, long)]
        channel: i64,

        /// PNG overlay of both traces
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also export the channel of both tables as CSV into this directory
        #[arg(long, value_name = "DIR")]
        csv: Option<PathBuf>,

        #[command(flatten)]
        plot: PlotArgs,
    },

    /// Render channels of a table to PNG
    Plot {
        table: PathBuf,

        /// Channels to draw (repeatable); all channels when omitted
        #[arg(short, long)]
        channel: Vec<i64>,

        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        plot: PlotArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    let mut session = Session::new();

    match cli.command {
        Commands::Parse {
            files,
            output,
            format,
            no_plots,
            parquet,
            plot,
        } => {
            let mut request = ParseRequest::new(&output);
            request.format = format;
            request.export = settings.export.clone();
            request.export.write_plots &= !no_plots;
            request.export.write_parquet |= parquet;
            request.plot = plot.apply(&settings.plot)?;

            info!("parsing {} file(s) into {}", files.len(), output.display());
            let report = session
                .parse_files(&files, &request)
                .with_context(|| format!("preparing output directory {}", output.display()))?;

            for path in &report.files_written {
                println!("{}", path.display());
            }
            if report.warnings > 0 {
                eprintln!("{} malformed line(s) skipped (run with -v for details)", report.warnings);
            }
            if !report.is_clean() {
                for msg in &report.messages {
                    eprintln!("{msg}");
                }
                bail!("{} problem(s) while parsing", report.messages.len());
            }
        }

        Commands::Channels { table } => {
            let label = load_one(&mut session, &table)?;
            for channel in session.channels(&label)? {
                println!("{channel}");
            }
        }

        Commands::ExportChannel {
            table,
            channel,
            output,
        } => {
            let label = load_one(&mut session, &table)?;
            let path = session.export_channel(&label, channel, &output)?;
            println!("{}", path.display());
        }

        Commands::Find {
            table,
            value,
            tolerance,
        } => {
            let label = load_one(&mut session, &table)?;
            let tolerance = tolerance.unwrap_or(settings.find.tolerance);
            let count = session.find(&label, value, tolerance)?;
            println!("Found {count} occurrence(s) of {value} in {label}.");
        }

        Commands::Replace {
            table,
            value,
            replacement,
            tolerance,
            output,
        } => {
            let label = load_one(&mut session, &table)?;
            let tolerance = tolerance.unwrap_or(settings.find.tolerance);
            let count = session.replace(&label, value, replacement, tolerance)?;
            if count == 0 {
                println!("Value {value} not found in {label}.");
                return Ok(());
            }
            let destination = output.unwrap_or(table);
            session.save_table(&label, &destination)?;
            println!(
                "Replaced {count} occurrence(s) of {value} with {replacement} in {label} -> {}",
                destination.display()
            );
        }

        Commands::Compare {
            a,
            b,
            channel,
            output,
            csv,
            plot,
        } => {
            let label_a = load_one(&mut session, &a)?;
            let label_b = load_one(&mut session, &b)?;
            if label_a == label_b {
                bail!(
                    "{} and {} both hold table {label_a}; nothing to compare",
                    a.display(),
                    b.display()
                );
            }
            let (sa, sb) = session.compare(&label_a, &label_b, channel)?;
            println!("{}: {} point(s) on channel {channel}", sa.label, sa.points.len());
            println!("{}: {} point(s) on channel {channel}", sb.label, sb.points.len());

            if let Some(path) = output {
                let settings = plot.apply(&settings.plot)?;
                session.plot_comparison(&label_a, &label_b, channel, &settings, &path)?;
                println!("{}", path.display());
            }
            if let Some(dir) = csv {
                for label in [&label_a, &label_b] {
                    let path = session.export_channel(label, channel, &dir)?;
                    println!("{}", path.display());
                }
            }
        }

        Commands::Plot {
            table,
            channel,
            output,
            plot,
        } => {
            let label = load_one(&mut session, &table)?;
            let settings = plot.apply(&settings.plot)?;
            session.plot(&label, &channel, &settings, &output)?;
            println!("{}", output.display());
        }
    }

    Ok(())
}

/// Load a single exported table into the session and return its label.
fn load_one(session: &mut Session, path: &Path) -> Result<String> {
    let report = session.load_tables(&[path.to_path_buf()]);
    if let Some((name, reason)) = report.skipped.into_iter().next() {
        bail!("cannot load {name}: {reason}");
    }
    report
        .loaded
        .into_iter()
        .next()
        .with_context(|| format!("no table loaded from {}", path.display()))
}
