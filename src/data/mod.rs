/// Data layer: core types, parsing, normalization, export and queries.
///
/// Architecture:
/// ```text
///  .txt / .asc          .cdf / .nc
///        │                   │
///        ▼                   ▼
///   ┌──────────┐        ┌──────────┐
///   │  ascii    │        │   cdf    │   raw file → ParseOutcome
///   └──────────┘        └──────────┘
///        └───────┬───────────┘
///                ▼
///   ┌──────────────┐
///   │  normalize    │  sort, dedupe → FunctionTable
///   └──────────────┘
///        │
///        ├──────────────► export   (CSV / Parquet)
///        ├──────────────► filter   (channel subsets, compare)
///        └──────────────► edit     (find & replace)
///
///  .csv / .parquet ──► loader::load_table ──► FunctionTable
/// ```

pub mod ascii;
pub mod cdf;
pub mod edit;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;

pub use edit::{find_value, replace_value, DEFAULT_TOLERANCE};
pub use export::{write_csv, write_parquet};
pub use filter::{common_channels, compare, filter_channel, ChannelSeries};
pub use loader::{load_table, parse_file, SourceFormat};
pub use model::{FunctionTable, MeasurementRow, ParseOutcome, ParseWarning};
pub use normalize::normalize;
