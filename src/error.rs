use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Errors raised by parsing, exporting, querying and rendering operations.
///
/// Per-line problems in ASCII input never show up here: they are recovered
/// by the parser and reported as [`crate::data::model::ParseWarning`]s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input path missing or unreadable.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content does not match any recognized layout.
    #[error("unrecognized format in {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// Output destination not writable.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Requested channel absent from a table.
    #[error("channel {channel} not present in {table}")]
    MissingChannel { table: String, channel: i64 },

    /// Another file already supplied a table with this label.
    #[error("table {label} is already loaded from {}", existing.display())]
    DuplicateLabel { label: String, existing: PathBuf },

    /// No loaded table carries this label.
    #[error("no table named {0}")]
    UnknownTable(String),

    /// Figure could not be drawn or encoded.
    #[error("cannot render {}: {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn render(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Render {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess {
            path: path.into(),
            source,
        }
    }
}
