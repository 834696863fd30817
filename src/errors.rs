use std::path::PathBuf;

/// Error type that can be returned by fallible operations in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error reading or writing CSV files; could wrap IO or parsing errors
    #[error("Error processing CSV: {0}")]
    Load(#[from] csv::Error),
    /// Error touching the filesystem outside of CSV parsing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A "Date and time" cell with no whitespace between the date token and
    /// the time component
    #[error("Malformed \"Date and time\" value: {0:?}")]
    MalformedDate(String),
    /// A date token that does not parse day-first
    #[error("Unparseable date {value:?}: {source}")]
    DateParse {
        /// The date token as it appeared in the cell
        value: String,
        /// The underlying chrono failure
        source: chrono::ParseError,
    },
    /// A Debit/Credit cell that does not survive currency scrubbing
    #[error("Unparseable amount {value:?}: {source}")]
    AmountParse {
        /// The cell content before scrubbing
        value: String,
        /// The underlying decimal failure
        source: rust_decimal::Error,
    },
    /// An account identifier whose output file would land outside the
    /// configured output directory
    #[error("Output path {path:?} for account {account:?} escapes the output directory")]
    PathEscape {
        /// The derived account identifier that named the file
        account: String,
        /// The path that failed the containment check
        path: PathBuf,
    },
}
