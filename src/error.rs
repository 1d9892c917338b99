//! Error types for eit-quadpole
//!
//! Tolerated gaps (configurations without tripole data) are not errors and
//! never show up here; see [`crate::quadpole::BuildReport`].

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// eit-quadpole error types
#[derive(Error, Debug)]
pub enum Error {
    /// A column required by a processing stage is absent from the table
    #[error("Missing column '{0}': table is not ready for this processing step")]
    MissingColumn(&'static str),

    /// No correction factor exists for an electrode configuration in the data
    #[error("No correction factor found for configuration a={a} b={b} m={m} n={n}")]
    UnmatchedCalibration {
        /// Current electrode A as stored in the table
        a: u32,
        /// Current electrode B as stored in the table
        b: u32,
        /// Potential electrode M as stored in the table
        m: u32,
        /// Potential electrode N as stored in the table
        n: u32,
    },

    /// Correction sources disagree on the factor for one configuration
    #[error("Conflicting correction factors for {quadruple}: {first} vs {second}")]
    AmbiguousCalibration {
        /// Canonical quadruple, formatted as `A-B M-N`
        quadruple: String,
        /// Factor seen first
        first: f64,
        /// Conflicting factor seen later
        second: f64,
    },

    /// Correction file with an unsupported layout (only 3 or 5 columns)
    #[error("Malformed correction file {source_name}: expected 3 or 5 columns, found {columns}")]
    MalformedCorrectionFile {
        /// File path (or `<memory>`) of the offending source
        source_name: String,
        /// Column count that was found
        columns: usize,
    },

    /// Text input could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No importer registered for a data file version
    #[error("The file version \"{0}\" is not supported yet")]
    UnsupportedVersion(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Processing settings could not be decoded
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}
