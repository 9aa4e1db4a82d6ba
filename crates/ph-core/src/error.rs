//! Error types for paramhist

use thiserror::Error;

/// paramhist error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bin or axis index outside `[0, len)`.
    #[error("{what} index {index} out of range [0, {len})")]
    OutOfRange {
        /// What was indexed ("bin", "axis", ...).
        what: &'static str,
        /// Offending index, signed so caller-supplied negatives can be reported.
        index: i64,
        /// Number of valid entries.
        len: usize,
    },

    /// Observable tuple does not resolve to any bin.
    #[error("Index error: {0}")]
    Index(String),

    /// Bin with zero nominal content in relative mode.
    #[error("Degenerate bin {bin}: zero nominal content leaves the relative error undefined")]
    DegenerateBin {
        /// Bin index.
        bin: usize,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl Error {
    /// Shorthand for an out-of-range bin index.
    pub fn bin_out_of_range(index: usize, len: usize) -> Self {
        Error::OutOfRange { what: "bin", index: index as i64, len }
    }
}

/// Convert a caller-supplied signed index into a checked `usize`.
///
/// Negative values and values `>= len` yield [`Error::OutOfRange`].
pub fn checked_index(what: &'static str, index: i64, len: usize) -> Result<usize> {
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(Error::OutOfRange { what, index, len }),
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
