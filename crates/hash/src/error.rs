//! Hash Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A hashing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for hashing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The export's hashing parameters cannot be used with the algorithm
    /// (zero iterations, salt too short, memory cost out of range).
    #[display("invalid {_0} parameters")]
    InvalidParameters(#[error(not(source))] &'static str),
    /// The algorithm name is not one of the supported hash types.
    #[display("unknown hash type: {_0}")]
    UnknownHashType(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
