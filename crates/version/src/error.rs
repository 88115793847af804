//! Version Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A version error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for version operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The string is not three dot-separated components.
    #[display("invalid version: {_0}")]
    Malformed(#[error(not(source))] String),
    /// One of the components is not a non-negative integer.
    #[display("invalid {component} version: {value}")]
    InvalidComponent {
        /// Which component failed to parse (`major`, `minor` or `patch`).
        component: &'static str,
        /// The offending text.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A version string is either valid or it isn't.
        false
    }
}
