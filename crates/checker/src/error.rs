//! Checker Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A checker error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for checker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The export file exists but its contents do not follow the expected
    /// layout (truncated header, wrong column count, bad float, etc).
    #[display("invalid format in {}: {detail}", path.display())]
    InvalidFormat {
        path: PathBuf,
        detail: String,
    },
    /// The database does not have the expected table or columns.
    #[display("invalid database schema: {}", _0.display())]
    InvalidSchema(#[error(not(source))] PathBuf),
    /// The lookup key supplied by the caller could not be decoded.
    #[display("invalid hash input: {_0}")]
    InvalidHashInput(#[error(not(source))] String),
    /// Text did not name a known storage type.
    #[display("unsupported storage type: {_0}")]
    UnsupportedStorageType(#[error(not(source))] String),
    /// Text did not name a known check type.
    #[display("unsupported check type: {_0}")]
    UnsupportedCheckType(#[error(not(source))] String),
    /// The export directory is missing the file for the requested check.
    #[display("{storage} storage for {check} checks requires {filename}")]
    MissingFile {
        storage: String,
        check: String,
        filename: String,
    },
    /// Reading an export file failed (missing, unreadable, truncated).
    #[display("I/O error reading {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Opening or querying the SQLite export failed.
    #[display("database error: {}", _0.display())]
    Database(#[error(not(source))] PathBuf),
    /// A blocking worker panicked or was cancelled.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    pub fn invalid_format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Export files are read-only; only transient I/O is worth another go.
        matches!(self, Self::Io(_) | Self::Database(_) | Self::Task)
    }
}
