//! Rotten Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The directory is not a usable export for the requested check and
    /// storage type.
    #[display("not a usable export: {}", _0.display())]
    Validation(#[error(not(source))] PathBuf),
    /// Settings or the export's config sidecar could not be loaded.
    #[display("configuration error")]
    Config,
    /// The storage backend failed to answer.
    #[display("lookup failed")]
    Checker,
    /// The export's hashing parameters could not be applied to an ID.
    #[display("could not hash ID {_0}")]
    Hash(#[error(not(source))] u64),
    /// Fetching or installing a release failed.
    #[display("export download failed")]
    Download,
    /// No compatible release carries the requested tag.
    #[display("no compatible release tagged {_0}")]
    UnknownRelease(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Checker | Self::Download)
    }
}
