//! Download Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A download error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for download operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The release feed could not be fetched or parsed.
    #[display("failed to fetch release feed: {_0}")]
    Feed(#[error(not(source))] String),
    /// An asset could not be downloaded (transport error or non-2xx status).
    #[display("download failed: {url}")]
    DownloadFailed {
        url: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
    },
    /// The downloaded asset does not match the digest published in the
    /// release notes, or the published digest is malformed.
    #[display("checksum mismatch: {_0}")]
    ChecksumMismatch(#[error(not(source))] String),
    /// The release has no `.zip` asset to install.
    #[display("release {_0} has no zip archive")]
    NoArchive(#[error(not(source))] String),
    /// The asset is not a readable zip archive.
    #[display("invalid archive: {_0}")]
    InvalidArchive(#[error(not(source))] String),
    /// An archive entry decompresses to more than the allowed size.
    #[display("archive entry {entry} exceeds {limit} bytes")]
    EntryTooLarge {
        entry: String,
        limit: u64,
    },
    /// Local filesystem error while staging or publishing.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// A blocking worker panicked or was cancelled.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Feed(_) | Self::DownloadFailed { .. } | Self::Io(_) | Self::Task)
    }
}
