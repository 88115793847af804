//! Checker trait and storage backends.
//!
//! This module defines the `Checker` trait, which provides a unified
//! interface for looking up hashed IDs regardless of how an export encodes
//! its records (custom binary, CSV, or SQLite).
//!
//! Backends hold no open handles. Every call opens the file (or database)
//! it needs and closes it before returning, so an export directory can be
//! replaced between calls.

mod binary;
mod csv;
mod sqlite;

pub use self::binary::{BinaryChecker, MIN_KEY_WIDTH};
pub use self::csv::CsvChecker;
pub use self::sqlite::SqliteChecker;
use crate::error::{ErrorKind, Result};
use crate::models::{CheckResult, CheckType, StorageType};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;

pub type CheckerHandle = Arc<dyn Checker>;

/// Unified interface for export lookups.
///
/// # Examples
///
/// ```no_run
/// use rotten_checker::{CheckType, StorageType, checker_for, error::Result};
///
/// # async fn example() -> Result<()> {
/// let checker = checker_for("/path/to/export", StorageType::Binary);
/// let total = checker.hash_count(CheckType::User).await?;
/// let result = checker.check(CheckType::User, "ce3807a7...").await?;
/// println!("{total} records, found: {}", result.found);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Checker: Send + Sync {
    /// The encoding this backend reads.
    fn storage_type(&self) -> StorageType;

    /// The export directory this backend is bound to.
    fn directory(&self) -> &Path;

    /// Look up a single hex-encoded lookup key.
    ///
    /// Absence is not an error: it is reported as [`CheckResult::not_found`].
    async fn check(&self, check_type: CheckType, hash: &str) -> Result<CheckResult>;

    /// Number of records in the record set for `check_type`.
    async fn hash_count(&self, check_type: CheckType) -> Result<u64>;
}

/// Build the backend for `storage_type` bound to `directory`.
///
/// Nothing is opened here; missing files surface on the first call.
pub fn checker_for(directory: impl AsRef<Path>, storage_type: StorageType) -> CheckerHandle {
    let directory = directory.as_ref();
    match storage_type {
        StorageType::Binary => Arc::new(BinaryChecker::new(directory)),
        StorageType::Csv => Arc::new(CsvChecker::new(directory)),
        StorageType::Sqlite => Arc::new(SqliteChecker::new(directory)),
    }
}

/// Run a blocking scan on Tokio's blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.or_raise(|| ErrorKind::Task)?
}
