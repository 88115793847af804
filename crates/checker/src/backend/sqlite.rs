//! SQLite exports.
//!
//! Each check type has its own database file holding a single table named
//! after the record set (`users` or `groups`):
//!
//! ```sql
//! CREATE TABLE users (
//!     hash TEXT PRIMARY KEY,
//!     status TEXT NOT NULL,
//!     reason TEXT NOT NULL,
//!     confidence REAL NOT NULL DEFAULT 1.0
//! );
//! ```
//!
//! Databases are opened read-only and never created or migrated.

use crate::backend::Checker;
use crate::error::{ErrorKind, Result};
use crate::models::{CheckResult, CheckType, DEFAULT_CONFIDENCE, StorageType};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Reads `users.db` / `groups.db`.
#[derive(Debug, Clone)]
pub struct SqliteChecker {
    directory: PathBuf,
}
impl SqliteChecker {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn path_for(&self, check_type: CheckType) -> PathBuf {
        self.directory.join(StorageType::Sqlite.filename(check_type))
    }

    /// Open a read-only connection and confirm the table has the four
    /// expected columns.
    async fn connect(path: &Path, table: &str) -> Result<SqliteConnection> {
        // SQLite would report a missing file as a generic "unable to open";
        // check first so it surfaces as an I/O error naming the path.
        tokio::fs::metadata(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;

        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false)
            .connect()
            .await
            .or_raise(|| ErrorKind::Database(path.to_path_buf()))?;

        let probe = format!("SELECT hash, status, reason, confidence FROM {table} LIMIT 0");
        if let Err(err) = sqlx::query(&probe).execute(&mut conn).await {
            // Closing is best-effort here; the schema error is what matters.
            let _ = conn.close().await;
            return Err(err).or_raise(|| ErrorKind::InvalidSchema(path.to_path_buf()));
        }
        Ok(conn)
    }
}

#[async_trait]
impl Checker for SqliteChecker {
    fn storage_type(&self) -> StorageType {
        StorageType::Sqlite
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    #[instrument(skip(self), fields(storage = "sqlite"))]
    async fn check(&self, check_type: CheckType, hash: &str) -> Result<CheckResult> {
        let path = self.path_for(check_type);
        let table = check_type.stem();
        let mut conn = Self::connect(&path, table).await?;

        let query = format!("SELECT status, reason, confidence FROM {table} WHERE hash = ?");
        let row = sqlx::query_as::<_, (Option<String>, Option<String>, Option<f64>)>(&query)
            .bind(hash)
            .fetch_optional(&mut conn)
            .await
            .or_raise(|| ErrorKind::Database(path.clone()))?;
        conn.close().await.or_raise(|| ErrorKind::Database(path.clone()))?;

        Ok(match row {
            Some((status, reason, confidence)) => CheckResult::found(
                status.unwrap_or_default(),
                reason.unwrap_or_default(),
                confidence.unwrap_or(DEFAULT_CONFIDENCE),
            ),
            None => CheckResult::not_found(),
        })
    }

    async fn hash_count(&self, check_type: CheckType) -> Result<u64> {
        let path = self.path_for(check_type);
        let table = check_type.stem();
        let mut conn = Self::connect(&path, table).await?;

        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&mut conn)
            .await
            .or_raise(|| ErrorKind::Database(path.clone()))?;
        conn.close().await.or_raise(|| ErrorKind::Database(path.clone()))?;

        u64::try_from(count).or_raise(|| ErrorKind::Database(path))
    }
}
