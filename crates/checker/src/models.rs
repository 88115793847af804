//! Checker models.
//!
//! Check types select which record set is consulted, storage types select
//! which encoding of that record set is read.

use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Confidence reported for legacy records stored without one.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// What kind of ID is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckType {
    User,
    Group,
    /// Friend IDs are user IDs; they share the user record set.
    Friends,
}
impl CheckType {
    pub const ALL: [CheckType; 3] = [Self::User, Self::Group, Self::Friends];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Friends => "friends",
        }
    }

    /// File stem and SQLite table name of the record set for this check.
    pub fn stem(&self) -> &'static str {
        match self {
            Self::User | Self::Friends => "users",
            Self::Group => "groups",
        }
    }
}
impl Display for CheckType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl FromStr for CheckType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(Self::User),
            "group" | "groups" => Ok(Self::Group),
            "friend" | "friends" => Ok(Self::Friends),
            _ => exn::bail!(ErrorKind::UnsupportedCheckType(s.to_string())),
        }
    }
}

/// How an export's records are encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageType {
    Sqlite,
    Binary,
    Csv,
}
impl StorageType {
    pub const ALL: [StorageType; 3] = [Self::Sqlite, Self::Binary, Self::Csv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Binary => "binary",
            Self::Csv => "csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Sqlite => "db",
            Self::Binary => "bin",
            Self::Csv => "csv",
        }
    }

    /// The export filename holding records for `check`, e.g. `users.bin`.
    pub fn filename(&self, check: CheckType) -> String {
        format!("{}.{}", check.stem(), self.extension())
    }

    /// Every filename that marks a directory as an export.
    pub fn recognized_filenames() -> impl Iterator<Item = String> {
        Self::ALL
            .into_iter()
            .flat_map(|storage| [CheckType::User, CheckType::Group].map(|check| storage.filename(check)))
    }
}
impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl FromStr for StorageType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "binary" => Ok(Self::Binary),
            "csv" => Ok(Self::Csv),
            _ => exn::bail!(ErrorKind::UnsupportedStorageType(s.to_string())),
        }
    }
}

/// Outcome of a single lookup.
///
/// When `found` is false the remaining fields are empty/zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckResult {
    pub found: bool,
    pub status: String,
    pub reason: String,
    pub confidence: f64,
}
impl CheckResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(status: impl Into<String>, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            found: true,
            status: status.into(),
            reason: reason.into(),
            confidence,
        }
    }
}
