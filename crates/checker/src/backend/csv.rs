//! CSV record tables.
//!
//! The first row must be exactly `hash,status,reason,confidence`; the older
//! three-column layout without `confidence` is rejected. Hashes are compared
//! as text, so the caller's key must use the same (lowercase hex) spelling
//! as the export.

use crate::backend::{Checker, blocking};
use crate::error::{ErrorKind, Result};
use crate::models::{CheckResult, CheckType, StorageType};
use async_trait::async_trait;
use csv::{Reader, ReaderBuilder, StringRecord};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

const HEADER: [&str; 4] = ["hash", "status", "reason", "confidence"];

/// Reads `users.csv` / `groups.csv`.
#[derive(Debug, Clone)]
pub struct CsvChecker {
    directory: PathBuf,
}
impl CsvChecker {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn path_for(&self, check_type: CheckType) -> PathBuf {
        self.directory.join(StorageType::Csv.filename(check_type))
    }
}

#[async_trait]
impl Checker for CsvChecker {
    fn storage_type(&self) -> StorageType {
        StorageType::Csv
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    #[instrument(skip(self), fields(storage = "csv"))]
    async fn check(&self, check_type: CheckType, hash: &str) -> Result<CheckResult> {
        let path = self.path_for(check_type);
        let key = hash.to_string();
        let table = blocking(move || read_table(&path, Some(&key))).await?;
        Ok(table.matched.unwrap_or_default())
    }

    async fn hash_count(&self, check_type: CheckType) -> Result<u64> {
        let path = self.path_for(check_type);
        let table = blocking(move || read_table(&path, None)).await?;
        Ok(table.rows)
    }
}

/// Outcome of a full pass over a table.
struct Table {
    rows: u64,
    matched: Option<CheckResult>,
}

/// Read and validate every row, remembering the first row whose hash is `key`.
fn read_table(path: &Path, key: Option<&str>) -> Result<Table> {
    let bytes = fs::read(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    // Headers are validated by hand so a missing or legacy header can be
    // reported as a format error instead of being silently consumed.
    let mut reader = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes.as_slice());
    let mut record = StringRecord::new();

    if !read_record(&mut reader, &mut record, &bytes, path)? {
        exn::bail!(ErrorKind::invalid_format(path, "missing header row"));
    }
    if !record.iter().eq(HEADER) {
        exn::bail!(ErrorKind::invalid_format(
            path,
            format!("expected header `{}`, found `{}`", HEADER.join(","), record.iter().collect::<Vec<_>>().join(","))
        ));
    }

    let mut table = Table { rows: 0, matched: None };
    while read_record(&mut reader, &mut record, &bytes, path)? {
        table.rows += 1;
        if record.len() != HEADER.len() {
            exn::bail!(ErrorKind::invalid_format(
                path,
                format!("row {} has {} fields, expected {}", table.rows, record.len(), HEADER.len())
            ));
        }
        if table.matched.is_none() && key.is_some_and(|key| &record[0] == key) {
            let confidence = record[3].parse::<f64>().or_raise(|| {
                ErrorKind::invalid_format(path, format!("row {} has invalid confidence `{}`", table.rows, &record[3]))
            })?;
            table.matched = Some(CheckResult::found(&record[1], &record[2], confidence));
        }
    }
    tracing::debug!(path = %path.display(), rows = table.rows, found = table.matched.is_some(), "Read CSV export");
    Ok(table)
}

/// Read the next record and check the quoting of its raw bytes.
fn read_record(reader: &mut Reader<&[u8]>, record: &mut StringRecord, bytes: &[u8], path: &Path) -> Result<bool> {
    let start = reader.position().byte();
    let more = match reader.read_record(record) {
        Ok(more) => more,
        Err(err) => {
            let kind = match err.kind() {
                csv::ErrorKind::Io(_) => ErrorKind::Io(path.to_path_buf()),
                _ => ErrorKind::invalid_format(path, err.to_string()),
            };
            return Err(err).or_raise(|| kind);
        },
    };
    let end = reader.position().byte();
    let raw = usize::try_from(start)
        .ok()
        .zip(usize::try_from(end).ok())
        .and_then(|(start, end)| bytes.get(start..end))
        .unwrap_or_default();
    if let Err(problem) = check_quoting(raw) {
        exn::bail!(ErrorKind::invalid_format(path, format!("line {}: {problem}", reader.position().line())));
    }
    Ok(more)
}

/// Reject quoting the parser would otherwise tolerate: a `"` inside an
/// unquoted field, text after a closing quote, or an unterminated quote.
fn check_quoting(raw: &[u8]) -> std::result::Result<(), &'static str> {
    let mut bytes = raw.iter().copied().peekable();
    let mut field_start = true;
    while let Some(byte) = bytes.next() {
        if field_start && byte == b'"' {
            loop {
                match bytes.next() {
                    Some(b'"') if bytes.peek() == Some(&b'"') => {
                        bytes.next();
                    },
                    Some(b'"') => break,
                    Some(_) => {},
                    None => return Err("unterminated quoted field"),
                }
            }
            match bytes.peek() {
                None | Some(b',' | b'\r' | b'\n') => field_start = false,
                Some(_) => return Err("text after closing quote"),
            }
            continue;
        }
        match byte {
            b',' | b'\r' | b'\n' => field_start = true,
            b'"' => return Err("bare quote in unquoted field"),
            _ => field_start = false,
        }
    }
    Ok(())
}
