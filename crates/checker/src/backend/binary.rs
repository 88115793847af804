//! Custom binary record format.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! u32 count
//! count × { hash[key_width] | u16 len | status | u16 len | reason | f64 confidence }
//! ```
//!
//! There is no index. Lookups are a sequential scan that only decodes the
//! record whose hash matches; every other record's strings are skipped by
//! seeking past them.

use crate::backend::{Checker, blocking};
use crate::error::{ErrorKind, Result};
use crate::models::{CheckResult, CheckType, StorageType};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Narrowest hash width the format allows. Counting validates the file size
/// against this width so it never rejects a file that lookups with wider keys
/// can read.
pub const MIN_KEY_WIDTH: usize = 16;
const HEADER_SIZE: u64 = 4;
// Two u16 length prefixes and the f64 confidence.
const RECORD_OVERHEAD: u64 = 2 + 2 + 8;

/// Reads `users.bin` / `groups.bin`.
#[derive(Debug, Clone)]
pub struct BinaryChecker {
    directory: PathBuf,
    /// Hash width assumed by [`Checker::hash_count`]; lookups use the width
    /// of the decoded key instead.
    key_width: usize,
}
impl BinaryChecker {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            key_width: MIN_KEY_WIDTH,
        }
    }

    /// Override the hash width used when validating the file size for a count.
    pub fn with_key_width(mut self, key_width: usize) -> Self {
        self.key_width = key_width;
        self
    }

    fn path_for(&self, check_type: CheckType) -> PathBuf {
        self.directory.join(StorageType::Binary.filename(check_type))
    }
}

#[async_trait]
impl Checker for BinaryChecker {
    fn storage_type(&self) -> StorageType {
        StorageType::Binary
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    #[instrument(skip(self), fields(storage = "binary"))]
    async fn check(&self, check_type: CheckType, hash: &str) -> Result<CheckResult> {
        if hash.is_empty() {
            exn::bail!(ErrorKind::InvalidHashInput("empty hash".to_string()));
        }
        let key = hex::decode(hash).or_raise(|| ErrorKind::InvalidHashInput(hash.to_string()))?;
        let path = self.path_for(check_type);
        blocking(move || scan(&path, &key)).await
    }

    async fn hash_count(&self, check_type: CheckType) -> Result<u64> {
        let path = self.path_for(check_type);
        let key_width = self.key_width;
        blocking(move || open_validated(&path, key_width).map(|(_, count)| u64::from(count))).await
    }
}

/// Open the file, read the record count and check the file is large enough
/// to hold that many minimum-size records.
fn open_validated(path: &Path, key_width: usize) -> Result<(BufReader<File>, u32)> {
    let file = File::open(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let size = file.metadata().or_raise(|| ErrorKind::Io(path.to_path_buf()))?.len();
    if size < HEADER_SIZE {
        exn::bail!(ErrorKind::invalid_format(path, format!("{size} bytes is too short for the record count")));
    }

    let mut reader = BufReader::new(file);
    let count = read_u32(&mut reader, path)?;
    let min_record_size = key_width as u64 + RECORD_OVERHEAD;
    let required = u64::from(count)
        .checked_mul(min_record_size)
        .and_then(|records| records.checked_add(HEADER_SIZE));
    match required {
        Some(required) if size >= required => Ok((reader, count)),
        _ => exn::bail!(ErrorKind::invalid_format(path, format!("{size} bytes cannot hold {count} records"))),
    }
}

fn scan(path: &Path, key: &[u8]) -> Result<CheckResult> {
    let (mut reader, count) = open_validated(path, key.len())?;
    let mut candidate = vec![0u8; key.len()];
    for _ in 0..count {
        reader.read_exact(&mut candidate).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        if candidate == key {
            let status = read_string(&mut reader, path)?;
            let reason = read_string(&mut reader, path)?;
            let confidence = read_f64(&mut reader, path)?;
            return Ok(CheckResult::found(status, reason, confidence));
        }
        let status_len = read_u16(&mut reader, path)?;
        reader.seek_relative(i64::from(status_len)).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        let reason_len = read_u16(&mut reader, path)?;
        reader
            .seek_relative(i64::from(reason_len) + 8)
            .or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    }
    tracing::debug!(path = %path.display(), records = count, "No matching record");
    Ok(CheckResult::not_found())
}

fn read_array<const N: usize>(reader: &mut impl Read, path: &Path) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    Ok(buf)
}

fn read_u16(reader: &mut impl Read, path: &Path) -> Result<u16> {
    read_array(reader, path).map(u16::from_le_bytes)
}

fn read_u32(reader: &mut impl Read, path: &Path) -> Result<u32> {
    read_array(reader, path).map(u32::from_le_bytes)
}

fn read_f64(reader: &mut impl Read, path: &Path) -> Result<f64> {
    read_array(reader, path).map(f64::from_le_bytes)
}

fn read_string(reader: &mut impl Read, path: &Path) -> Result<String> {
    let len = read_u16(reader, path)?;
    let mut buf = vec![0u8; usize::from(len)];
    reader.read_exact(&mut buf).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::checker_for;
    use rstest::rstest;
    use tempfile::TempDir;

    fn key(seed: u8, width: usize) -> Vec<u8> {
        vec![seed; width]
    }

    fn encode(records: &[(Vec<u8>, &str, &str, f64)]) -> Vec<u8> {
        let mut out = (records.len() as u32).to_le_bytes().to_vec();
        for (hash, status, reason, confidence) in records {
            out.extend_from_slice(hash);
            out.extend_from_slice(&(status.len() as u16).to_le_bytes());
            out.extend_from_slice(status.as_bytes());
            out.extend_from_slice(&(reason.len() as u16).to_le_bytes());
            out.extend_from_slice(reason.as_bytes());
            out.extend_from_slice(&confidence.to_le_bytes());
        }
        out
    }

    fn fixture(filename: &str, bytes: &[u8]) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(filename), bytes).unwrap();
        dir
    }

    fn sample() -> Vec<(Vec<u8>, &'static str, &'static str, f64)> {
        vec![
            (key(1, 32), "flagged", "spam", 0.5),
            (key(2, 32), "confirmed", "", 0.99),
            (key(3, 32), "flagged", "impersonation of a very long name", 0.75),
        ]
    }

    #[tokio::test]
    async fn test_count_and_lookup() {
        let dir = fixture("users.bin", &encode(&sample()));
        let checker = BinaryChecker::new(dir.path());

        assert_eq!(checker.hash_count(CheckType::User).await.unwrap(), 3);
        let last = checker.check(CheckType::User, &hex::encode(key(3, 32))).await.unwrap();
        assert_eq!(last, CheckResult::found("flagged", "impersonation of a very long name", 0.75));
        let middle = checker.check(CheckType::User, &hex::encode(key(2, 32))).await.unwrap();
        assert_eq!(middle, CheckResult::found("confirmed", "", 0.99));
    }

    #[tokio::test]
    async fn test_friends_share_user_records() {
        let dir = fixture("users.bin", &encode(&sample()));
        let checker = BinaryChecker::new(dir.path());
        let result = checker.check(CheckType::Friends, &hex::encode(key(1, 32))).await.unwrap();
        assert!(result.found);
        assert_eq!(result.status, "flagged");
    }

    #[tokio::test]
    async fn test_absent_key() {
        let dir = fixture("groups.bin", &encode(&sample()));
        let checker = BinaryChecker::new(dir.path());
        let result = checker.check(CheckType::Group, &hex::encode(key(9, 32))).await.unwrap();
        assert_eq!(result, CheckResult::not_found());
    }

    #[tokio::test]
    async fn test_empty_record_set() {
        let dir = fixture("users.bin", &encode(&[]));
        let checker = BinaryChecker::new(dir.path());
        assert_eq!(checker.hash_count(CheckType::User).await.unwrap(), 0);
        assert!(!checker.check(CheckType::User, &hex::encode(key(1, 32))).await.unwrap().found);
    }

    fn overcounted() -> Vec<u8> {
        let mut bytes = encode(&[(key(1, 32), "a", "b", 1.0)]);
        bytes[0] = 5;
        bytes
    }

    #[rstest]
    #[case::empty_file(vec![])]
    #[case::short_header(vec![1, 0])]
    #[case::count_too_large(overcounted())]
    #[tokio::test]
    async fn test_invalid_format(#[case] bytes: Vec<u8>) {
        let dir = fixture("users.bin", &bytes);
        let checker = BinaryChecker::new(dir.path());

        let err = checker.hash_count(CheckType::User).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFormat { .. }), "{err:?}");
        let err = checker.check(CheckType::User, &hex::encode(key(1, 32))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFormat { .. }), "{err:?}");
    }

    #[rstest]
    #[case("")]
    #[case("not-hex")]
    #[case("abc")]
    #[tokio::test]
    async fn test_invalid_hash_input(#[case] hash: &str) {
        let dir = fixture("users.bin", &encode(&sample()));
        let checker = BinaryChecker::new(dir.path());
        let err = checker.check(CheckType::User, hash).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidHashInput(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io() {
        let dir = TempDir::new().unwrap();
        let checker = BinaryChecker::new(dir.path());
        let err = checker.hash_count(CheckType::Group).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Io(dir.path().join("groups.bin")));
    }

    #[tokio::test]
    async fn test_truncated_record_is_io() {
        // Passes the size check (4 + 44 bytes) but the status length runs
        // into the confidence, leaving nothing for the reason length.
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&key(7, 32));
        bytes.extend_from_slice(&10u16.to_le_bytes());
        bytes.extend_from_slice(&[b'x'; 10]);
        let dir = fixture("users.bin", &bytes);
        let checker = BinaryChecker::new(dir.path());

        assert_eq!(checker.hash_count(CheckType::User).await.unwrap(), 1);
        let err = checker.check(CheckType::User, &hex::encode(key(7, 32))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[tokio::test]
    async fn test_narrow_keys_count_and_lookup() {
        let records = vec![(key(4, 16), "f", "s", 0.25), (key(5, 16), "", "", 1.0)];
        let dir = fixture("users.bin", &encode(&records));
        let checker = checker_for(dir.path(), StorageType::Binary);

        assert_eq!(checker.hash_count(CheckType::User).await.unwrap(), 2);
        let last = checker.check(CheckType::User, &hex::encode(key(5, 16))).await.unwrap();
        assert_eq!(last, CheckResult::found("", "", 1.0));
        let first = checker.check(CheckType::User, &hex::encode(key(4, 16))).await.unwrap();
        assert_eq!(first, CheckResult::found("f", "s", 0.25));
    }

    #[tokio::test]
    async fn test_custom_key_width() {
        let records = vec![(key(4, 16), "f", "s", 0.25)];
        let dir = fixture("users.bin", &encode(&records));
        assert_eq!(BinaryChecker::new(dir.path()).hash_count(CheckType::User).await.unwrap(), 1);

        // A 32-byte width does not fit a single 16-byte-key record of this size.
        let strict = BinaryChecker::new(dir.path()).with_key_width(32);
        let err = strict.hash_count(CheckType::User).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFormat { .. }));
    }
}
