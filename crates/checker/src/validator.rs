//! Export directory discovery and validation.
//!
//! A directory counts as an export when it directly contains at least one of
//! the recognised record files (`users.bin`, `groups.csv`, ...). Discovery
//! only looks a few levels deep so that pointing it at a home directory or
//! the download location stays cheap.

use crate::error::{ErrorKind, Result};
use crate::models::{CheckType, StorageType};
use exn::ResultExt;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

/// Deepest level searched; a file directly inside the root is at depth 1.
pub const MAX_SEARCH_DEPTH: usize = 3;

/// Find every directory under `root` (including `root`) that holds export
/// files, sorted and de-duplicated.
///
/// A root that does not exist yields an empty list. Subdirectories that
/// cannot be read are skipped.
#[instrument]
pub async fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let recognized: BTreeSet<String> = StorageType::recognized_filenames().collect();
    let mut found = BTreeSet::new();
    let mut stack = vec![(root.to_path_buf(), 0usize)];

    while let Some((current, depth)) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) if depth == 0 => return Err(err).or_raise(|| ErrorKind::Io(current)),
            Err(err) => {
                tracing::warn!(path = %current.display(), error = %err, "Skipping unreadable directory");
                continue;
            },
        };

        let entry_depth = depth + 1;
        while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::Io(current.clone()))? {
            let file_type = entry.file_type().await.or_raise(|| ErrorKind::Io(entry.path()))?;
            if file_type.is_dir() {
                if entry_depth < MAX_SEARCH_DEPTH {
                    stack.push((entry.path(), entry_depth));
                }
                continue;
            }
            if !entry.file_name().to_str().is_some_and(|name| recognized.contains(name)) {
                continue;
            }
            // Symlinked export files count; symlinked directories are never
            // descended into.
            let is_file = match file_type.is_symlink() {
                true => fs::metadata(entry.path()).await.is_ok_and(|metadata| metadata.is_file()),
                false => file_type.is_file(),
            };
            if is_file {
                found.insert(current.clone());
            }
        }
    }

    tracing::debug!(root = %root.display(), exports = found.len(), "Discovered export directories");
    Ok(found.into_iter().collect())
}

/// Confirm `directory` holds the file needed for `check_type` checks in
/// `storage_type` encoding, returning its path.
pub async fn validate(directory: &Path, check_type: CheckType, storage_type: StorageType) -> Result<PathBuf> {
    let filename = storage_type.filename(check_type);
    let path = directory.join(&filename);
    match fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => Ok(path),
        _ => exn::bail!(ErrorKind::MissingFile {
            storage: storage_type.to_string(),
            check: check_type.to_string(),
            filename,
        }),
    }
}

/// Storage encodings present in `directory` for `check_type`.
pub async fn available_storage_types(directory: &Path, check_type: CheckType) -> Vec<StorageType> {
    let mut available = Vec::new();
    for storage_type in StorageType::ALL {
        if validate(directory, check_type, storage_type).await.is_ok() {
            available.push(storage_type);
        }
    }
    available
}
