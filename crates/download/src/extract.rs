//! Zip extraction that refuses to write outside the destination.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Largest number of bytes a single entry may decompress to (1 GiB).
///
/// An entry past the cap fails the extraction with
/// [`ErrorKind::EntryTooLarge`] rather than being truncated to the cap, so a
/// partially written record file is never published.
pub const MAX_ENTRY_SIZE: u64 = 1 << 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Normalize an archive entry name into a path relative to the extraction
/// root.
///
/// Returns `None` for names that are absolute, climb above the root, contain
/// null bytes, or are empty once normalized.
pub fn sanitize_entry_name(name: &str) -> Option<PathBuf> {
    let mut components = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                if part.as_encoded_bytes().contains(&0) {
                    return None;
                }
                components.push(part);
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => return None,
            Component::ParentDir => {
                components.pop()?;
            },
        }
    }
    match components.is_empty() {
        true => None,
        false => Some(components.into_iter().collect()),
    }
}

/// Extract every safe entry of the zip at `archive` into `destination`.
///
/// Unsafe entry names are skipped. An entry larger than `max_entry_size`
/// aborts the extraction; whatever was already written stays behind for the
/// caller to discard.
pub fn extract_zip(archive: &Path, destination: &Path, max_entry_size: u64) -> Result<ExtractStats> {
    let archive_name = archive.display().to_string();
    let file = File::open(archive).or_raise(|| ErrorKind::Io(archive.to_path_buf()))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::InvalidArchive(archive_name.clone()))?;
    let mut stats = ExtractStats::default();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).or_raise(|| ErrorKind::InvalidArchive(archive_name.clone()))?;
        let name = entry.name().to_string();
        let Some(relative) = sanitize_entry_name(&name) else {
            tracing::warn!(archive = %archive_name, entry = %name, "Skipping unsafe archive entry");
            stats.skipped += 1;
            continue;
        };
        let target = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).or_raise(|| ErrorKind::Io(target.clone()))?;
            stats.directories += 1;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }

        let mut output = File::create(&target).or_raise(|| ErrorKind::Io(target.clone()))?;
        // Read one byte past the limit so an oversized entry is detected
        // rather than silently truncated.
        let mut bounded = (&mut entry).take(max_entry_size.saturating_add(1));
        let written = io::copy(&mut bounded, &mut output).or_raise(|| ErrorKind::InvalidArchive(name.clone()))?;
        if written > max_entry_size {
            exn::bail!(ErrorKind::EntryTooLarge {
                entry: name,
                limit: max_entry_size,
            });
        }
        stats.files += 1;
    }
    Ok(stats)
}
