//! Three-part engine versions and the rules that decide which exports a build
//! of the engine can read.
//!
//! Exports are only readable by an engine with the same **major** version;
//! minor and patch releases never change the export format. A release with a
//! higher version (of any component) is considered newer.

pub mod error;

use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Heading line that introduces the engine version in release notes.
pub const ENGINE_VERSION_MARKER: &str = "## Engine Version";

/// A `major.minor.patch` version.
///
/// Field order matters: the derived [`Ord`] compares major, then minor, then
/// patch, which is exactly the "newer" relation used for upgrade notices.
///
/// ```
/// use rotten_version::Version;
///
/// let current: Version = "1.2.3".parse().unwrap();
/// let release: Version = "1.4.0".parse().unwrap();
/// assert!(release.is_compatible_with(&current));
/// assert!(release.is_newer_than(&current));
/// assert_eq!(current.to_string(), "1.2.3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}
impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Exports built by `other` can be read by `self` (and vice versa).
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major
    }

    /// Strictly newer, compared lexicographically over (major, minor, patch).
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self > other
    }

    /// Find and parse the engine version embedded in release notes.
    ///
    /// Returns `None` when the marker is missing or the version under it
    /// does not parse; such releases are ignored rather than reported.
    pub fn from_release_notes(notes: &str) -> Option<Self> {
        engine_version_from_notes(notes)?.parse().ok()
    }

    fn component(name: &'static str, value: &str) -> Result<u64> {
        value.parse::<u64>().or_raise(|| ErrorKind::InvalidComponent {
            component: name,
            value: value.to_string(),
        })
    }
}

impl FromStr for Version {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            exn::bail!(ErrorKind::Malformed(s.to_string()));
        };
        Ok(Self {
            major: Self::component("major", major)?,
            minor: Self::component("minor", minor)?,
            patch: Self::component("patch", patch)?,
        })
    }
}
impl TryFrom<&str> for Version {
    type Error = Error;
    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|e: Error| serde::de::Error::custom(&*e))
    }
}

/// Extract the raw engine version text from release notes.
///
/// The marker is a two-line block: a line reading exactly
/// [`ENGINE_VERSION_MARKER`] (surrounding whitespace ignored) followed by the
/// version on the next line.
pub fn engine_version_from_notes(notes: &str) -> Option<&str> {
    let mut lines = notes.lines();
    while let Some(line) = lines.next() {
        if line.trim() == ENGINE_VERSION_MARKER {
            return lines.next().map(str::trim);
        }
    }
    None
}
