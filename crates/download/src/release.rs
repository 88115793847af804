//! Release feed models and the engine compatibility filter.

use rotten_version::Version;
use serde::{Deserialize, Serialize};

/// Length of a hex-encoded SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

/// A published export release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: String,
    /// Release notes; carry the engine version marker and asset checksums.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub browser_download_url: String,
}
impl Asset {
    pub fn is_archive(&self) -> bool {
        self.name.ends_with(".zip")
    }
}

/// What the release notes say about an asset's digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum<'a> {
    /// No checksum line for this asset; verification is skipped.
    Missing,
    /// A well-formed hex SHA-256 digest.
    Sha256(&'a str),
    /// A checksum line exists but its value is not a SHA-256 digest.
    Malformed(&'a str),
}

impl Release {
    /// Engine version the export was built with, if the notes declare a
    /// parsable one.
    pub fn engine_version(&self) -> Option<Version> {
        Version::from_release_notes(&self.body)
    }

    /// Assets that are installed by a download.
    pub fn archives(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|asset| asset.is_archive())
    }

    /// Find the `<asset> SHA256: <hex>` line for `asset_name`.
    pub fn checksum_for(&self, asset_name: &str) -> Checksum<'_> {
        let prefix = format!("{asset_name} SHA256: ");
        if !self.body.contains(&prefix) {
            return Checksum::Missing;
        }
        // The prefix appearing anywhere other than at the start of a line
        // still counts as a (malformed) checksum declaration.
        let value = self
            .body
            .lines()
            .find_map(|line| line.trim().strip_prefix(&prefix))
            .map(str::trim)
            .unwrap_or_default();
        if value.len() == SHA256_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Checksum::Sha256(value)
        } else {
            Checksum::Malformed(value)
        }
    }
}

/// Releases the running engine can install.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    /// Compatible releases, in feed order.
    pub releases: Vec<Release>,
    /// Set when an incompatible release targets a newer engine than the one
    /// running; holds the newest such engine version.
    pub newer_version: Option<Version>,
}

/// Keep releases whose engine major version matches `current`.
///
/// Releases without a parsable engine version are dropped.
pub fn filter_compatible(releases: Vec<Release>, current: &Version) -> Catalog {
    let mut catalog = Catalog::default();
    for release in releases {
        let Some(engine) = release.engine_version() else {
            tracing::debug!(tag = %release.tag_name, "Skipping release without engine version");
            continue;
        };
        if engine.is_compatible_with(current) {
            catalog.releases.push(release);
        } else if engine.is_newer_than(current) {
            tracing::debug!(tag = %release.tag_name, engine = %engine, "Release needs a newer engine");
            catalog.newer_version = catalog.newer_version.max(Some(engine));
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DIGEST: &str = "2f9ed488c8e0ccce3329b47ebb9c6b7870448da2ef857c9b9b1543c29bfd1d82";
    const NOT_HEX: &str = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz";

    fn release(tag: &str, body: &str) -> Release {
        Release {
            tag_name: tag.to_string(),
            name: tag.to_string(),
            body: body.to_string(),
            html_url: String::new(),
            assets: vec![],
        }
    }

    #[test]
    fn test_filter_compatible() {
        let releases = vec![
            release("a", "## Engine Version\n1.4.0"),
            release("b", "no marker"),
            release("c", "## Engine Version\n2.0.0"),
            release("d", "## Engine Version\n1.0.1"),
            release("e", "## Engine Version\nbroken"),
            release("f", "## Engine Version\n3.1.0"),
            release("g", "## Engine Version\n0.9.0"),
        ];
        let catalog = filter_compatible(releases, &Version::new(1, 2, 3));
        let tags: Vec<&str> = catalog.releases.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["a", "d"]);
        assert_eq!(catalog.newer_version, Some(Version::new(3, 1, 0)));
    }

    #[test]
    fn test_no_newer_version() {
        let releases = vec![release("a", "## Engine Version\n1.0.0"), release("b", "## Engine Version\n0.1.0")];
        let catalog = filter_compatible(releases, &Version::new(1, 0, 0));
        assert_eq!(catalog.releases.len(), 1);
        assert_eq!(catalog.newer_version, None);
    }

    #[rstest]
    #[case::missing("## Engine Version\n1.0.0", Checksum::Missing)]
    #[case::other_asset("other.zip SHA256: 00", Checksum::Missing)]
    #[case::present(&format!("Checksums:\n  export.zip SHA256: {DIGEST}  \n"), Checksum::Sha256(DIGEST))]
    #[case::too_short("export.zip SHA256: abc123", Checksum::Malformed("abc123"))]
    #[case::not_hex(&format!("export.zip SHA256: {NOT_HEX}"), Checksum::Malformed(NOT_HEX))]
    #[case::mid_line(&format!("see export.zip SHA256: {DIGEST}"), Checksum::Malformed(""))]
    fn test_checksum_for(#[case] body: &str, #[case] expected: Checksum<'static>) {
        let release = release("t", body);
        assert_eq!(release.checksum_for("export.zip"), expected);
    }

    #[test]
    fn test_deserialize_feed() {
        let feed = r###"[{
            "tag_name": "v2024.06.01",
            "name": "Weekly export",
            "body": "## Engine Version\n1.2.0",
            "html_url": "https://example.invalid/release",
            "draft": false,
            "assets": [
                {"id": 7, "name": "export.zip", "browser_download_url": "https://example.invalid/export.zip", "size": 10},
                {"id": 8, "name": "notes.txt", "browser_download_url": "https://example.invalid/notes.txt"}
            ]
        }]"###;
        let releases: Vec<Release> = serde_json::from_str(feed).unwrap();
        assert_eq!(releases[0].engine_version(), Some(Version::new(1, 2, 0)));
        let archives: Vec<&str> = releases[0].archives().map(|a| a.name.as_str()).collect();
        assert_eq!(archives, vec!["export.zip"]);
    }
}
