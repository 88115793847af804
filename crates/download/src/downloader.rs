//! Fetching releases and installing export archives.
//!
//! Installing is all-or-nothing: every archive of a release is downloaded,
//! verified and extracted into a staging directory beside the destination,
//! and only then does the staging extraction replace the destination with a
//! single rename. Any failure leaves the previous export in place.

use crate::error::{ErrorKind, Result};
use crate::extract::{MAX_ENTRY_SIZE, extract_zip};
use crate::release::{Asset, Catalog, Checksum, Release, filter_compatible};
use exn::ResultExt;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use rotten_version::Version;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

const USER_AGENT: &str = concat!("rotten/", env!("CARGO_PKG_VERSION"));
const FEED_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const STAGING_PREFIX: &str = ".rotten-download-";

pub struct Downloader {
    client: Client,
    releases_url: String,
    engine_version: Version,
    max_entry_size: u64,
}
impl Downloader {
    /// Create a downloader for the feed at `releases_url`, filtering releases
    /// for compatibility with `engine_version`.
    pub fn new(releases_url: impl Into<String>, engine_version: Version) -> Result<Self> {
        let releases_url = releases_url.into();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .or_raise(|| ErrorKind::Feed(releases_url.clone()))?;
        Ok(Self {
            client,
            releases_url,
            engine_version,
            max_entry_size: MAX_ENTRY_SIZE,
        })
    }

    /// Override the per-entry decompression cap.
    pub fn with_max_entry_size(mut self, max_entry_size: u64) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    pub fn engine_version(&self) -> &Version {
        &self.engine_version
    }

    /// Fetch the release feed and keep the releases this engine can read.
    ///
    /// When an incompatible release targets a newer engine, the compatible
    /// releases are still returned and [`Catalog::newer_version`] is set.
    #[instrument(skip(self), fields(url = %self.releases_url))]
    pub async fn available_exports(&self) -> Result<Catalog> {
        let url = &self.releases_url;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, FEED_MEDIA_TYPE)
            .send()
            .await
            .or_raise(|| ErrorKind::Feed(url.clone()))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Feed(format!("{url} returned {status}")));
        }
        let releases: Vec<Release> = response.json().await.or_raise(|| ErrorKind::Feed(url.clone()))?;
        let total = releases.len();

        let catalog = filter_compatible(releases, &self.engine_version);
        tracing::info!(total, compatible = catalog.releases.len(), "Fetched release feed");
        if let Some(newer) = &catalog.newer_version {
            tracing::warn!(current = %self.engine_version, newer = %newer, "A newer engine version is available");
        }
        Ok(catalog)
    }

    /// Download, verify and extract every zip asset of `release`, then
    /// atomically replace `destination` with the result.
    #[instrument(skip(self, release), fields(tag = %release.tag_name, destination = %destination.display()))]
    pub async fn download_export(&self, release: &Release, destination: &Path) -> Result<()> {
        let archives: Vec<&Asset> = release.archives().collect();
        if archives.is_empty() {
            exn::bail!(ErrorKind::NoArchive(release.tag_name.clone()));
        }

        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).await.or_raise(|| ErrorKind::Io(parent.clone()))?;
        // Staging shares the destination's filesystem so the final rename is
        // atomic. Dropping it removes everything left inside.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)
            .or_raise(|| ErrorKind::Io(parent.clone()))?;
        let extracted = staging.path().join("extracted");
        fs::create_dir(&extracted).await.or_raise(|| ErrorKind::Io(extracted.clone()))?;

        for asset in archives {
            let archive = staging.path().join(format!("{}.zip", asset.id));
            let digest = self.fetch_asset(asset, &archive).await?;
            verify_checksum(release, asset, &digest)?;

            let (source, target, limit) = (archive.clone(), extracted.clone(), self.max_entry_size);
            let stats = tokio::task::spawn_blocking(move || extract_zip(&source, &target, limit))
                .await
                .or_raise(|| ErrorKind::Task)??;
            tracing::info!(
                asset = %asset.name,
                files = stats.files,
                skipped = stats.skipped,
                "Extracted archive"
            );
        }

        publish(&extracted, destination).await?;
        tracing::info!("Export installed");
        Ok(())
    }

    /// Stream an asset to `path`, returning its hex SHA-256 digest.
    async fn fetch_asset(&self, asset: &Asset, path: &Path) -> Result<String> {
        let url = &asset.browser_download_url;
        let failed = |status: Option<u16>| ErrorKind::DownloadFailed {
            url: url.clone(),
            status,
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .or_raise(|| failed(None))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(failed(Some(status.as_u16())));
        }

        let mut file = fs::File::create(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        let mut hasher = Sha256::new();
        let mut size = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.or_raise(|| failed(Some(status.as_u16())))?;
            hasher.update(&chunk);
            size += chunk.len() as u64;
            file.write_all(&chunk).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        }
        file.flush().await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;

        tracing::debug!(asset = %asset.name, size, "Downloaded asset");
        Ok(hex::encode(hasher.finalize()))
    }
}

fn verify_checksum(release: &Release, asset: &Asset, actual: &str) -> Result<()> {
    match release.checksum_for(&asset.name) {
        Checksum::Missing => {
            tracing::warn!(asset = %asset.name, "No checksum published, skipping verification");
            Ok(())
        },
        Checksum::Sha256(expected) if expected.eq_ignore_ascii_case(actual) => {
            tracing::debug!(asset = %asset.name, "Checksum verified");
            Ok(())
        },
        Checksum::Sha256(_) | Checksum::Malformed(_) => exn::bail!(ErrorKind::ChecksumMismatch(asset.name.clone())),
    }
}

/// Replace `destination` with `extracted`.
async fn publish(extracted: &Path, destination: &Path) -> Result<()> {
    match fs::remove_dir_all(destination).await {
        Ok(()) => {},
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
        Err(err) => return Err(err).or_raise(|| ErrorKind::Io(destination.to_path_buf())),
    }
    fs::rename(extracted, destination).await.or_raise(|| ErrorKind::Io(destination.to_path_buf()))
}
