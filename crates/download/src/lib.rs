//! Release feed access and export installation.
//!
//! ```no_run
//! # async fn run() -> rotten_download::error::Result<()> {
//! use rotten_download::Downloader;
//! use rotten_version::Version;
//!
//! let downloader = Downloader::new("https://api.github.com/repos/robalyx/rotten/releases", Version::new(1, 0, 0))?;
//! let catalog = downloader.available_exports().await?;
//! if let Some(release) = catalog.releases.first() {
//!     downloader.download_export(release, "exports".as_ref()).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod downloader;
pub mod error;
mod extract;
mod release;

pub use crate::downloader::Downloader;
pub use crate::extract::{ExtractStats, MAX_ENTRY_SIZE, extract_zip, sanitize_entry_name};
pub use crate::release::{Asset, Catalog, Checksum, Release, filter_compatible};
