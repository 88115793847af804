//! Application settings.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. a TOML file (an explicit path, or `config.toml` in the platform config
//!    directory when it exists),
//! 3. environment variables prefixed with `ROTTEN_`, using `__` to reach
//!    nested keys (`ROTTEN_FEED__OWNER=someone`).

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rotten_version::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "ROTTEN_";
pub const SETTINGS_FILENAME: &str = "config.toml";

/// Engine version compiled into this build, `0.0.0` when not provided.
pub const BUILD_ENGINE_VERSION: &str = match option_env!("ROTTEN_ENGINE_VERSION") {
    Some(version) => version,
    None => "0.0.0",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Engine version used to decide which exports are compatible.
    pub engine_version: Version,
    pub feed: FeedSettings,
    /// Where downloaded exports are published.
    pub download_dir: PathBuf,
    /// Where `scan` looks for exports when no root is given.
    pub search_root: PathBuf,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_version: BUILD_ENGINE_VERSION.parse().unwrap_or_default(),
            feed: FeedSettings::default(),
            download_dir: std::env::temp_dir().join("rotector-exports"),
            search_root: PathBuf::from("."),
        }
    }
}
impl Settings {
    /// Load settings from every layer.
    ///
    /// An explicit `path` must exist; the platform default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => figment = figment.merge(Toml::file_exact(path)),
            None => {
                if let Some(default) = Self::default_path().filter(|default| default.is_file()) {
                    tracing::debug!(path = %default.display(), "Using settings file");
                    figment = figment.merge(Toml::file_exact(default));
                }
            },
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Invalid("settings".to_string()))
    }

    /// `config.toml` inside the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "robalyx", "rotten").map(|dirs| dirs.config_dir().join(SETTINGS_FILENAME))
    }
}

/// Location of the release feed exports are published to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSettings {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
}
impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: "robalyx".to_string(),
            repo: "rotten".to_string(),
        }
    }
}
impl FeedSettings {
    pub fn releases_url(&self) -> String {
        format!("{}/repos/{}/{}/releases", self.api_base.trim_end_matches('/'), self.owner, self.repo)
    }
}
