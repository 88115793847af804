pub mod error;
mod export;
mod settings;

pub use crate::export::{EXPORT_CONFIG_FILENAME, ExportConfig};
pub use crate::settings::{BUILD_ENGINE_VERSION, ENV_PREFIX, FeedSettings, Settings};
