//! The `export_config.json` sidecar shipped inside every export directory.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Format, Json};
use rotten_hash::{HashParams, HashType};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const EXPORT_CONFIG_FILENAME: &str = "export_config.json";

/// Hashing parameters and provenance of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    /// Version of the engine that produced the export.
    pub engine_version: String,
    pub export_version: String,
    pub salt: String,
    #[serde(default)]
    pub description: String,
    pub hash_type: HashType,
    pub iterations: u32,
    /// Argon2id memory cost in MiB.
    pub memory: u32,
}
impl ExportConfig {
    /// Load and validate the sidecar from an export directory.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self> {
        let path = directory.as_ref().join(EXPORT_CONFIG_FILENAME);
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        let config: Self = Figment::from(Json::file_exact(&path))
            .extract()
            .or_raise(|| ErrorKind::Invalid(path.display().to_string()))?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            engine_version = %config.engine_version,
            export_version = %config.export_version,
            hash_type = %config.hash_type,
            "Loaded export config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine_version.is_empty() {
            exn::bail!(ErrorKind::EmptyField("engine version"));
        }
        if self.export_version.is_empty() {
            exn::bail!(ErrorKind::EmptyField("export version"));
        }
        if self.salt.is_empty() {
            exn::bail!(ErrorKind::EmptyField("salt"));
        }
        Ok(())
    }

    /// The parameters needed to reproduce this export's lookup keys.
    pub fn hash_params(&self) -> HashParams {
        HashParams {
            salt: self.salt.clone(),
            hash_type: self.hash_type,
            iterations: self.iterations,
            memory_mib: self.memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const VALID: &str = r#"{
        "engineVersion": "1.2.3",
        "exportVersion": "2024-06-01",
        "salt": "test_salt",
        "description": "Weekly export",
        "hashType": "sha256",
        "iterations": 3,
        "memory": 64
    }"#;

    fn write(contents: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(EXPORT_CONFIG_FILENAME), contents).unwrap();
        dir
    }

    #[test]
    fn test_load_valid() {
        let dir = write(VALID);
        let config = ExportConfig::load(dir.path()).unwrap();
        assert_eq!(config.engine_version, "1.2.3");
        assert_eq!(config.description, "Weekly export");
        assert_eq!(
            config.hash_params(),
            HashParams {
                salt: "test_salt".to_string(),
                hash_type: HashType::Sha256,
                iterations: 3,
                memory_mib: 64,
            }
        );
    }

    #[test]
    fn test_description_optional() {
        let dir = write(
            r#"{"engineVersion":"1.0.0","exportVersion":"1","salt":"s","hashType":"argon2id","iterations":1,"memory":1}"#,
        );
        let config = ExportConfig::load(dir.path()).unwrap();
        assert_eq!(config.description, "");
        assert_eq!(config.hash_type, HashType::Argon2id);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ExportConfig::load(dir.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(dir.path().join(EXPORT_CONFIG_FILENAME)));
    }

    #[rstest]
    #[case::not_json("engineVersion = 1")]
    #[case::unknown_hash(r#"{"engineVersion":"1","exportVersion":"1","salt":"s","hashType":"md5","iterations":1,"memory":1}"#)]
    #[case::missing_hash(r#"{"engineVersion":"1","exportVersion":"1","salt":"s","iterations":1,"memory":1}"#)]
    #[case::negative(r#"{"engineVersion":"1","exportVersion":"1","salt":"s","hashType":"sha256","iterations":-1,"memory":1}"#)]
    fn test_invalid(#[case] contents: &str) {
        let dir = write(contents);
        let err = ExportConfig::load(dir.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)), "{err:?}");
    }

    #[rstest]
    #[case(|c: &mut ExportConfig| c.engine_version.clear(), "engine version")]
    #[case(|c: &mut ExportConfig| c.export_version.clear(), "export version")]
    #[case(|c: &mut ExportConfig| c.salt.clear(), "salt")]
    fn test_empty_fields(#[case] clear: fn(&mut ExportConfig), #[case] name: &'static str) {
        let mut config = ExportConfig::load(write(VALID).path()).unwrap();
        clear(&mut config);
        assert_eq!(*config.validate().unwrap_err(), ErrorKind::EmptyField(name));
    }

    #[test]
    fn test_load_rejects_empty_salt() {
        let dir = write(&VALID.replace(r#""salt": "test_salt""#, r#""salt": """#));
        let err = ExportConfig::load(dir.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyField("salt"));
    }
}
