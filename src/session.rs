//! An opened export, ready to answer lookups by raw ID.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rotten_checker::validator;
use rotten_checker::{CheckResult, CheckType, CheckerHandle, StorageType, checker_for};
use rotten_config::ExportConfig;
use std::path::Path;
use tracing::instrument;

pub struct Session {
    check_type: CheckType,
    config: ExportConfig,
    checker: CheckerHandle,
    hash_count: u64,
}
impl Session {
    /// Validate the export layout, load its config sidecar and read the
    /// record count.
    #[instrument(skip(directory), fields(directory = %directory.as_ref().display()))]
    pub async fn open(directory: impl AsRef<Path>, check_type: CheckType, storage_type: StorageType) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        validator::validate(&directory, check_type, storage_type)
            .await
            .or_raise(|| ErrorKind::Validation(directory.clone()))?;
        let config = ExportConfig::load(&directory).or_raise(|| ErrorKind::Config)?;

        let checker = checker_for(&directory, storage_type);
        let hash_count = checker.hash_count(check_type).await.or_raise(|| ErrorKind::Checker)?;
        tracing::info!(
            check_type = %check_type,
            storage_type = %storage_type,
            export_version = %config.export_version,
            hash_count,
            "Opened export"
        );

        Ok(Self {
            check_type,
            config,
            checker,
            hash_count,
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Number of records in the export for this session's check type.
    pub fn hash_count(&self) -> u64 {
        self.hash_count
    }

    /// Hash `id` with the export's parameters and look it up.
    pub async fn lookup(&self, id: u64) -> Result<CheckResult> {
        let params = self.config.hash_params();
        // Argon2id is deliberately expensive in both CPU and memory.
        let hash = tokio::task::spawn_blocking(move || params.hash(id))
            .await
            .or_raise(|| ErrorKind::Hash(id))?
            .or_raise(|| ErrorKind::Hash(id))?;
        let result = self.checker.check(self.check_type, &hash).await.or_raise(|| ErrorKind::Checker)?;
        tracing::debug!(id, found = result.found, "Looked up ID");
        Ok(result)
    }

    /// Look up each ID in order, stopping at the first failure.
    pub async fn lookup_many(&self, ids: &[u64]) -> Result<Vec<(u64, CheckResult)>> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            results.push((id, self.lookup(id).await?));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotten_hash::{HashType, hash_id};
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    const SALT: &str = "test_salt";
    const KNOWN_ID: u64 = 12345;

    fn export_config(salt: &str) -> String {
        serde_json::json!({
            "engineVersion": "1.0.0",
            "exportVersion": "2024.06",
            "salt": salt,
            "description": "fixture",
            "hashType": "sha256",
            "iterations": 1,
            "memory": 1
        })
        .to_string()
    }

    /// An export with one flagged user and one flagged group, stored as CSV.
    fn csv_export() -> TempDir {
        let dir = TempDir::new().unwrap();
        let user = hash_id(KNOWN_ID, SALT, HashType::Sha256, 1, 1).unwrap();
        let group = hash_id(777, SALT, HashType::Sha256, 1, 1).unwrap();
        fs::write(dir.path().join("export_config.json"), export_config(SALT)).unwrap();
        fs::write(
            dir.path().join("users.csv"),
            format!("hash,status,reason,confidence\n{user},flagged,\"spam, repeated\",0.75\nabc,clean,,0.1\n"),
        )
        .unwrap();
        fs::write(dir.path().join("groups.csv"), format!("hash,status,reason,confidence\n{group},locked,raid,1.0\n")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_lookup() {
        let export = csv_export();
        let session = Session::open(export.path(), CheckType::User, StorageType::Csv).await.unwrap();
        assert_eq!(session.hash_count(), 2);
        assert_eq!(session.config().salt, SALT);

        let result = session.lookup(KNOWN_ID).await.unwrap();
        assert_eq!(result, CheckResult::found("flagged", "spam, repeated", 0.75));
        assert_eq!(session.lookup(1).await.unwrap(), CheckResult::not_found());
    }

    #[tokio::test]
    async fn test_friends_use_user_records() {
        let export = csv_export();
        let session = Session::open(export.path(), CheckType::Friends, StorageType::Csv).await.unwrap();
        let results = session.lookup_many(&[1, KNOWN_ID, 777]).await.unwrap();
        let found: Vec<(u64, bool)> = results.iter().map(|(id, result)| (*id, result.found)).collect();
        assert_eq!(found, vec![(1, false), (KNOWN_ID, true), (777, false)]);
    }

    #[tokio::test]
    async fn test_group_lookup() {
        let export = csv_export();
        let session = Session::open(export.path(), CheckType::Group, StorageType::Csv).await.unwrap();
        assert_eq!(session.hash_count(), 1);
        assert!(session.lookup(777).await.unwrap().found);
        assert!(!session.lookup(KNOWN_ID).await.unwrap().found);
    }

    #[rstest]
    #[case::binary(StorageType::Binary)]
    #[case::sqlite(StorageType::Sqlite)]
    #[tokio::test]
    async fn test_open_missing_storage(#[case] storage_type: StorageType) {
        let export = csv_export();
        let err = Session::open(export.path(), CheckType::User, storage_type).await.err().unwrap();
        assert_eq!(*err, ErrorKind::Validation(export.path().to_path_buf()));
    }

    #[tokio::test]
    async fn test_open_missing_config() {
        let export = csv_export();
        fs::remove_file(export.path().join("export_config.json")).unwrap();
        let err = Session::open(export.path(), CheckType::User, StorageType::Csv).await.err().unwrap();
        assert_eq!(*err, ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_open_malformed_storage() {
        let export = csv_export();
        fs::write(export.path().join("users.csv"), "hash,status,reason\nabc,clean,\n").unwrap();
        let err = Session::open(export.path(), CheckType::User, StorageType::Csv).await.err().unwrap();
        assert_eq!(*err, ErrorKind::Checker);
    }

    #[tokio::test]
    async fn test_different_salt_misses() {
        let export = csv_export();
        fs::write(export.path().join("export_config.json"), export_config("another_salt")).unwrap();
        let session = Session::open(export.path(), CheckType::User, StorageType::Csv).await.unwrap();
        assert!(!session.lookup(KNOWN_ID).await.unwrap().found);
    }
}
