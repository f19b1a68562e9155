//! Test helpers for integration tests.
//!
//! Provides a sandboxed store: a temporary `webroot` directory and an
//! in-memory database.

#![allow(dead_code)]

use std::path::PathBuf;

use filekeep::config::StorageConfig;
use filekeep::{Database, FileService, FileStorage};
use tempfile::TempDir;

/// A storage root and database that disappear with the value.
pub struct TestStore {
    temp_dir: TempDir,
    pub db: Database,
    pub storage: FileStorage,
}

impl TestStore {
    /// Create a store rooted at `<tmp>/webroot` with the default file dir.
    pub async fn new() -> Self {
        Self::with_config(|config| config).await
    }

    /// Create a store, adjusting the storage configuration first.
    pub async fn with_config(adjust: impl FnOnce(StorageConfig) -> StorageConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().join("webroot");
        let config = adjust(StorageConfig::new(base.to_string_lossy()));
        let storage = FileStorage::new(&config).expect("Failed to create storage");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");

        Self {
            temp_dir,
            db,
            storage,
        }
    }

    pub fn service(&self) -> FileService<'_> {
        FileService::new(self.db.pool(), &self.storage)
    }

    /// The `webroot/files` directory, resolved.
    pub fn files_dir(&self) -> PathBuf {
        self.storage.location().base_path(true)
    }

    /// A scratch directory outside the storage root.
    pub fn scratch(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("scratch");
        std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
        dir
    }
}
