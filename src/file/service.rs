//! File service for filekeep.
//!
//! Composes normalization, path resolution, the filesystem gateway, the
//! record store and checksumming into the save/load/delete lifecycle.
//!
//! # Ordering
//!
//! Save writes the row first, then the bytes, then stamps the checksum.
//! Delete removes the bytes first, then the row. Either way a failure
//! part way leaves a state that points at the step that failed:
//!
//! - `pending` row, no file: directory creation or write failed.
//! - `written` row, no checksum: checksumming or the stamp update failed.
//! - file without a row: the row delete failed after the file was removed
//!   (the reverse: a row without a file).
//!
//! Nothing is rolled back automatically. [`FileService::audit`] reports
//! these states.

use std::collections::HashSet;
use std::path::PathBuf;

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::audit::{find_orphans, AuditReport, Inconsistency};
use super::checksum::checksum_file;
use super::delivery::Delivery;
use super::normalize::normalize;
use super::path::{FileRecordLike, StorageLocation};
use super::record::{FileFilter, FileRecord, FileRecordUpdate, NewFileRecord, Page, RecordStatus};
use super::repository::FileRecordRepository;
use super::resource::{strip_extension, Resource};
use super::storage::FileStorage;
use crate::{FilekeepError, Result};

/// File service managing stored files and their records.
pub struct FileService<'a> {
    pool: &'a SqlitePool,
    storage: &'a FileStorage,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(pool: &'a SqlitePool, storage: &'a FileStorage) -> Self {
        Self { pool, storage }
    }

    fn repo(&self) -> FileRecordRepository<'a> {
        FileRecordRepository::new(self.pool)
    }

    /// The storage location paths and URLs are resolved against.
    pub fn location(&self) -> &StorageLocation {
        self.storage.location()
    }

    /// Store a resource.
    ///
    /// `name` defaults to the resource's original filename without its last
    /// extension; either way it is normalized and must not end up empty.
    /// `sub_path` is trimmed of surrounding slashes.
    ///
    /// # Returns
    /// The verified record, with its checksum set.
    pub async fn save<R: Resource + ?Sized>(
        &self,
        resource: &R,
        name: Option<&str>,
        sub_path: Option<&str>,
    ) -> Result<FileRecord> {
        let record = self.stage(resource, name, sub_path).await?;
        let record = self.write(resource, record).await?;
        let record = self.stamp(record).await?;

        info!(
            id = record.id,
            path = %record.relative_path(),
            size = record.byte_size,
            "file saved"
        );
        Ok(record)
    }

    /// Persist the row for a resource. No filesystem side effects.
    pub(crate) async fn stage<R: Resource + ?Sized>(
        &self,
        resource: &R,
        name: Option<&str>,
        sub_path: Option<&str>,
    ) -> Result<FileRecord> {
        let raw_name = name.unwrap_or_else(|| strip_extension(resource.original_name()));
        let name = normalize(raw_name);
        if name.is_empty() {
            return Err(FilekeepError::Validation(format!(
                "name {raw_name:?} is empty after normalization"
            )));
        }

        let byte_size = i64::try_from(resource.size()).map_err(|_| {
            FilekeepError::Validation(format!("byte size {} is out of range", resource.size()))
        })?;

        let mut new_record = NewFileRecord::new(
            name,
            resource.extension(),
            resource.original_name(),
            resource.mime_type(),
            byte_size,
        );
        if let Some(sub_path) = sub_path {
            new_record = new_record.with_sub_path(sub_path);
        }

        let record = self.repo().create(&new_record).await.map_err(|e| match e {
            FilekeepError::Validation(_) => e,
            other => FilekeepError::ModelPersist(other.to_string()),
        })?;
        debug!(id = record.id, "file record created");

        Ok(record)
    }

    /// Materialize the resource's bytes at the record's path.
    pub(crate) async fn write<R: Resource + ?Sized>(
        &self,
        resource: &R,
        record: FileRecord,
    ) -> Result<FileRecord> {
        let directory = self.location().directory_for(&record);
        if let Err(e) = self.storage.ensure_directory(&directory) {
            warn!(id = record.id, error = %e, "record left without file");
            return Err(e);
        }

        let destination = self.location().path_for(&record);
        if let Err(e) = self.storage.write_resource(resource, &destination) {
            warn!(id = record.id, error = %e, "record left without file");
            return Err(e);
        }
        debug!(id = record.id, path = %destination.display(), "file written");

        self.repo()
            .update(record.id, &FileRecordUpdate::new().status(RecordStatus::Written))
            .await?
            .ok_or(FilekeepError::RecordNotFound(record.id))
    }

    /// Compute the checksum of the written bytes and record it.
    pub(crate) async fn stamp(&self, record: FileRecord) -> Result<FileRecord> {
        let path = self.location().path_for(&record);
        let checksum = checksum_file(&path).map_err(|e| {
            warn!(id = record.id, error = %e, "record left without checksum");
            e
        })?;

        let update = FileRecordUpdate::new()
            .checksum(checksum)
            .status(RecordStatus::Verified);
        self.repo()
            .update(record.id, &update)
            .await?
            .ok_or(FilekeepError::RecordNotFound(record.id))
    }

    /// Load a record by id. `None` if it doesn't exist.
    pub async fn load(&self, id: i64) -> Result<Option<FileRecord>> {
        self.repo().get_by_id(id).await
    }

    async fn load_required(&self, id: i64) -> Result<FileRecord> {
        self.load(id).await?.ok_or(FilekeepError::RecordNotFound(id))
    }

    /// Search records.
    pub async fn search(&self, filter: &FileFilter) -> Result<Page<FileRecord>> {
        self.repo().search(filter).await
    }

    /// Delete a stored file and its record.
    ///
    /// The file goes first. If it exists and cannot be removed the row is
    /// kept, so metadata never disappears for bytes still on disk. A file
    /// that is already gone is not an error. Once both are gone, sub path
    /// directories left empty are pruned.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let record = self.load_required(id).await?;
        let path = self.resolve_path(&record);

        if self.storage.exists(&path) {
            if let Err(e) = self.storage.remove(&path) {
                warn!(id, error = %e, "file not removed, keeping record");
                return Err(e);
            }
            debug!(id, path = %path.display(), "file removed");
        }

        match self.repo().delete(id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(id, "file removed but record delete affected no rows");
                return Err(FilekeepError::RecordDeleteFailed {
                    id,
                    reason: "no row removed".to_string(),
                });
            }
            Err(e) => {
                warn!(id, error = %e, "file removed but record could not be deleted");
                return Err(FilekeepError::RecordDeleteFailed {
                    id,
                    reason: e.to_string(),
                });
            }
        }

        if record.sub_path.is_some() {
            self.prune_directories(&record);
        }

        info!(id, path = %record.relative_path(), "file deleted");
        Ok(())
    }

    /// Remove the record's sub path directories from the leaf upwards,
    /// stopping at the first one that is not empty. The file directory
    /// itself is never removed.
    fn prune_directories(&self, record: &FileRecord) {
        let base = self.location().base_path(true);
        let mut directory = self.location().directory_for(record);

        while directory != base && directory.starts_with(&base) {
            if !self.storage.remove_directory(&directory) {
                break;
            }
            debug!(directory = %directory.display(), "empty directory pruned");
            if !directory.pop() {
                break;
            }
        }
    }

    /// Absolute path of a record's file.
    pub fn resolve_path<T: FileRecordLike + ?Sized>(&self, record: &T) -> PathBuf {
        self.location().path_for(record)
    }

    /// URL of a record's file.
    pub fn url<T: FileRecordLike + ?Sized>(&self, record: &T, absolute: bool) -> String {
        self.location().url_for(record, absolute)
    }

    /// Read a record's stored bytes.
    pub fn read<T: FileRecordLike + ?Sized>(&self, record: &T) -> Result<Vec<u8>> {
        self.storage.read(&self.resolve_path(record))
    }

    /// Resolve a record to everything a delivery channel needs.
    pub async fn deliver(&self, id: i64) -> Result<Delivery> {
        let record = self.load_required(id).await?;
        let path = self.resolve_path(&record);
        let content = self.storage.read(&path)?;

        Ok(Delivery {
            path,
            content,
            mime_type: record.mime_type,
            download_name: record.original_filename,
        })
    }

    /// Check the stored bytes against the recorded checksum.
    ///
    /// Returns `false` for records that were never stamped.
    pub async fn verify(&self, id: i64) -> Result<bool> {
        let record = self.load_required(id).await?;
        let Some(expected) = record.checksum.as_deref() else {
            return Ok(false);
        };

        let actual = checksum_file(&self.resolve_path(&record))?;
        let matches = actual == expected;
        if !matches {
            warn!(id, "checksum mismatch");
        }
        Ok(matches)
    }

    /// Compare every record against the storage tree.
    ///
    /// Reports rows without files, unverified rows, checksum mismatches and
    /// files no row points at. Paths that cannot be read are reported too and
    /// the audit carries on. Repairs nothing.
    pub async fn audit(&self) -> Result<AuditReport> {
        let records = self.repo().list_all().await?;
        let mut issues = Vec::new();
        let mut expected = HashSet::with_capacity(records.len());

        for record in &records {
            let path = self.resolve_path(record);
            expected.insert(path.clone());

            if !path.exists() {
                issues.push(Inconsistency::MissingFile {
                    id: record.id,
                    path,
                });
                continue;
            }

            match record.checksum.as_deref() {
                Some(checksum) if record.status == RecordStatus::Verified => {
                    match checksum_file(&path) {
                        Ok(actual) if actual == checksum => {}
                        Ok(_) => issues.push(Inconsistency::ChecksumMismatch {
                            id: record.id,
                            path,
                        }),
                        Err(e) => {
                            warn!(id = record.id, error = %e, "cannot checksum stored file");
                            issues.push(Inconsistency::Unreadable {
                                id: Some(record.id),
                                path,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                _ => issues.push(Inconsistency::Unverified {
                    id: record.id,
                    status: record.status,
                }),
            }
        }

        let (files_checked, orphans) = find_orphans(&self.location().base_path(true), &expected);
        issues.extend(orphans);

        let report = AuditReport {
            records_checked: records.len(),
            files_checked,
            issues,
        };
        info!(
            records = report.records_checked,
            files = report.files_checked,
            issues = report.issues.len(),
            "audit complete"
        );
        Ok(report)
    }
}
