//! Filesystem gateway for filekeep.
//!
//! Wraps the raw OS calls used by the service: directory creation and
//! removal, atomic writes, reads and deletes. Paths come from
//! [`StorageLocation`]; this module never decides where a file goes.
//!
//! Layout under the resolved root:
//! ```text
//! {base_path}/
//! └── {file_dir}/
//!     ├── photo-1.jpg
//!     └── {sub_path}/
//!         └── report-2.pdf
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::path::StorageLocation;
use super::resource::Resource;
use crate::config::StorageConfig;
use crate::{FilekeepError, Result};

/// File storage bound to one resolved storage root.
#[derive(Debug, Clone)]
pub struct FileStorage {
    location: StorageLocation,
}

impl FileStorage {
    /// Create storage for the given configuration.
    ///
    /// The file directory is created if missing and the base path is
    /// resolved to its real path once, here; later configuration changes
    /// have no effect on this instance. A `file_dir` that would leave the
    /// base path is rejected before anything is created.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let base_path = PathBuf::from(&config.base_path);
        let file_dir = base_path.join(config.file_dir.trim_matches('/'));
        ensure_dir(&file_dir)?;

        let root = fs::canonicalize(&base_path).map_err(|e| {
            FilekeepError::Config(format!(
                "cannot resolve base path {}: {e}",
                base_path.display()
            ))
        })?;
        debug!(root = %root.display(), "file storage root resolved");

        Ok(Self {
            location: StorageLocation::new(root, config),
        })
    }

    /// The resolved location used for all path computations.
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Make sure `path` exists as a directory, creating intermediate
    /// directories as needed.
    ///
    /// Succeeds when the directory already exists, including when another
    /// writer created it concurrently.
    pub fn ensure_directory(&self, path: &Path) -> Result<()> {
        ensure_dir(path)
    }

    /// Remove an empty directory.
    ///
    /// Returns `false` when the path is not a directory or removal fails
    /// (for example because it is not empty). Never recurses.
    pub fn remove_directory(&self, path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }
        match fs::remove_dir(path) {
            Ok(()) => true,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "directory not removed");
                false
            }
        }
    }

    /// Write a resource's bytes to `destination`.
    ///
    /// Bytes go to a temporary sibling first and are renamed into place, so
    /// the destination is either absent or complete. On failure the
    /// temporary file is removed.
    pub fn write_resource<R: Resource + ?Sized>(
        &self,
        resource: &R,
        destination: &Path,
    ) -> Result<()> {
        let temp_path = temp_path_for(destination);
        debug!(
            destination = %destination.display(),
            size = resource.size(),
            "writing resource"
        );

        let written = resource
            .save_as(&temp_path)
            .and_then(|()| fs::rename(&temp_path, destination));

        if let Err(source) = written {
            if temp_path.exists() {
                if let Err(e) = fs::remove_file(&temp_path) {
                    warn!(path = %temp_path.display(), error = %e, "failed to remove temporary file");
                }
            }
            return Err(FilekeepError::FileWriteFailed {
                path: destination.to_path_buf(),
                source,
            });
        }

        Ok(())
    }

    /// Delete a file.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FilekeepError::FileDeleteFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Read a whole file.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|source| FilekeepError::FileReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check whether anything exists at `path`.
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        // Lost a race with another writer.
        Err(_) if path.is_dir() => Ok(()),
        Err(source) => Err(FilekeepError::DirectoryCreateFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    destination.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::UploadedFile;
    use tempfile::TempDir;

    struct FailingResource;

    impl Resource for FailingResource {
        fn original_name(&self) -> &str {
            "broken.txt"
        }
        fn mime_type(&self) -> &str {
            "text/plain"
        }
        fn size(&self) -> u64 {
            4
        }
        fn save_as(&self, path: &Path) -> io::Result<()> {
            fs::write(path, b"pa")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn setup_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().join("webroot").to_string_lossy());
        let storage = FileStorage::new(&config).unwrap();
        (temp_dir, storage)
    }

    fn entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_new_creates_file_directory() {
        let (temp_dir, storage) = setup_storage();
        let file_dir = temp_dir.path().join("webroot").join("files");

        assert!(file_dir.is_dir());
        assert!(storage.location().root().is_absolute());
        assert_eq!(
            storage.location().base_path(true),
            fs::canonicalize(&file_dir).unwrap()
        );
    }

    #[test]
    fn test_new_rejects_escaping_file_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().join("webroot").to_string_lossy())
            .with_file_dir("../elsewhere");

        let result = FileStorage::new(&config);

        assert!(matches!(result, Err(FilekeepError::Config(_))));
        assert!(!temp_dir.path().join("elsewhere").exists());
        assert!(!temp_dir.path().join("webroot").exists());
    }

    #[test]
    fn test_ensure_directory_is_idempotent() {
        let (_temp_dir, storage) = setup_storage();
        let dir = storage.location().base_path(true).join("a").join("b");

        storage.ensure_directory(&dir).unwrap();
        assert!(dir.is_dir());
        storage.ensure_directory(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_directory_blocked_by_file() {
        let (_temp_dir, storage) = setup_storage();
        let blocker = storage.location().base_path(true).join("blocked");
        fs::write(&blocker, b"x").unwrap();

        let result = storage.ensure_directory(&blocker.join("child"));
        assert!(matches!(
            result,
            Err(FilekeepError::DirectoryCreateFailed { .. })
        ));
    }

    #[test]
    fn test_remove_directory() {
        let (_temp_dir, storage) = setup_storage();
        let base = storage.location().base_path(true);
        let empty = base.join("empty");
        fs::create_dir(&empty).unwrap();

        assert!(storage.remove_directory(&empty));
        assert!(!empty.exists());
    }

    #[test]
    fn test_remove_directory_does_not_recurse() {
        let (_temp_dir, storage) = setup_storage();
        let full = storage.location().base_path(true).join("full");
        fs::create_dir(&full).unwrap();
        fs::write(full.join("keep.txt"), b"x").unwrap();

        assert!(!storage.remove_directory(&full));
        assert!(full.join("keep.txt").exists());
    }

    #[test]
    fn test_remove_directory_missing_or_file() {
        let (_temp_dir, storage) = setup_storage();
        let base = storage.location().base_path(true);
        let file = base.join("plain.txt");
        fs::write(&file, b"x").unwrap();

        assert!(!storage.remove_directory(&base.join("missing")));
        assert!(!storage.remove_directory(&file));
        assert!(file.exists());
    }

    #[test]
    fn test_write_and_read_resource() {
        let (_temp_dir, storage) = setup_storage();
        let dest = storage.location().base_path(true).join("hello-1.txt");
        let upload = UploadedFile::new("hello.txt", b"Hello, World!".to_vec());

        storage.write_resource(&upload, &dest).unwrap();

        assert_eq!(storage.read(&dest).unwrap(), b"Hello, World!");
        assert_eq!(entries(dest.parent().unwrap()), vec!["hello-1.txt".to_string()]);
    }

    #[test]
    fn test_write_resource_replaces_existing() {
        let (_temp_dir, storage) = setup_storage();
        let dest = storage.location().base_path(true).join("a-1.bin");
        fs::write(&dest, b"old").unwrap();

        storage
            .write_resource(&UploadedFile::new("a.bin", b"new".to_vec()), &dest)
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn test_write_resource_failure_leaves_nothing_behind() {
        let (_temp_dir, storage) = setup_storage();
        let dir = storage.location().base_path(true);
        let dest = dir.join("broken-1.txt");

        let result = storage.write_resource(&FailingResource, &dest);

        assert!(matches!(result, Err(FilekeepError::FileWriteFailed { .. })));
        assert!(!dest.exists());
        assert!(entries(&dir).is_empty());
    }

    #[test]
    fn test_write_resource_into_missing_directory() {
        let (_temp_dir, storage) = setup_storage();
        let dest = storage
            .location()
            .base_path(true)
            .join("no-such-dir")
            .join("a-1.txt");

        let result = storage.write_resource(&UploadedFile::new("a.txt", vec![1]), &dest);
        assert!(matches!(result, Err(FilekeepError::FileWriteFailed { .. })));
    }

    #[test]
    fn test_remove() {
        let (_temp_dir, storage) = setup_storage();
        let path = storage.location().base_path(true).join("gone-1.txt");
        fs::write(&path, b"bye").unwrap();

        assert!(storage.remove(&path).unwrap());
        assert!(!storage.exists(&path));
    }

    #[test]
    fn test_remove_missing_is_not_an_error() {
        let (_temp_dir, storage) = setup_storage();
        let path = storage.location().base_path(true).join("never-1.txt");

        assert!(!storage.remove(&path).unwrap());
    }

    #[test]
    fn test_remove_directory_in_place_of_file_fails() {
        let (_temp_dir, storage) = setup_storage();
        let path = storage.location().base_path(true).join("dir-1.txt");
        fs::create_dir(&path).unwrap();

        let result = storage.remove(&path);
        assert!(matches!(result, Err(FilekeepError::FileDeleteFailed { .. })));
    }

    #[test]
    fn test_read_missing() {
        let (_temp_dir, storage) = setup_storage();
        let result = storage.read(&storage.location().base_path(true).join("none"));
        assert!(matches!(result, Err(FilekeepError::FileReadFailed { .. })));
    }

    #[test]
    fn test_binary_content() {
        let (_temp_dir, storage) = setup_storage();
        let dest = storage.location().base_path(true).join("binary-1.bin");
        let content: Vec<u8> = (0..=255).collect();

        storage
            .write_resource(&UploadedFile::new("binary.bin", content.clone()), &dest)
            .unwrap();

        assert_eq!(storage.read(&dest).unwrap(), content);
    }
}
