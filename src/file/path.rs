//! Path and URL resolution for stored files.
//!
//! Everything here is pure: no filesystem access happens while resolving.
//! The storage root is resolved once by [`super::FileStorage::new`] and
//! handed to [`StorageLocation`].

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

/// Capability set a record type needs to be resolvable on disk.
///
/// The on-disk name of a record is always `name-id.extension` under its
/// optional sub path, so any type exposing these four values resolves
/// identically to [`super::FileRecord`].
pub trait FileRecordLike {
    /// Store-assigned identifier.
    fn id(&self) -> i64;

    /// Sanitized base name, without extension.
    fn name(&self) -> &str;

    /// Lowercase extension, without leading dot.
    fn extension(&self) -> &str;

    /// Logical subdirectory, stored without leading or trailing slash.
    fn sub_path(&self) -> Option<&str>;

    /// Sub path with a trailing slash, or an empty string.
    fn internal_path(&self) -> String {
        match self.sub_path() {
            Some(sub_path) if !sub_path.is_empty() => format!("{sub_path}/"),
            _ => String::new(),
        }
    }

    /// Id-qualified filename using the record's own extension.
    fn filename(&self) -> String {
        self.filename_with_extension(self.extension())
    }

    /// Id-qualified filename with a different extension.
    ///
    /// Useful for derived files such as thumbnails stored next to the
    /// original.
    fn filename_with_extension(&self, extension: &str) -> String {
        format!("{}-{}.{}", self.name(), self.id(), extension)
    }

    /// Path relative to the file directory, `/`-separated.
    fn relative_path(&self) -> String {
        format!("{}{}", self.internal_path(), self.filename())
    }

    /// Full path below `base_path`.
    fn absolute_path(&self, base_path: &Path) -> PathBuf {
        base_path.join(self.relative_path())
    }
}

/// Resolved storage root and URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    root: PathBuf,
    file_dir: String,
    base_url: String,
}

impl StorageLocation {
    /// Create a location from an already resolved root directory.
    pub fn new(root: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        Self {
            root: root.into(),
            file_dir: config.file_dir.trim_matches('/').to_string(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// The resolved root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding stored files.
    ///
    /// Absolute form is `root/file_dir`; relative form is `file_dir` alone.
    pub fn base_path(&self, absolute: bool) -> PathBuf {
        if absolute {
            self.root.join(&self.file_dir)
        } else {
            PathBuf::from(&self.file_dir)
        }
    }

    /// URL prefix for stored files, without trailing slash.
    pub fn base_url(&self, absolute: bool) -> String {
        let url = if absolute {
            format!("{}/{}", self.base_url, self.file_dir)
        } else {
            self.file_dir.clone()
        };
        url.trim_end_matches('/').to_string()
    }

    /// Directory a record's file lives in.
    pub fn directory_for<R: FileRecordLike + ?Sized>(&self, record: &R) -> PathBuf {
        let base = self.base_path(true);
        match record.sub_path() {
            Some(sub_path) if !sub_path.is_empty() => base.join(sub_path),
            _ => base,
        }
    }

    /// Absolute path of a record's file.
    pub fn path_for<R: FileRecordLike + ?Sized>(&self, record: &R) -> PathBuf {
        record.absolute_path(&self.base_path(true))
    }

    /// URL of a record's file with each path segment percent-encoded.
    pub fn url_for<R: FileRecordLike + ?Sized>(&self, record: &R, absolute: bool) -> String {
        let encoded: Vec<String> = record
            .relative_path()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url(absolute), encoded.join("/"))
    }
}
