//! File record types for filekeep.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::normalize::normalize;
use super::path::FileRecordLike;
use super::resource::DEFAULT_EXTENSION;
use crate::{FilekeepError, Result};

/// Maximum length of any string column (in characters).
pub const MAX_FIELD_LENGTH: usize = 255;

/// Largest byte size representable in the index (10 digits).
pub const MAX_BYTE_SIZE: i64 = 9_999_999_999;

/// Longest on-disk filename most filesystems accept (in bytes).
pub const MAX_FILENAME_BYTES: usize = 255;

/// Digits in the largest possible id.
const MAX_ID_DIGITS: usize = 19;

/// Where a record is in the save lifecycle.
///
/// `save` only ever returns [`RecordStatus::Verified`] records. The other
/// states are visible through `load` and `search` while a save is in
/// flight, or permanently when a save failed part way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Row persisted, bytes not yet on disk.
    #[default]
    Pending,
    /// Bytes on disk, checksum not yet stamped.
    Written,
    /// Checksum stamped over the on-disk bytes.
    Verified,
}

impl RecordStatus {
    /// Convert status to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Written => "written",
            RecordStatus::Verified => "verified",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for an unrecognized status string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown record status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for RecordStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RecordStatus::Pending),
            "written" => Ok(RecordStatus::Written),
            "verified" => Ok(RecordStatus::Verified),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

impl TryFrom<String> for RecordStatus {
    type Error = ParseStatusError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Metadata row describing one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    /// Store-assigned id, never reused.
    pub id: i64,
    /// Sanitized base name, without extension.
    pub name: String,
    /// Lowercase extension, without leading dot.
    pub extension: String,
    /// Logical subdirectory under the file directory.
    #[sqlx(rename = "path")]
    pub sub_path: Option<String>,
    /// Filename as uploaded.
    #[sqlx(rename = "filename")]
    pub original_filename: String,
    /// MIME type captured at ingestion.
    pub mime_type: String,
    /// Size in bytes captured at ingestion.
    pub byte_size: i64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the stored bytes, set once the write is verified.
    #[sqlx(rename = "hash")]
    pub checksum: Option<String>,
    /// Save lifecycle state.
    #[sqlx(try_from = "String")]
    pub status: RecordStatus,
}

impl FileRecord {
    /// Whether the checksum has been stamped.
    pub fn is_verified(&self) -> bool {
        self.status == RecordStatus::Verified && self.checksum.is_some()
    }
}

impl FileRecordLike for FileRecord {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn sub_path(&self) -> Option<&str> {
        self.sub_path.as_deref()
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Sanitized base name.
    pub name: String,
    /// Lowercase extension.
    pub extension: String,
    /// Optional sub path.
    pub sub_path: Option<String>,
    /// Filename as uploaded.
    pub original_filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub byte_size: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewFileRecord {
    /// Create a new record stamped with the current time.
    ///
    /// The extension is normalized like a name, lower-cased and stripped
    /// of leading dots. One that ends up empty becomes [`DEFAULT_EXTENSION`].
    pub fn new(
        name: impl Into<String>,
        extension: &str,
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        byte_size: i64,
    ) -> Self {
        Self {
            name: name.into(),
            extension: normalize_extension(extension),
            sub_path: None,
            original_filename: original_filename.into(),
            mime_type: mime_type.into(),
            byte_size,
            created_at: Utc::now(),
        }
    }

    /// Set the sub path, trimming surrounding slashes.
    ///
    /// A path that is empty after trimming clears the sub path.
    pub fn with_sub_path(mut self, sub_path: &str) -> Self {
        let trimmed = sub_path.trim_matches('/');
        self.sub_path = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Check the record against the index constraints.
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("extension", &self.extension)?;
        require("original filename", &self.original_filename)?;
        require("mime type", &self.mime_type)?;
        self.check_filename_length()?;
        if let Some(ref sub_path) = self.sub_path {
            check_length("path", sub_path)?;
            if sub_path.split('/').any(|segment| segment == "..") {
                return Err(FilekeepError::Validation(
                    "path must not contain '..' segments".to_string(),
                ));
            }
        }

        if !(0..=MAX_BYTE_SIZE).contains(&self.byte_size) {
            return Err(FilekeepError::Validation(format!(
                "byte size {} is out of range",
                self.byte_size
            )));
        }

        Ok(())
    }

    /// The stored filename is `name-<id>.<extension>`, sized for the widest id.
    fn check_filename_length(&self) -> Result<()> {
        let longest = self.name.len() + 1 + MAX_ID_DIGITS + 1 + self.extension.len();
        if longest > MAX_FILENAME_BYTES {
            return Err(FilekeepError::Validation(format!(
                "name and extension too long for a filename ({longest} of {MAX_FILENAME_BYTES} bytes)"
            )));
        }
        Ok(())
    }
}

fn normalize_extension(extension: &str) -> String {
    let extension = normalize(extension.trim_start_matches('.')).to_lowercase();
    if extension.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        extension
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(FilekeepError::Validation(format!("{field} is required")));
    }
    check_length(field, value)
}

fn check_length(field: &str, value: &str) -> Result<()> {
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(FilekeepError::Validation(format!(
            "{field} must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Partial update of a record. Only set fields are written.
#[derive(Debug, Clone, Default)]
pub struct FileRecordUpdate {
    /// New checksum.
    pub checksum: Option<Option<String>>,
    /// New status.
    pub status: Option<RecordStatus>,
}

impl FileRecordUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checksum.
    pub fn checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(Some(checksum.into()));
        self
    }

    /// Set the status.
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.checksum.is_none() && self.status.is_none()
    }
}

/// Result ordering for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first (insertion order).
    #[default]
    Insertion,
    /// Newest first.
    Newest,
}

/// Default page size for searches.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a search will return.
pub const MAX_PER_PAGE: u32 = 100;

/// Search criteria. Text fields match as substrings; `id` and `status`
/// match exactly.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub extension: Option<String>,
    pub sub_path: Option<String>,
    pub original_filename: Option<String>,
    pub mime_type: Option<String>,
    pub checksum: Option<String>,
    pub status: Option<RecordStatus>,
    pub order: SortOrder,
    /// 1-based page number; 0 is treated as 1.
    pub page: u32,
    /// Page size; 0 means [`DEFAULT_PER_PAGE`].
    pub per_page: u32,
}

impl FileFilter {
    /// Create an empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    /// Effective 1-based page number.
    pub fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    /// Effective page size.
    pub fn effective_per_page(&self) -> u32 {
        match self.per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matches across all pages.
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` items.
    pub fn page_count(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        u32::try_from((self.total + per_page - 1) / per_page).unwrap_or(u32::MAX)
    }
}
