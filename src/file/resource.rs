//! Resources: binary payloads waiting to be stored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{FilekeepError, Result};

/// Extension used when the original name has none.
pub const DEFAULT_EXTENSION: &str = "bin";

/// A binary payload with the metadata captured at ingestion.
pub trait Resource {
    /// Filename as supplied by the uploader.
    fn original_name(&self) -> &str;

    /// MIME type of the payload.
    fn mime_type(&self) -> &str;

    /// Payload size in bytes.
    fn size(&self) -> u64;

    /// Write the payload to `path`, replacing anything there.
    fn save_as(&self, path: &Path) -> io::Result<()>;

    /// Extension of the original name, as supplied (not lower-cased).
    fn extension(&self) -> &str {
        extract_extension(self.original_name())
    }
}

/// Extract the extension from a filename, defaulting to [`DEFAULT_EXTENSION`].
pub fn extract_extension(filename: &str) -> &str {
    Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Base name of a filename: everything before the last `.`.
///
/// A name without a dot is returned whole.
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) => &filename[..pos],
        None => filename,
    }
}

fn guess_mime(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// An uploaded payload held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    original_name: String,
    mime_type: String,
    content: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload; the MIME type is guessed from the name.
    pub fn new(original_name: impl Into<String>, content: Vec<u8>) -> Self {
        let original_name = original_name.into();
        let mime_type = guess_mime(&original_name);
        Self {
            original_name,
            mime_type,
            content,
        }
    }

    /// Set an explicit MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// The payload bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Resource for UploadedFile {
    fn original_name(&self) -> &str {
        &self.original_name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn size(&self) -> u64 {
        self.content.len() as u64
    }

    fn save_as(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.content)
    }
}

/// A payload already on disk, such as a temporary upload.
#[derive(Debug, Clone)]
pub struct StagedFile {
    source: PathBuf,
    original_name: String,
    mime_type: String,
    size: u64,
}

impl StagedFile {
    /// Stage an existing file.
    ///
    /// The original name defaults to the file's own name and the size is
    /// read from its metadata.
    pub fn open(source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let metadata = fs::metadata(&source).map_err(|e| FilekeepError::FileReadFailed {
            path: source.clone(),
            source: e,
        })?;
        if !metadata.is_file() {
            return Err(FilekeepError::Validation(format!(
                "{} is not a regular file",
                source.display()
            )));
        }

        let original_name = source
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let mime_type = guess_mime(&original_name);

        Ok(Self {
            source,
            original_name,
            mime_type,
            size: metadata.len(),
        })
    }

    /// Override the original name (and re-guess the MIME type).
    pub fn with_original_name(mut self, original_name: impl Into<String>) -> Self {
        self.original_name = original_name.into();
        self.mime_type = guess_mime(&self.original_name);
        self
    }

    /// Set an explicit MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Path of the staged file.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Resource for StagedFile {
    fn original_name(&self) -> &str {
        &self.original_name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn save_as(&self, path: &Path) -> io::Result<()> {
        fs::copy(&self.source, path).map(|_| ())
    }
}
