//! Resolved file content ready to hand to a delivery channel.

use std::path::PathBuf;

/// A stored file resolved to its path, bytes and MIME type.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Absolute path of the stored file.
    pub path: PathBuf,
    /// Full file contents.
    pub content: Vec<u8>,
    /// MIME type recorded at ingestion.
    pub mime_type: String,
    /// Name offered to the client when downloading.
    pub download_name: String,
}

impl Delivery {
    /// Length of the content in bytes.
    pub fn content_length(&self) -> usize {
        self.content.len()
    }

    /// A `Content-Disposition` value offering the file as an attachment.
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.download_name)
    }
}

/// Build a safe `Content-Disposition` header value.
///
/// Control characters are dropped (no header injection), quotes and
/// backslashes are replaced in the plain `filename` parameter, and
/// non-ASCII names get an RFC 5987 `filename*` parameter.
pub fn content_disposition(filename: &str) -> String {
    let plain = filename.is_ascii()
        && !filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');
    if plain {
        return format!("attachment; filename=\"{filename}\"");
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!("attachment; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}
