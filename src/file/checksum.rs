//! Content checksums for stored files.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{FilekeepError, Result};

/// Compute the SHA-256 checksum of a file as lowercase hex.
///
/// The file is streamed through the hasher in a single pass.
pub fn checksum_file(path: &Path) -> Result<String> {
    let read_failed = |source| FilekeepError::FileReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_failed)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(read_failed)?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute the SHA-256 checksum of in-memory bytes as lowercase hex.
pub fn checksum_bytes(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_checksum_bytes_known_value() {
        assert_eq!(checksum_bytes(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_checksum_file_matches_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(checksum_file(&path).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn test_checksum_large_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.bin");
        let content = vec![0x5Au8; 3 * 1024 * 1024 + 17];
        std::fs::write(&path, &content).unwrap();

        assert_eq!(checksum_file(&path).unwrap(), checksum_bytes(&content));
    }

    #[test]
    fn test_checksum_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = checksum_file(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(FilekeepError::FileReadFailed { .. })));
    }
}
