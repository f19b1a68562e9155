//! Consistency audit between the record index and the storage tree.
//!
//! The audit only reports. Reconciling what it finds is left to an
//! operator or an external repair job.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use super::record::RecordStatus;

/// One mismatch between a row and the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// A row whose file is not on disk.
    MissingFile { id: i64, path: PathBuf },
    /// A row whose file exists but was never stamped.
    Unverified { id: i64, status: RecordStatus },
    /// A row whose stored checksum no longer matches the bytes.
    ChecksumMismatch { id: i64, path: PathBuf },
    /// A file no row points at.
    OrphanFile { path: PathBuf },
    /// Something at `path` could not be read or walked. `id` is set when
    /// the path belongs to a record.
    Unreadable {
        id: Option<i64>,
        path: PathBuf,
        reason: String,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::MissingFile { id, path } => {
                write!(f, "record {id}: file missing at {}", path.display())
            }
            Inconsistency::Unverified { id, status } => {
                write!(f, "record {id}: not verified (status {status})")
            }
            Inconsistency::ChecksumMismatch { id, path } => {
                write!(f, "record {id}: checksum mismatch for {}", path.display())
            }
            Inconsistency::OrphanFile { path } => {
                write!(f, "orphan file {}", path.display())
            }
            Inconsistency::Unreadable {
                id: Some(id),
                path,
                reason,
            } => write!(f, "record {id}: cannot read {}: {reason}", path.display()),
            Inconsistency::Unreadable {
                id: None,
                path,
                reason,
            } => write!(f, "cannot read {}: {reason}", path.display()),
        }
    }
}

/// Outcome of an audit run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// Rows examined.
    pub records_checked: usize,
    /// Files found in the storage tree.
    pub files_checked: usize,
    pub issues: Vec<Inconsistency>,
}

impl AuditReport {
    /// True when rows and files agree completely.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Walk `base` and report every regular file not in `expected`.
///
/// Returns the number of files seen and the orphans among them. Entries
/// that cannot be walked are reported as [`Inconsistency::Unreadable`] and
/// skipped. A missing `base` holds no files.
pub(crate) fn find_orphans(base: &Path, expected: &HashSet<PathBuf>) -> (usize, Vec<Inconsistency>) {
    if !base.is_dir() {
        return (0, Vec::new());
    }

    let mut seen = 0;
    let mut orphans = Vec::new();
    let mut unreadable = Vec::new();

    for entry in WalkDir::new(base).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(base).to_path_buf();
                warn!(path = %path.display(), error = %e, "cannot walk storage entry");
                unreadable.push(Inconsistency::Unreadable {
                    id: None,
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        seen += 1;
        if !expected.contains(entry.path()) {
            orphans.push(entry.into_path());
        }
    }

    orphans.sort();
    let mut issues: Vec<Inconsistency> = orphans
        .into_iter()
        .map(|path| Inconsistency::OrphanFile { path })
        .collect();
    issues.extend(unreadable);

    (seen, issues)
}
