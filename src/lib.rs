//! filekeep - file storage with a SQLite index
//!
//! Stores uploaded files under a configured directory tree and keeps a
//! record of each one (name, extension, sub path, MIME type, size and
//! checksum) in SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;

pub use config::Config;
pub use db::Database;
pub use error::{FilekeepError, Result};
pub use file::{
    AuditReport, Delivery, FileFilter, FileRecord, FileRecordLike, FileService, FileStorage,
    Inconsistency, Page, RecordStatus, Resource, StagedFile, UploadedFile,
};
