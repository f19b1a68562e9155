//! File storage for filekeep.
//!
//! This module provides:
//! - Name normalization and deterministic path/URL resolution
//! - Atomic writes into a directory tree under a configured root
//! - A SQLite index of stored files with checksums and status
//! - The save/load/delete lifecycle tying the two together
//!
//! A stored file lives at `<root>/<file_dir>/<sub_path>/<name>-<id>.<extension>`.
//! The id suffix comes from the index, so a row always exists before its
//! bytes are written.

mod audit;
mod checksum;
mod delivery;
mod normalize;
mod path;
mod record;
mod repository;
mod resource;
mod service;
mod storage;

pub use audit::{AuditReport, Inconsistency};
pub use checksum::{checksum_bytes, checksum_file};
pub use delivery::{content_disposition, Delivery};
pub use normalize::normalize;
pub use path::{FileRecordLike, StorageLocation};
pub use record::{
    FileFilter, FileRecord, FileRecordUpdate, NewFileRecord, Page, ParseStatusError,
    RecordStatus, SortOrder, DEFAULT_PER_PAGE, MAX_BYTE_SIZE, MAX_FIELD_LENGTH, MAX_FILENAME_BYTES,
    MAX_PER_PAGE,
};
pub use repository::FileRecordRepository;
pub use resource::{
    extract_extension, strip_extension, Resource, StagedFile, UploadedFile, DEFAULT_EXTENSION,
};
pub use service::FileService;
pub use storage::FileStorage;
