//! Database schema and migrations for filekeep.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version
/// table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: File metadata index
    r#"
-- One row per stored file. AUTOINCREMENT keeps ids from being reused after delete.
CREATE TABLE file (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    extension   TEXT NOT NULL,
    path        TEXT,                    -- optional sub path, no leading/trailing slash
    filename    TEXT NOT NULL,           -- original filename at ingestion
    mime_type   TEXT NOT NULL,
    byte_size   INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    hash        TEXT                     -- checksum, NULL until stamped
);

CREATE INDEX idx_file_name ON file(name);
CREATE INDEX idx_file_path ON file(path);
"#,
    // v2: Write lifecycle state
    r#"
ALTER TABLE file ADD COLUMN status TEXT NOT NULL DEFAULT 'pending';  -- 'pending', 'written', 'verified'

CREATE INDEX idx_file_status ON file(status);
"#,
];
