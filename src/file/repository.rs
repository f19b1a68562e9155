//! Record store: the durable metadata index over the `file` table.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::record::{FileFilter, FileRecord, FileRecordUpdate, NewFileRecord, Page, SortOrder};
use crate::{FilekeepError, Result};

const SELECT_COLUMNS: &str =
    "SELECT id, name, extension, path, filename, mime_type, byte_size, created_at, hash, status FROM file";

/// Repository for file record operations.
pub struct FileRecordRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRecordRepository<'a> {
    /// Create a new FileRecordRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record in the `pending` state.
    ///
    /// The record is validated first; nothing is written if validation
    /// fails. Returns the stored record with its assigned id.
    pub async fn create(&self, record: &NewFileRecord) -> Result<FileRecord> {
        record.validate()?;

        let result = sqlx::query(
            "INSERT INTO file (name, extension, path, filename, mime_type, byte_size, created_at, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'pending')",
        )
        .bind(&record.name)
        .bind(&record.extension)
        .bind(&record.sub_path)
        .bind(&record.original_filename)
        .bind(&record.mime_type)
        .bind(record.byte_size)
        .bind(record.created_at)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or(FilekeepError::RecordNotFound(id))
    }

    /// Get a record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    /// Update only the fields set in `update`.
    ///
    /// Returns the updated record, or None if not found.
    pub async fn update(&self, id: i64, update: &FileRecordUpdate) -> Result<Option<FileRecord>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE file SET ");
        let mut separated = query.separated(", ");

        if let Some(ref checksum) = update.checksum {
            separated.push("hash = ");
            separated.push_bind_unseparated(checksum.clone());
        }
        if let Some(status) = update.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status.as_str());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a record by ID.
    ///
    /// Returns true if a record was deleted, false if not found.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM file WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Search records, returning one page of matches.
    pub async fn search(&self, filter: &FileFilter) -> Result<Page<FileRecord>> {
        let page = filter.effective_page();
        let per_page = filter.effective_per_page();

        let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM file");
        push_conditions(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        push_conditions(&mut query, filter);
        query.push(match filter.order {
            SortOrder::Insertion => " ORDER BY id ASC",
            SortOrder::Newest => " ORDER BY id DESC",
        });
        query.push(" LIMIT ");
        query.push_bind(i64::from(per_page));
        query.push(" OFFSET ");
        query.push_bind(i64::from(page - 1) * i64::from(per_page));

        let items = query
            .build_query_as::<FileRecord>()
            .fetch_all(self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// List every record in insertion order.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .fetch_all(self.pool)
            .await?;
        Ok(records)
    }

    /// Count all records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

fn push_conditions(query: &mut QueryBuilder<'_, Sqlite>, filter: &FileFilter) {
    query.push(" WHERE 1 = 1");

    if let Some(id) = filter.id {
        query.push(" AND id = ");
        query.push_bind(id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }

    let text_filters = [
        ("name", &filter.name),
        ("extension", &filter.extension),
        ("path", &filter.sub_path),
        ("filename", &filter.original_filename),
        ("mime_type", &filter.mime_type),
        ("hash", &filter.checksum),
    ];
    for (column, value) in text_filters {
        if let Some(value) = value {
            query.push(format!(" AND {column} LIKE "));
            query.push_bind(like_pattern(value));
            query.push(" ESCAPE '\\'");
        }
    }
}

/// Build a substring LIKE pattern, escaping LIKE wildcards in `value`.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::file::RecordStatus;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn new_record(name: &str, extension: &str) -> NewFileRecord {
        NewFileRecord::new(
            name,
            extension,
            format!("{name}.{extension}"),
            "application/octet-stream",
            100,
        )
    }

    #[tokio::test]
    async fn test_create_record() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let record = repo
            .create(&new_record("report", "PDF").with_sub_path("/docs/"))
            .await
            .unwrap();

        assert!(record.id > 0);
        assert_eq!(record.name, "report");
        assert_eq!(record.extension, "pdf");
        assert_eq!(record.sub_path.as_deref(), Some("docs"));
        assert_eq!(record.original_filename, "report.PDF");
        assert_eq!(record.byte_size, 100);
        assert_eq!(record.checksum, None);
        assert_eq!(record.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_record() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let result = repo.create(&new_record("", "txt")).await;

        assert!(matches!(result, Err(FilekeepError::Validation(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_created_at_round_trips() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let new = new_record("a", "txt");

        let record = repo.create(&new).await.unwrap();

        assert_eq!(record.created_at.timestamp(), new.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let first = repo.create(&new_record("a", "txt")).await.unwrap();
        let second = repo.create(&new_record("b", "txt")).await.unwrap();
        assert!(repo.delete(second.id).await.unwrap());

        let third = repo.create(&new_record("c", "txt")).await.unwrap();

        assert!(third.id > second.id);
        assert_ne!(third.id, first.id);
    }

    #[tokio::test]
    async fn test_update_checksum_only() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let record = repo.create(&new_record("a", "txt")).await.unwrap();

        let updated = repo
            .update(
                record.id,
                &FileRecordUpdate::new()
                    .checksum("deadbeef")
                    .status(RecordStatus::Verified),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.checksum.as_deref(), Some("deadbeef"));
        assert_eq!(updated.status, RecordStatus::Verified);
        assert_eq!(updated.name, record.name);
        assert_eq!(updated.created_at, record.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let result = repo
            .update(42, &FileRecordUpdate::new().status(RecordStatus::Written))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_empty_update_returns_current() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let record = repo.create(&new_record("a", "txt")).await.unwrap();

        let same = repo
            .update(record.id, &FileRecordUpdate::new())
            .await
            .unwrap();
        assert_eq!(same, Some(record));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let record = repo.create(&new_record("a", "txt")).await.unwrap();

        assert!(repo.delete(record.id).await.unwrap());
        assert!(repo.get_by_id(record.id).await.unwrap().is_none());
        assert!(!repo.delete(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_substring_and_exact() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        repo.create(&new_record("holiday-photo", "jpg")).await.unwrap();
        repo.create(&new_record("photo", "png")).await.unwrap();
        let report = repo.create(&new_record("report", "pdf")).await.unwrap();

        let photos = repo.search(&FileFilter::new().name("photo")).await.unwrap();
        assert_eq!(photos.total, 2);
        assert_eq!(photos.items.len(), 2);

        let pngs = repo
            .search(&FileFilter::new().name("photo").extension("png"))
            .await
            .unwrap();
        assert_eq!(pngs.total, 1);
        assert_eq!(pngs.items[0].name, "photo");

        let by_id = repo
            .search(&FileFilter {
                id: Some(report.id),
                ..FileFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_id.items, vec![report]);
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        repo.create(&new_record("100%_done", "txt")).await.unwrap();
        repo.create(&new_record("100x-done", "txt")).await.unwrap();

        let result = repo.search(&FileFilter::new().name("%_")).await.unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].name, "100%_done");
    }

    #[tokio::test]
    async fn test_search_order_and_paging() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        for i in 0..5 {
            repo.create(&new_record(&format!("file{i}"), "txt"))
                .await
                .unwrap();
        }

        let first = repo.search(&FileFilter::new().page(1, 2)).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.page_count(), 3);
        let names: Vec<_> = first.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["file0", "file1"]);

        let last = repo.search(&FileFilter::new().page(3, 2)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].name, "file4");

        let newest = repo
            .search(&FileFilter::new().order(SortOrder::Newest).page(1, 1))
            .await
            .unwrap();
        assert_eq!(newest.items[0].name, "file4");
    }

    #[tokio::test]
    async fn test_search_by_status() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let a = repo.create(&new_record("a", "txt")).await.unwrap();
        repo.create(&new_record("b", "txt")).await.unwrap();
        repo.update(a.id, &FileRecordUpdate::new().status(RecordStatus::Written))
            .await
            .unwrap();

        let pending = repo
            .search(&FileFilter::new().status(RecordStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.items[0].name, "b");
    }

    #[tokio::test]
    async fn test_list_all_and_count() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        repo.create(&new_record("a", "txt")).await.unwrap();
        repo.create(&new_record("b", "txt")).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "a");
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
