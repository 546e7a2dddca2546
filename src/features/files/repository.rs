use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{BackupBlob, FileFilter, FileRecord, NewFileRecord};

/// Catalog and backup-blob persistence
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a new record; `Conflict` when the path is taken by an active file
    async fn insert(&self, file: NewFileRecord) -> Result<FileRecord>;

    /// Remove a record whose bytes never made it to the primary backend
    async fn hard_delete(&self, id: Uuid) -> Result<()>;

    /// Lookup by id, including soft-deleted records
    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>>;

    async fn find_by_path(&self, stored_path: &str) -> Result<Option<FileRecord>>;

    async fn find_by_url(&self, url: &str) -> Result<Option<FileRecord>>;

    /// Active records matching the filter, newest first, with the total count
    async fn list(
        &self,
        filter: &FileFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileRecord>, i64)>;

    /// Active files directly inside a folder (`None` = category root)
    async fn list_in_folder(&self, category_id: Uuid, folder_id: Option<Uuid>)
        -> Result<Vec<FileRecord>>;

    async fn sum_sizes_in_folder(&self, category_id: Uuid, folder_id: Option<Uuid>)
        -> Result<i64>;

    /// Returns false when the record was already deleted
    async fn soft_delete(&self, id: Uuid) -> Result<bool>;

    /// Point an active record at a new name/folder/path
    async fn relocate(
        &self,
        id: Uuid,
        file_name: &str,
        folder_id: Option<Uuid>,
        stored_path: &str,
        url: &str,
    ) -> Result<Option<FileRecord>>;

    async fn record_access(&self, id: Uuid) -> Result<()>;

    /// Store (or replace) the backup blob and set `has_backup`
    async fn save_backup(&self, file_id: Uuid, content_base64: &str, mime_type: &str)
        -> Result<FileRecord>;

    async fn get_backup(&self, file_id: Uuid) -> Result<Option<BackupBlob>>;

    /// Drop the backup blob and clear `has_backup`; returns whether one existed
    async fn delete_backup(&self, file_id: Uuid) -> Result<bool>;
}

pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILE_COLUMNS: &str = "id, stored_path, file_name, content_type, file_size, category_id, \
    folder_id, checksum, uploaded_at, uploaded_by, last_accessed_at, access_count, is_deleted, \
    deleted_at, has_backup, url, related_entity_kind, related_entity_id";

const FILE_FILTER: &str = r#"
    NOT is_deleted
    AND ($1::uuid IS NULL OR category_id = $1)
    AND (NOT $2 OR folder_id IS NOT DISTINCT FROM $3)
    AND ($4::text IS NULL OR related_entity_kind = $4)
    AND ($5::uuid IS NULL OR related_entity_id = $5)
"#;

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn insert(&self, file: NewFileRecord) -> Result<FileRecord> {
        let sql = format!(
            r#"
            INSERT INTO storage_files (
                id, stored_path, file_name, content_type, file_size, category_id, folder_id,
                checksum, uploaded_by, url, related_entity_kind, related_entity_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            FILE_COLUMNS
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(file.id)
            .bind(&file.stored_path)
            .bind(&file.file_name)
            .bind(&file.content_type)
            .bind(file.file_size)
            .bind(file.category_id)
            .bind(file.folder_id)
            .bind(&file.checksum)
            .bind(&file.uploaded_by)
            .bind(&file.url)
            .bind(file.related_entity.map(|r| r.kind.as_str()))
            .bind(file.related_entity.map(|r| r.id))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(
                    e,
                    format!("A file already exists at '{}'", file.stored_path),
                )
            })
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM storage_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {} FROM storage_files WHERE id = $1", FILE_COLUMNS);
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_path(&self, stored_path: &str) -> Result<Option<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM storage_files WHERE stored_path = $1 AND NOT is_deleted",
            FILE_COLUMNS
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(stored_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM storage_files WHERE url = $1 AND NOT is_deleted",
            FILE_COLUMNS
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(
        &self,
        filter: &FileFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileRecord>, i64)> {
        let kind = filter.related_entity.map(|r| r.kind.as_str());
        let related_id = filter.related_entity.map(|r| r.id);
        let folder_id = filter.folder_id.flatten();

        let sql = format!(
            "SELECT {} FROM storage_files WHERE {} ORDER BY uploaded_at DESC LIMIT $6 OFFSET $7",
            FILE_COLUMNS, FILE_FILTER
        );
        let files = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(filter.category_id)
            .bind(filter.folder_id.is_some())
            .bind(folder_id)
            .bind(kind)
            .bind(related_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list files: {:?}", e);
                AppError::Database(e)
            })?;

        let count_sql = format!("SELECT COUNT(*) FROM storage_files WHERE {}", FILE_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.category_id)
            .bind(filter.folder_id.is_some())
            .bind(folder_id)
            .bind(kind)
            .bind(related_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok((files, total))
    }

    async fn list_in_folder(
        &self,
        category_id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Vec<FileRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM storage_files
            WHERE category_id = $1 AND folder_id IS NOT DISTINCT FROM $2 AND NOT is_deleted
            ORDER BY file_name
            "#,
            FILE_COLUMNS
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(category_id)
            .bind(folder_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn sum_sizes_in_folder(&self, category_id: Uuid, folder_id: Option<Uuid>) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM storage_files
            WHERE category_id = $1 AND folder_id IS NOT DISTINCT FROM $2 AND NOT is_deleted
            "#,
        )
        .bind(category_id)
        .bind(folder_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(total)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE storage_files SET is_deleted = TRUE, deleted_at = NOW() \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn relocate(
        &self,
        id: Uuid,
        file_name: &str,
        folder_id: Option<Uuid>,
        stored_path: &str,
        url: &str,
    ) -> Result<Option<FileRecord>> {
        let sql = format!(
            r#"
            UPDATE storage_files
            SET file_name = $2, folder_id = $3, stored_path = $4, url = $5
            WHERE id = $1 AND NOT is_deleted
            RETURNING {}
            "#,
            FILE_COLUMNS
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .bind(file_name)
            .bind(folder_id)
            .bind(stored_path)
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(
                    e,
                    format!("A file already exists at '{}'", stored_path),
                )
            })
    }

    async fn record_access(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE storage_files SET access_count = access_count + 1, last_accessed_at = NOW() \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    async fn save_backup(
        &self,
        file_id: Uuid,
        content_base64: &str,
        mime_type: &str,
    ) -> Result<FileRecord> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE storage_files SET has_backup = TRUE WHERE id = $1 AND NOT is_deleted RETURNING {}",
            FILE_COLUMNS
        );
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(file_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;

        sqlx::query(
            r#"
            INSERT INTO storage_file_backups (file_id, content_base64, mime_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (file_id) DO UPDATE
            SET content_base64 = EXCLUDED.content_base64,
                mime_type = EXCLUDED.mime_type,
                created_at = NOW()
            "#,
        )
        .bind(file_id)
        .bind(content_base64)
        .bind(mime_type)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn get_backup(&self, file_id: Uuid) -> Result<Option<BackupBlob>> {
        sqlx::query_as::<_, BackupBlob>(
            "SELECT file_id, content_base64, mime_type, created_at \
             FROM storage_file_backups WHERE file_id = $1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn delete_backup(&self, file_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM storage_file_backups WHERE file_id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE storage_files SET has_backup = FALSE WHERE id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{pg_category, test_pool};

    fn new_record(category_id: Uuid, stored_path: &str) -> NewFileRecord {
        NewFileRecord {
            id: Uuid::new_v4(),
            stored_path: stored_path.to_string(),
            file_name: stored_path.rsplit('/').next().unwrap_or(stored_path).to_string(),
            content_type: "text/plain".to_string(),
            file_size: 4,
            category_id,
            folder_id: None,
            checksum: "abc".to_string(),
            uploaded_by: "tester".to_string(),
            url: format!("http://files.test/{}", stored_path),
            related_entity: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires Postgres (TEST_DATABASE_URL)"]
    async fn test_pg_path_uniqueness_covers_active_files_only() {
        let pool = test_pool().await;
        let category = pg_category(&pool).await;
        let repo = PgFileRepository::new(pool);
        let path = format!("{}/a.txt", category.name);

        let first = repo.insert(new_record(category.id, &path)).await.unwrap();
        assert_eq!(repo.find_by_path(&path).await.unwrap().unwrap().id, first.id);

        let err = repo.insert(new_record(category.id, &path)).await.unwrap_err();
        assert!(err.is_conflict());

        // Soft-deleted rows release the path
        assert!(repo.soft_delete(first.id).await.unwrap());
        assert!(!repo.soft_delete(first.id).await.unwrap());
        let second = repo.insert(new_record(category.id, &path)).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    #[ignore = "requires Postgres (TEST_DATABASE_URL)"]
    async fn test_pg_relocate_into_taken_path_conflicts() {
        let pool = test_pool().await;
        let category = pg_category(&pool).await;
        let repo = PgFileRepository::new(pool);
        let a = format!("{}/a.txt", category.name);
        let b = format!("{}/b.txt", category.name);

        let first = repo.insert(new_record(category.id, &a)).await.unwrap();
        repo.insert(new_record(category.id, &b)).await.unwrap();

        let err = repo
            .relocate(first.id, "b.txt", None, &b, "http://files.test/b")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.get(first.id).await.unwrap().unwrap().stored_path, a);
    }

    #[tokio::test]
    #[ignore = "requires Postgres (TEST_DATABASE_URL)"]
    async fn test_pg_backup_save_and_delete_track_flag() {
        let pool = test_pool().await;
        let category = pg_category(&pool).await;
        let repo = PgFileRepository::new(pool);
        let record = repo
            .insert(new_record(category.id, &format!("{}/c.txt", category.name)))
            .await
            .unwrap();

        let updated = repo
            .save_backup(record.id, &BackupBlob::encode(b"data"), "text/plain")
            .await
            .unwrap();
        assert!(updated.has_backup);
        let blob = repo.get_backup(record.id).await.unwrap().unwrap();
        assert_eq!(blob.decode().unwrap(), b"data".to_vec());

        assert!(repo.delete_backup(record.id).await.unwrap());
        assert!(!repo.get(record.id).await.unwrap().unwrap().has_backup);
        assert!(repo.get_backup(record.id).await.unwrap().is_none());

        // The blob goes with a removed row
        repo.save_backup(record.id, &BackupBlob::encode(b"data"), "text/plain")
            .await
            .unwrap();
        repo.hard_delete(record.id).await.unwrap();
        assert!(repo.get_backup(record.id).await.unwrap().is_none());
    }
}
