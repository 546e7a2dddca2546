use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::folders::models::{Folder, NewFolder, SubtreeMove};

#[async_trait]
pub trait FolderRepository: Send + Sync {
    async fn create(&self, folder: NewFolder) -> Result<Folder>;

    async fn get(&self, id: Uuid) -> Result<Option<Folder>>;

    /// Active folder at `path` within a category
    async fn find_by_path(&self, category_id: Uuid, path: &str) -> Result<Option<Folder>>;

    /// Active direct children; `None` lists the category root
    async fn list_children(&self, category_id: Uuid, parent_id: Option<Uuid>)
        -> Result<Vec<Folder>>;

    /// Active folders at or below `path`
    async fn list_subtree(&self, category_id: Uuid, path: &str) -> Result<Vec<Folder>>;

    /// Rewrite a folder, its descendants and their files in one transaction
    async fn relocate_subtree(&self, change: SubtreeMove) -> Result<Folder>;

    /// Deactivate a folder and all its descendants; returns the number changed
    async fn deactivate_subtree(&self, category_id: Uuid, path: &str) -> Result<u64>;
}

pub struct PgFolderRepository {
    pool: PgPool,
}

impl PgFolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FOLDER_COLUMNS: &str =
    "id, category_id, name, path, parent_id, is_active, created_at, updated_at";

/// SQL predicate: `path` is `$2` or lies below it
const IN_SUBTREE: &str = "(path = $2 OR left(path, length($2) + 1) = $2 || '/')";

#[async_trait]
impl FolderRepository for PgFolderRepository {
    async fn create(&self, folder: NewFolder) -> Result<Folder> {
        let sql = format!(
            r#"
            INSERT INTO storage_folders (category_id, name, path, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            FOLDER_COLUMNS
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(folder.category_id)
            .bind(&folder.name)
            .bind(&folder.path)
            .bind(folder.parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(
                    e,
                    format!("Folder '{}' already exists", folder.path),
                )
            })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Folder>> {
        let sql = format!("SELECT {} FROM storage_folders WHERE id = $1", FOLDER_COLUMNS);
        sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_path(&self, category_id: Uuid, path: &str) -> Result<Option<Folder>> {
        let sql = format!(
            "SELECT {} FROM storage_folders WHERE category_id = $1 AND path = $2 AND is_active",
            FOLDER_COLUMNS
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(category_id)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_children(
        &self,
        category_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Folder>> {
        let sql = format!(
            r#"
            SELECT {} FROM storage_folders
            WHERE category_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND is_active
            ORDER BY name
            "#,
            FOLDER_COLUMNS
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(category_id)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list child folders: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn list_subtree(&self, category_id: Uuid, path: &str) -> Result<Vec<Folder>> {
        let sql = format!(
            "SELECT {} FROM storage_folders WHERE category_id = $1 AND is_active AND {} ORDER BY path",
            FOLDER_COLUMNS, IN_SUBTREE
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(category_id)
            .bind(path)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn relocate_subtree(&self, change: SubtreeMove) -> Result<Folder> {
        let conflict = || format!("Folder '{}' already exists", change.new_path);
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE storage_folders
            SET name = $2, parent_id = $3, path = $4, updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING {}
            "#,
            FOLDER_COLUMNS
        );
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(change.folder_id)
            .bind(&change.new_name)
            .bind(change.new_parent_id)
            .bind(&change.new_path)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::from_unique_violation(e, conflict()))?
            .ok_or_else(|| AppError::NotFound(format!("Folder {} not found", change.folder_id)))?;

        sqlx::query(
            r#"
            UPDATE storage_folders
            SET path = $3 || substr(path, length($2) + 1), updated_at = NOW()
            WHERE category_id = $1 AND is_active AND left(path, length($2) + 1) = $2 || '/'
            "#,
        )
        .bind(change.category_id)
        .bind(&change.old_path)
        .bind(&change.new_path)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, conflict()))?;

        sqlx::query(
            r#"
            UPDATE storage_files
            SET stored_path = $2 || substr(stored_path, length($1) + 1),
                url = $3 || '/' || $2 || substr(stored_path, length($1) + 1)
            WHERE NOT is_deleted AND left(stored_path, length($1) + 1) = $1 || '/'
            "#,
        )
        .bind(&change.old_stored_prefix)
        .bind(&change.new_stored_prefix)
        .bind(change.base_url.trim_end_matches('/'))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, conflict()))?;

        tx.commit().await?;
        Ok(folder)
    }

    async fn deactivate_subtree(&self, category_id: Uuid, path: &str) -> Result<u64> {
        let sql = format!(
            "UPDATE storage_folders SET is_active = FALSE, updated_at = NOW() \
             WHERE category_id = $1 AND is_active AND {}",
            IN_SUBTREE
        );
        let result = sqlx::query(&sql)
            .bind(category_id)
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::NewFileRecord;
    use crate::features::files::repository::{FileRepository, PgFileRepository};
    use crate::shared::test_helpers::{pg_category, test_pool};

    async fn folder(repo: &PgFolderRepository, category_id: Uuid, path: &str, parent: Option<Uuid>) -> Folder {
        repo.create(NewFolder {
            category_id,
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            parent_id: parent,
        })
        .await
        .unwrap()
    }

    fn subtree_move(folder: &Folder, category: &str, new_path: &str) -> SubtreeMove {
        SubtreeMove {
            folder_id: folder.id,
            category_id: folder.category_id,
            new_name: new_path.to_string(),
            new_parent_id: None,
            old_path: folder.path.clone(),
            new_path: new_path.to_string(),
            old_stored_prefix: format!("{}/{}", category, folder.path),
            new_stored_prefix: format!("{}/{}", category, new_path),
            base_url: "http://files.test/".to_string(),
        }
    }

    #[tokio::test]
    #[ignore = "requires Postgres (TEST_DATABASE_URL)"]
    async fn test_pg_relocate_subtree_rewrites_paths_and_urls() {
        let pool = test_pool().await;
        let category = pg_category(&pool).await;
        let folders = PgFolderRepository::new(pool.clone());
        let files = PgFileRepository::new(pool);

        let leases = folder(&folders, category.id, "leases", None).await;
        let year = folder(&folders, category.id, "leases/2024", Some(leases.id)).await;
        // Shares the prefix but is not inside the subtree
        let sibling = folder(&folders, category.id, "leases-old", None).await;

        let stored_path = format!("{}/leases/2024/a.pdf", category.name);
        let file = files
            .insert(NewFileRecord {
                id: Uuid::new_v4(),
                stored_path: stored_path.clone(),
                file_name: "a.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                file_size: 1,
                category_id: category.id,
                folder_id: Some(year.id),
                checksum: "abc".to_string(),
                uploaded_by: "tester".to_string(),
                url: format!("http://files.test/{}", stored_path),
                related_entity: None,
            })
            .await
            .unwrap();

        let moved = folders
            .relocate_subtree(subtree_move(&leases, &category.name, "contracts"))
            .await
            .unwrap();
        assert_eq!(moved.path, "contracts");
        assert_eq!(moved.name, "contracts");

        assert_eq!(folders.get(year.id).await.unwrap().unwrap().path, "contracts/2024");
        assert_eq!(folders.get(sibling.id).await.unwrap().unwrap().path, "leases-old");

        let file = files.get(file.id).await.unwrap().unwrap();
        assert_eq!(file.stored_path, format!("{}/contracts/2024/a.pdf", category.name));
        assert_eq!(
            file.url,
            format!("http://files.test/{}/contracts/2024/a.pdf", category.name)
        );
    }

    #[tokio::test]
    #[ignore = "requires Postgres (TEST_DATABASE_URL)"]
    async fn test_pg_relocate_subtree_conflict_changes_nothing() {
        let pool = test_pool().await;
        let category = pg_category(&pool).await;
        let folders = PgFolderRepository::new(pool);

        let a = folder(&folders, category.id, "a", None).await;
        let child = folder(&folders, category.id, "a/child", Some(a.id)).await;
        folder(&folders, category.id, "b", None).await;

        let err = folders
            .relocate_subtree(subtree_move(&a, &category.name, "b"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(folders.get(a.id).await.unwrap().unwrap().path, "a");
        assert_eq!(folders.get(child.id).await.unwrap().unwrap().path, "a/child");
    }
}
