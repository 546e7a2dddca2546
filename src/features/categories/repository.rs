use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryChanges, NewCategory};

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: NewCategory) -> Result<Category>;

    async fn get(&self, id: Uuid) -> Result<Option<Category>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    async fn list(&self) -> Result<Vec<Category>>;

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Folders and files (active or not) pointing at the category
    async fn count_references(&self, id: Uuid) -> Result<i64>;
}

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CATEGORY_COLUMNS: &str =
    "id, name, display_name, description, allowed_file_types, is_active, created_at, updated_at";

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, category: NewCategory) -> Result<Category> {
        let sql = format!(
            r#"
            INSERT INTO storage_categories (name, display_name, description, allowed_file_types)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(&category.name)
            .bind(&category.display_name)
            .bind(&category.description)
            .bind(&category.allowed_file_types)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(
                    e,
                    format!("Category '{}' already exists", category.name),
                )
            })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM storage_categories WHERE id = $1", CATEGORY_COLUMNS);
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM storage_categories WHERE name = $1",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM storage_categories ORDER BY name",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>> {
        let sql = format!(
            r#"
            UPDATE storage_categories
            SET name = $2, display_name = $3, description = $4,
                allowed_file_types = $5, is_active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.display_name)
            .bind(&changes.description)
            .bind(&changes.allowed_file_types)
            .bind(changes.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(
                    e,
                    format!("Category '{}' already exists", changes.name),
                )
            })
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM storage_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_references(&self, id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM storage_folders WHERE category_id = $1)
                 + (SELECT COUNT(*) FROM storage_files WHERE category_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(count)
    }
}
