use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::api_keys::models::ApiKey;

/// Persistence for registered API keys
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn create(&self, name: &str, key_value: &str) -> Result<ApiKey>;

    async fn list(&self) -> Result<Vec<ApiKey>>;

    async fn find_active_by_value(&self, key_value: &str) -> Result<Option<ApiKey>>;

    /// Deactivate a key; returns None when the id is unknown
    async fn revoke(&self, id: Uuid) -> Result<Option<ApiKey>>;

    /// Bump usage statistics after a successful match
    async fn record_usage(&self, id: Uuid, used_by: &str) -> Result<()>;
}

pub struct PgApiKeyRepository {
    pool: PgPool,
}

impl PgApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const API_KEY_COLUMNS: &str = "id, name, key_value, is_active, last_used_at, last_used_by, \
    usage_count, created_at, revoked_at";

#[async_trait]
impl ApiKeyRepository for PgApiKeyRepository {
    async fn create(&self, name: &str, key_value: &str) -> Result<ApiKey> {
        let sql = format!(
            "INSERT INTO storage_api_keys (name, key_value) VALUES ($1, $2) RETURNING {}",
            API_KEY_COLUMNS
        );
        sqlx::query_as::<_, ApiKey>(&sql)
            .bind(name)
            .bind(key_value)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::from_unique_violation(e, "API key value already exists"))
    }

    async fn list(&self) -> Result<Vec<ApiKey>> {
        let sql = format!(
            "SELECT {} FROM storage_api_keys ORDER BY created_at DESC",
            API_KEY_COLUMNS
        );
        sqlx::query_as::<_, ApiKey>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list API keys: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_active_by_value(&self, key_value: &str) -> Result<Option<ApiKey>> {
        let sql = format!(
            "SELECT {} FROM storage_api_keys WHERE key_value = $1 AND is_active = TRUE",
            API_KEY_COLUMNS
        );
        sqlx::query_as::<_, ApiKey>(&sql)
            .bind(key_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn revoke(&self, id: Uuid) -> Result<Option<ApiKey>> {
        let sql = format!(
            r#"
            UPDATE storage_api_keys
            SET is_active = FALSE, revoked_at = COALESCE(revoked_at, NOW())
            WHERE id = $1
            RETURNING {}
            "#,
            API_KEY_COLUMNS
        );
        sqlx::query_as::<_, ApiKey>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to revoke API key: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn record_usage(&self, id: Uuid, used_by: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE storage_api_keys
            SET last_used_at = NOW(), last_used_by = $2, usage_count = usage_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(used_by)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }
}
