use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::settings::models::{
    NewStorageSettings, StorageSettings, UpdateStorageSettings,
};

/// Persistence for the active storage configuration
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_active(&self) -> Result<Option<StorageSettings>>;

    async fn insert_active(&self, settings: NewStorageSettings) -> Result<StorageSettings>;

    /// Replace the active row. A changed base URL is applied to every stored
    /// file URL in the same transaction.
    async fn update_active(
        &self,
        update: UpdateStorageSettings,
        updated_by: &str,
    ) -> Result<StorageSettings>;
}

pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SETTINGS_COLUMNS: &str = "id, base_url, storage_root, max_file_size_mb, allowed_file_types, \
    enable_caching, api_key, always_backup, is_active, updated_at, updated_by";

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get_active(&self) -> Result<Option<StorageSettings>> {
        let sql = format!(
            "SELECT {} FROM storage_settings WHERE is_active = TRUE LIMIT 1",
            SETTINGS_COLUMNS
        );
        sqlx::query_as::<_, StorageSettings>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load storage settings: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn insert_active(&self, settings: NewStorageSettings) -> Result<StorageSettings> {
        let sql = format!(
            r#"
            INSERT INTO storage_settings
                (base_url, storage_root, max_file_size_mb, allowed_file_types, enable_caching, always_backup, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, 'system')
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );
        sqlx::query_as::<_, StorageSettings>(&sql)
            .bind(&settings.base_url)
            .bind(&settings.storage_root)
            .bind(settings.max_file_size_mb)
            .bind(&settings.allowed_file_types)
            .bind(settings.enable_caching)
            .bind(settings.always_backup)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(e, "An active storage configuration already exists")
            })
    }

    async fn update_active(
        &self,
        update: UpdateStorageSettings,
        updated_by: &str,
    ) -> Result<StorageSettings> {
        let mut tx = self.pool.begin().await?;

        let previous_base_url: Option<String> = sqlx::query_scalar(
            "SELECT base_url FROM storage_settings WHERE is_active = TRUE FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await?;
        let Some(previous_base_url) = previous_base_url else {
            return Err(AppError::NotFound("No active storage configuration".to_string()));
        };

        let sql = format!(
            r#"
            UPDATE storage_settings
            SET base_url = $1, storage_root = $2, max_file_size_mb = $3, allowed_file_types = $4,
                enable_caching = $5, api_key = $6, always_backup = $7,
                updated_at = NOW(), updated_by = $8
            WHERE is_active = TRUE
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );
        let updated = sqlx::query_as::<_, StorageSettings>(&sql)
            .bind(&update.base_url)
            .bind(&update.storage_root)
            .bind(update.max_file_size_mb)
            .bind(&update.allowed_file_types)
            .bind(update.enable_caching)
            .bind(&update.api_key)
            .bind(update.always_backup)
            .bind(updated_by)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update storage settings: {:?}", e);
                AppError::Database(e)
            })?;

        // Stored URLs are base_url + "/" + stored_path and must follow the base
        if updated.base_url != previous_base_url {
            let rewritten = sqlx::query(
                "UPDATE storage_files SET url = RTRIM($1, '/') || '/' || stored_path",
            )
            .bind(&updated.base_url)
            .execute(&mut *tx)
            .await?;
            tracing::info!(
                "Rewrote {} file URLs for base URL {}",
                rewritten.rows_affected(),
                updated.base_url
            );
        }

        tx.commit().await?;
        Ok(updated)
    }
}
