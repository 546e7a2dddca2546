use std::sync::Arc;

use crate::core::config::StorageBootConfig;
use crate::core::error::{AppError, Result};
use crate::features::settings::models::{
    NewStorageSettings, StorageSettings, UpdateStorageSettings,
};
use crate::features::settings::repository::SettingsRepository;
use crate::features::settings::services::SettingsSnapshot;

/// Service for the active storage configuration
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    snapshot: Arc<SettingsSnapshot>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, snapshot: Arc<SettingsSnapshot>) -> Self {
        Self { repo, snapshot }
    }

    /// Load the active settings, creating them from the environment on first start.
    ///
    /// Fails when neither the database nor the environment provides a storage root;
    /// the process cannot serve files without one.
    pub async fn load_or_seed(
        repo: &dyn SettingsRepository,
        boot: &StorageBootConfig,
    ) -> Result<StorageSettings> {
        if let Some(existing) = repo.get_active().await? {
            if existing.storage_root.trim().is_empty() {
                return Err(AppError::Internal(
                    "Active storage configuration has no storage root".to_string(),
                ));
            }
            return Ok(existing);
        }

        let storage_root = boot.storage_root.clone().ok_or_else(|| {
            AppError::Internal(
                "No storage root configured: set STORAGE_ROOT or create a storage configuration"
                    .to_string(),
            )
        })?;

        let seeded = repo
            .insert_active(NewStorageSettings {
                base_url: boot.base_url.clone(),
                storage_root,
                max_file_size_mb: boot.max_file_size_mb,
                allowed_file_types: boot.allowed_file_types.clone(),
                enable_caching: true,
                always_backup: boot.always_backup,
            })
            .await?;

        tracing::info!(
            "Seeded storage configuration: root={}, base_url={}, max_size={}MB",
            seeded.storage_root,
            seeded.base_url,
            seeded.max_file_size_mb
        );

        Ok(seeded)
    }

    /// Current settings from the database (source of truth)
    pub async fn get_active(&self) -> Result<StorageSettings> {
        self.repo
            .get_active()
            .await?
            .ok_or_else(|| AppError::NotFound("No active storage configuration".to_string()))
    }

    /// Replace the active settings and publish them to the snapshot immediately.
    /// Changing the base URL moves every stored file URL onto the new base;
    /// links built on the old base stop resolving.
    pub async fn update(
        &self,
        update: UpdateStorageSettings,
        updated_by: &str,
    ) -> Result<StorageSettings> {
        validate_update(&update)?;

        let previous = self.snapshot.get();
        let updated = self.repo.update_active(update, updated_by).await?;

        if updated.base_url != previous.base_url {
            tracing::info!(
                "Base URL changed from {} to {}; stored file URLs were rewritten",
                previous.base_url,
                updated.base_url
            );
        }

        let previous_root = &previous.storage_root;
        if updated.storage_root != *previous_root {
            tracing::warn!(
                "Storage root changed from {} to {}; takes effect after restart",
                previous_root,
                updated.storage_root
            );
        }

        self.snapshot.replace(updated.clone());
        tracing::info!("Storage configuration updated by {}", updated_by);

        Ok(updated)
    }
}

fn validate_update(update: &UpdateStorageSettings) -> Result<()> {
    if update.max_file_size_mb <= 0 {
        return Err(AppError::Validation(
            "max_file_size_mb must be positive".to_string(),
        ));
    }
    if update.base_url.trim().is_empty() {
        return Err(AppError::Validation("base_url must not be empty".to_string()));
    }
    if update.storage_root.trim().is_empty() {
        return Err(AppError::Validation(
            "storage_root must not be empty".to_string(),
        ));
    }
    if matches!(update.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
        return Err(AppError::Validation(
            "api_key must not be blank; omit it to disable".to_string(),
        ));
    }
    Ok(())
}
