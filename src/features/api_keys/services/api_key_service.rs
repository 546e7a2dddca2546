use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::api_keys::models::ApiKey;
use crate::features::api_keys::repository::ApiKeyRepository;

/// Service for managing registered API keys
pub struct ApiKeyService {
    repo: Arc<dyn ApiKeyRepository>,
}

impl ApiKeyService {
    pub fn new(repo: Arc<dyn ApiKeyRepository>) -> Self {
        Self { repo }
    }

    /// Create a key with a freshly generated secret; the full value is only
    /// visible in the returned record.
    pub async fn create(&self, name: &str) -> Result<ApiKey> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Key name must not be empty".to_string()));
        }

        let key = self.repo.create(name, &generate_key_value()).await?;
        tracing::info!("API key created: id={}, name={}", key.id, key.name);
        Ok(key)
    }

    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        self.repo.list().await
    }

    /// Revoke a key; revoking twice is not an error
    pub async fn revoke(&self, id: Uuid) -> Result<ApiKey> {
        let key = self
            .repo
            .revoke(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("API key {} not found", id)))?;
        tracing::info!("API key revoked: id={}, name={}", key.id, key.name);
        Ok(key)
    }
}

/// Two v4 UUIDs (244 random bits) rendered as 64 hex characters
fn generate_key_value() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}
