use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::config::parse_type_list;
use crate::features::settings::models::{StorageSettings, UpdateStorageSettings};

/// Response DTO for the active storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettingsResponseDto {
    pub id: Uuid,
    /// Prefix of every canonical file URL
    pub base_url: String,
    /// Root directory of the primary backend
    pub storage_root: String,
    pub max_file_size_mb: i32,
    /// Global allowed extensions ("*" allows everything)
    pub allowed_file_types: Vec<String>,
    pub enable_caching: bool,
    /// Whether a configuration-level API key is set (the value is never returned)
    pub has_api_key: bool,
    pub always_backup: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl From<StorageSettings> for SettingsResponseDto {
    fn from(s: StorageSettings) -> Self {
        Self {
            id: s.id,
            base_url: s.base_url,
            storage_root: s.storage_root,
            max_file_size_mb: s.max_file_size_mb,
            allowed_file_types: s.allowed_file_types,
            enable_caching: s.enable_caching,
            has_api_key: s.api_key.is_some(),
            always_backup: s.always_backup,
            updated_at: s.updated_at,
            updated_by: s.updated_by,
        }
    }
}

/// Request DTO for replacing the storage configuration
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingsDto {
    #[validate(url(message = "base_url must be a valid URL"))]
    pub base_url: String,
    #[validate(length(min = 1, message = "storage_root is required"))]
    pub storage_root: String,
    #[validate(range(min = 1, max = 10240, message = "max_file_size_mb must be between 1 and 10240"))]
    pub max_file_size_mb: i32,
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    /// Configuration-level API key; omit or null to disable
    #[validate(length(min = 16, message = "api_key must be at least 16 characters"))]
    pub api_key: Option<String>,
    #[serde(default)]
    pub always_backup: bool,
}

fn default_true() -> bool {
    true
}

impl From<UpdateSettingsDto> for UpdateStorageSettings {
    fn from(dto: UpdateSettingsDto) -> Self {
        Self {
            base_url: dto.base_url.trim_end_matches('/').to_string(),
            storage_root: dto.storage_root,
            max_file_size_mb: dto.max_file_size_mb,
            allowed_file_types: parse_type_list(&dto.allowed_file_types.join(",")),
            enable_caching: dto.enable_caching,
            api_key: dto.api_key,
            always_backup: dto.always_backup,
        }
    }
}
