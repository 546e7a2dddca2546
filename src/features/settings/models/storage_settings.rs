use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::constants::ANY_FILE_TYPE;

/// The single active storage configuration record
#[derive(Debug, Clone, FromRow)]
pub struct StorageSettings {
    pub id: Uuid,
    pub base_url: String,
    pub storage_root: String,
    pub max_file_size_mb: i32,
    pub allowed_file_types: Vec<String>,
    pub enable_caching: bool,
    pub api_key: Option<String>,
    pub always_backup: bool,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl StorageSettings {
    /// Upper bound for a single file, inclusive
    pub fn max_file_size_bytes(&self) -> i64 {
        i64::from(self.max_file_size_mb) * 1024 * 1024
    }

    /// True when the global list does not restrict file types
    pub fn allows_any_type(&self) -> bool {
        self.allowed_file_types.is_empty()
            || self.allowed_file_types.iter().any(|t| t == ANY_FILE_TYPE)
    }

    /// Canonical URL for a stored path
    pub fn file_url(&self, stored_path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), stored_path)
    }
}

/// Values used to create the first settings row
#[derive(Debug, Clone)]
pub struct NewStorageSettings {
    pub base_url: String,
    pub storage_root: String,
    pub max_file_size_mb: i32,
    pub allowed_file_types: Vec<String>,
    pub enable_caching: bool,
    pub always_backup: bool,
}

/// Full replacement of the mutable settings fields
#[derive(Debug, Clone)]
pub struct UpdateStorageSettings {
    pub base_url: String,
    pub storage_root: String,
    pub max_file_size_mb: i32,
    pub allowed_file_types: Vec<String>,
    pub enable_caching: bool,
    pub api_key: Option<String>,
    pub always_backup: bool,
}
