use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PingDto {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BackendStatusDto {
    /// e.g. "local"
    pub storage_type: String,
    pub available: bool,
}

/// Non-secret view of the active configuration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsSummaryDto {
    pub base_url: String,
    pub max_file_size_mb: i32,
    pub enable_caching: bool,
    pub always_backup: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    /// "ok" or "degraded"
    pub status: String,
    pub backend: BackendStatusDto,
    pub settings: SettingsSummaryDto,
}
