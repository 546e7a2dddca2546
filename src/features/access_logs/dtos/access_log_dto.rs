use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::access_logs::models::AccessLogEntry;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessLogDto {
    pub id: Uuid,
    pub action: String,
    pub path: String,
    pub actor: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub file_size: Option<i64>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<AccessLogEntry> for AccessLogDto {
    fn from(e: AccessLogEntry) -> Self {
        Self {
            id: e.id,
            action: e.action,
            path: e.path,
            actor: e.actor,
            success: e.success,
            error_message: e.error_message,
            file_size: e.file_size,
            duration_ms: e.duration_ms,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AccessLogQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// e.g. "upload", "delete_folder"
    pub action: Option<String>,
    pub success: Option<bool>,
}
