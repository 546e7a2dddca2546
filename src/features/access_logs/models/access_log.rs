use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;

/// Operations recorded in the access log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Upload,
    Download,
    Delete,
    Rename,
    Move,
    CreateFolder,
    RenameFolder,
    MoveFolder,
    DeleteFolder,
    MigrateToBackup,
    RestoreFromBackup,
    Verify,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "upload",
            AuditAction::Download => "download",
            AuditAction::Delete => "delete",
            AuditAction::Rename => "rename",
            AuditAction::Move => "move",
            AuditAction::CreateFolder => "create_folder",
            AuditAction::RenameFolder => "rename_folder",
            AuditAction::MoveFolder => "move_folder",
            AuditAction::DeleteFolder => "delete_folder",
            AuditAction::MigrateToBackup => "migrate_to_backup",
            AuditAction::RestoreFromBackup => "restore_from_backup",
            AuditAction::Verify => "verify",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(AuditAction::Upload),
            "download" => Ok(AuditAction::Download),
            "delete" => Ok(AuditAction::Delete),
            "rename" => Ok(AuditAction::Rename),
            "move" => Ok(AuditAction::Move),
            "create_folder" => Ok(AuditAction::CreateFolder),
            "rename_folder" => Ok(AuditAction::RenameFolder),
            "move_folder" => Ok(AuditAction::MoveFolder),
            "delete_folder" => Ok(AuditAction::DeleteFolder),
            "migrate_to_backup" => Ok(AuditAction::MigrateToBackup),
            "restore_from_backup" => Ok(AuditAction::RestoreFromBackup),
            "verify" => Ok(AuditAction::Verify),
            other => Err(AppError::Validation(format!("Unknown action '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AccessLogEntry {
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

#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub action: AuditAction,
    pub path: String,
    pub actor: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub file_size: Option<i64>,
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub action: Option<AuditAction>,
    pub success: Option<bool>,
}
