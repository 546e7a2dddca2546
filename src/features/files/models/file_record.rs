use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::RelatedEntity;

/// Catalog entry for a stored file
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    /// `<category>/<folder path>/<file name>`, also the primary backend key
    pub stored_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_count: i64,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub has_backup: bool,
    pub url: String,
    pub related_entity_kind: Option<String>,
    pub related_entity_id: Option<Uuid>,
}

impl FileRecord {
    pub fn related_entity(&self) -> Option<RelatedEntity> {
        RelatedEntity::from_columns(self.related_entity_kind.as_deref(), self.related_entity_id)
    }

    /// Directory part of the stored path
    pub fn directory(&self) -> &str {
        self.stored_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }
}

/// Where a file's bytes currently live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageState {
    PrimaryOnly,
    Both,
    BackupOnly,
}

#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Chosen by the caller so the upload can lock it before the row exists
    pub id: Uuid,
    pub stored_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub checksum: String,
    pub uploaded_by: String,
    pub url: String,
    pub related_entity: Option<RelatedEntity>,
}

/// Listing filter; all set fields must match
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub category_id: Option<Uuid>,
    /// Restrict to one folder; `Some(None)` means the category root
    pub folder_id: Option<Option<Uuid>>,
    pub related_entity: Option<RelatedEntity>,
}
