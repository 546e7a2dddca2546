use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{FileRecord, RelatedEntity, StorageState};
use crate::features::files::services::VerifyReport;

/// Upload form for OpenAPI documentation only; the handler reads the
/// multipart stream directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    #[schema(example = "documents")]
    pub category: String,
    /// Folder path below the category ("" = root)
    #[schema(example = "leases/2024")]
    pub folder: Option<String>,
    /// "true" to also keep a database backup
    pub with_backup: Option<String>,
    #[schema(example = "tenant")]
    pub related_kind: Option<String>,
    pub related_id: Option<String>,
    /// Alternative to the X-API-Key header
    #[schema(rename = "apiKey")]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: Uuid,
    pub file_name: String,
    /// `<category>/<folder path>/<file name>`
    pub stored_path: String,
    pub url: String,
    pub content_type: String,
    pub file_size: i64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    /// Hex SHA-256 of the content
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_count: i64,
    pub has_backup: bool,
    pub related_entity: Option<RelatedEntity>,
    /// Only filled on single-file lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_state: Option<StorageState>,
}

impl From<FileRecord> for FileResponseDto {
    fn from(f: FileRecord) -> Self {
        Self {
            related_entity: f.related_entity(),
            id: f.id,
            file_name: f.file_name,
            stored_path: f.stored_path,
            url: f.url,
            content_type: f.content_type,
            file_size: f.file_size,
            category_id: f.category_id,
            folder_id: f.folder_id,
            checksum: f.checksum,
            uploaded_at: f.uploaded_at,
            uploaded_by: f.uploaded_by,
            last_accessed_at: f.last_accessed_at,
            access_count: f.access_count,
            has_backup: f.has_backup,
            storage_state: None,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Category name
    pub category: Option<String>,
    /// Folder path; "" lists the category root only
    pub folder: Option<String>,
    pub related_kind: Option<String>,
    pub related_id: Option<String>,
}

impl ListFilesQuery {
    pub fn related_entity(&self) -> Result<Option<RelatedEntity>> {
        RelatedEntity::from_parts(self.related_kind.as_deref(), self.related_id.as_deref())
    }
}

/// Lookup by exactly one of `url` or `path`
#[derive(Debug, Deserialize, IntoParams)]
pub struct FileLookupQuery {
    pub url: Option<String>,
    /// Stored path, e.g. `documents/leases/a.pdf`
    pub path: Option<String>,
}

pub enum FileLocator {
    Url(String),
    Path(String),
}

impl FileLookupQuery {
    pub fn locator(self) -> Result<FileLocator> {
        match (self.url, self.path) {
            (Some(url), None) if !url.is_empty() => Ok(FileLocator::Url(url)),
            (None, Some(path)) if !path.is_empty() => {
                Ok(FileLocator::Path(path.trim_start_matches('/').to_string()))
            }
            _ => Err(AppError::BadRequest(
                "Provide exactly one of 'url' or 'path'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct FileUrlQuery {
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileExistsDto {
    pub exists: bool,
}

/// Query of the raw-body upload
#[derive(Debug, Deserialize, IntoParams)]
pub struct RawUploadQuery {
    pub category: String,
    pub file_name: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub with_backup: bool,
    pub related_kind: Option<String>,
    pub related_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameFileDto {
    /// New name; the original extension is kept when omitted
    #[validate(length(min = 1, max = 255, message = "new_name must be 1-255 characters"))]
    pub new_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveFileDto {
    /// Target folder path; "" is the category root
    #[serde(default)]
    pub folder: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyReportDto {
    pub file_id: Uuid,
    pub expected_checksum: String,
    pub actual_checksum: String,
    pub matches: bool,
}

impl From<VerifyReport> for VerifyReportDto {
    fn from(r: VerifyReport) -> Self {
        Self {
            file_id: r.file_id,
            expected_checksum: r.expected,
            actual_checksum: r.actual,
            matches: r.matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::EntityKind;

    #[test]
    fn test_lookup_requires_exactly_one_locator() {
        let both = FileLookupQuery {
            url: Some("http://files.test/a".to_string()),
            path: Some("a".to_string()),
        };
        assert!(both.locator().is_err());

        let none = FileLookupQuery {
            url: None,
            path: None,
        };
        assert!(none.locator().is_err());

        let path = FileLookupQuery {
            url: None,
            path: Some("/documents/a.pdf".to_string()),
        };
        assert!(matches!(path.locator().unwrap(), FileLocator::Path(p) if p == "documents/a.pdf"));
    }

    #[test]
    fn test_response_carries_related_entity() {
        let id = Uuid::new_v4();
        let record = FileRecord {
            id: Uuid::new_v4(),
            stored_path: "documents/a.pdf".to_string(),
            file_name: "a.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 3,
            category_id: Uuid::new_v4(),
            folder_id: None,
            checksum: "abc".to_string(),
            uploaded_at: Utc::now(),
            uploaded_by: "key:portal".to_string(),
            last_accessed_at: None,
            access_count: 0,
            is_deleted: false,
            deleted_at: None,
            has_backup: false,
            url: "http://files.test/documents/a.pdf".to_string(),
            related_entity_kind: Some("tenant".to_string()),
            related_entity_id: Some(id),
        };

        let dto = FileResponseDto::from(record);
        let related = dto.related_entity.unwrap();
        assert_eq!(related.kind, EntityKind::Tenant);
        assert_eq!(related.id, id);

        let json = serde_json::to_value(FileResponseDto {
            storage_state: None,
            ..dto
        })
        .unwrap();
        assert!(json.get("storage_state").is_none());
    }
}
