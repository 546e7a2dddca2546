use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::api_keys::models::ApiPrincipal;
use crate::features::files::dtos::{
    FileExistsDto, FileLocator, FileLookupQuery, FileResponseDto, FileUrlQuery, ListFilesQuery,
    MoveFileDto, RawUploadQuery, RenameFileDto, UploadFileDto, VerifyReportDto,
};
use crate::features::files::models::RelatedEntity;
use crate::features::files::services::{FileContent, FileStore, UploadRequest};
use crate::features::settings::SettingsSnapshot;
use crate::shared::constants::{CACHE_MAX_AGE_SECS, CHECKSUM_HEADER, SERVED_FROM_HEADER};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// State for file handlers
#[derive(Clone)]
pub struct FilesState {
    pub store: Arc<FileStore>,
    pub snapshot: Arc<SettingsSnapshot>,
}

const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// UPLOAD
// =============================================================================

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: the content (required)
/// - `category`: category name (required)
/// - `folder`: folder path below the category, empty for the root
/// - `with_backup`: "true" to keep a database backup as well
/// - `related_kind` / `related_id`: optional owning entity
#[utoipa::path(
    post,
    path = "/api/storage/files",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 201, description = "File uploaded", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file, type or size"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Category or folder not found")
    ),
    security(("api_key" = []))
)]
pub async fn upload_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>)> {
    let limit = usize::try_from(state.snapshot.get().max_file_size_bytes()).unwrap_or(usize::MAX);

    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut category: Option<String> = None;
    let mut folder = String::new();
    let mut with_backup = false;
    let mut related_kind: Option<String> = None;
    let mut related_id: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::BadRequest("File name is required".to_string()))?;
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .filter(|ct| ct != GENERIC_CONTENT_TYPE);

                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })? {
                    if data.len() + chunk.len() > limit {
                        return Err(AppError::Validation(format!(
                            "File size exceeds the maximum of {} MB",
                            state.snapshot.get().max_file_size_mb
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }
                file = Some((file_name, content_type, data));
            }
            "category" => category = Some(read_text(field, "category").await?),
            "folder" => folder = read_text(field, "folder").await?,
            "with_backup" => {
                let text = read_text(field, "with_backup").await?;
                with_backup = matches!(text.trim().to_lowercase().as_str(), "true" | "1" | "yes");
            }
            "related_kind" => related_kind = Some(read_text(field, "related_kind").await?),
            "related_id" => related_id = Some(read_text(field, "related_id").await?),
            _ => {
                // apiKey was already consumed by the key gate
                debug!("Ignoring multipart field: {}", field_name);
            }
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let category = category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Category is required".to_string()))?;
    let related_entity =
        RelatedEntity::from_parts(related_kind.as_deref(), related_id.as_deref())?;

    let record = state
        .store
        .upload(
            UploadRequest {
                file_name,
                content_type,
                category,
                folder,
                with_backup,
                related_entity,
                uploaded_by: principal.name,
            },
            data,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(record.into()),
            Some("File uploaded".to_string()),
            None,
        )),
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

/// Upload the raw request body
#[utoipa::path(
    put,
    path = "/api/storage/files/raw",
    tag = "files",
    params(RawUploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File uploaded", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file, type or size"),
        (status = 404, description = "Category or folder not found")
    ),
    security(("api_key" = []))
)]
pub async fn upload_raw(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Query(query): Query<RawUploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>)> {
    let related_entity =
        RelatedEntity::from_parts(query.related_kind.as_deref(), query.related_id.as_deref())?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .filter(|ct| ct != GENERIC_CONTENT_TYPE);

    let record = state
        .store
        .upload_stream(
            UploadRequest {
                file_name: query.file_name,
                content_type,
                category: query.category,
                folder: query.folder,
                with_backup: query.with_backup,
                related_entity,
                uploaded_by: principal.name,
            },
            body.into_data_stream(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(record.into()),
            Some("File uploaded".to_string()),
            None,
        )),
    ))
}

// =============================================================================
// LOOKUP
// =============================================================================

/// List active files
#[utoipa::path(
    get,
    path = "/api/storage/files",
    tag = "files",
    params(ListFilesQuery, PaginationQuery),
    responses(
        (status = 200, description = "Page of files", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 400, description = "Invalid filter")
    ),
    security(("api_key" = []))
)]
pub async fn list_files(
    State(state): State<FilesState>,
    Query(query): Query<ListFilesQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>> {
    let related_entity = query.related_entity()?;
    let (files, total) = state
        .store
        .list(
            query.category.as_deref(),
            query.folder.as_deref(),
            related_entity,
            &pagination,
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(files.into_iter().map(Into::into).collect()),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}

/// File metadata by URL or stored path
#[utoipa::path(
    get,
    path = "/api/storage/files/lookup",
    tag = "files",
    params(FileLookupQuery),
    responses(
        (status = 200, description = "File found", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found")
    ),
    security(("api_key" = []))
)]
pub async fn lookup_file(
    State(state): State<FilesState>,
    Query(query): Query<FileLookupQuery>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let catalog = state.store.catalog();
    let record = match query.locator()? {
        FileLocator::Url(url) => catalog.get_by_url(&url).await?,
        FileLocator::Path(path) => catalog.get_by_path(&path).await?,
    };
    Ok(Json(ApiResponse::success(Some(record.into()), None, None)))
}

/// Whether an active file exists at a URL or stored path
#[utoipa::path(
    get,
    path = "/api/storage/files/exists",
    tag = "files",
    params(FileLookupQuery),
    responses((status = 200, description = "Existence flag", body = ApiResponse<FileExistsDto>)),
    security(("api_key" = []))
)]
pub async fn file_exists(
    State(state): State<FilesState>,
    Query(query): Query<FileLookupQuery>,
) -> Result<Json<ApiResponse<FileExistsDto>>> {
    let catalog = state.store.catalog();
    let exists = match query.locator()? {
        FileLocator::Url(url) => catalog.exists_url(&url).await?,
        FileLocator::Path(path) => catalog.exists_path(&path).await?,
    };
    Ok(Json(ApiResponse::success(
        Some(FileExistsDto { exists }),
        None,
        None,
    )))
}

/// File metadata including where the bytes currently live
#[utoipa::path(
    get,
    path = "/api/storage/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File found", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found")
    ),
    security(("api_key" = []))
)]
pub async fn get_file(
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let record = state.store.catalog().get_active(id).await?;
    let storage_state = state.store.storage_state(&record).await?;

    let mut dto = FileResponseDto::from(record);
    dto.storage_state = storage_state;
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

// =============================================================================
// DOWNLOAD
// =============================================================================

/// Download file content
///
/// `X-Served-From` tells whether the primary backend or the backup answered.
#[utoipa::path(
    get,
    path = "/api/storage/files/{id}/content",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File or content not found")
    ),
    security(("api_key" = []))
)]
pub async fn download_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let content = state.store.read(id, &principal.name).await?;
    content_response(content, state.snapshot.get().enable_caching)
}

/// Download file content by public URL
#[utoipa::path(
    get,
    path = "/api/storage/files/download",
    tag = "files",
    params(FileUrlQuery),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found")
    ),
    security(("api_key" = []))
)]
pub async fn download_file_by_url(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Query(query): Query<FileUrlQuery>,
) -> Result<Response> {
    query
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
    let content = state.store.read_by_url(&query.url, &principal.name).await?;
    content_response(content, state.snapshot.get().enable_caching)
}

fn content_response(content: FileContent, enable_caching: bool) -> Result<Response> {
    let FileContent {
        record,
        data,
        served_from,
    } = content;

    let cache_control = if enable_caching {
        format!("public, max-age={}", CACHE_MAX_AGE_SECS)
    } else {
        "no-store".to_string()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.content_type.as_str())
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.file_name),
        )
        .header(header::CACHE_CONTROL, cache_control)
        .header(CHECKSUM_HEADER, record.checksum.as_str())
        .header(SERVED_FROM_HEADER, served_from.as_str())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build download response: {}", e)))
}

/// `inline` disposition with an ASCII fallback name plus the RFC 5987 form
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete a file (idempotent)
#[utoipa::path(
    delete,
    path = "/api/storage/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found")
    ),
    security(("api_key" = []))
)]
pub async fn delete_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let record = state.store.delete(id, &principal.name).await?;
    Ok(Json(ApiResponse::success(
        Some(record.into()),
        Some("File deleted".to_string()),
        None,
    )))
}

/// Delete a file by public URL
#[utoipa::path(
    delete,
    path = "/api/storage/files/by-url",
    tag = "files",
    params(FileUrlQuery),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found")
    ),
    security(("api_key" = []))
)]
pub async fn delete_file_by_url(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Query(query): Query<FileUrlQuery>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
    let record = state.store.delete_by_url(&query.url, &principal.name).await?;
    Ok(Json(ApiResponse::success(
        Some(record.into()),
        Some("File deleted".to_string()),
        None,
    )))
}

// =============================================================================
// RENAME / MOVE
// =============================================================================

/// Rename a file in place
#[utoipa::path(
    patch,
    path = "/api/storage/files/{id}/rename",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    request_body = RenameFileDto,
    responses(
        (status = 200, description = "File renamed", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found"),
        (status = 409, description = "Name already taken")
    ),
    security(("api_key" = []))
)]
pub async fn rename_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<RenameFileDto>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
    let record = state.store.rename(id, &dto.new_name, &principal.name).await?;
    Ok(Json(ApiResponse::success(
        Some(record.into()),
        Some("File renamed".to_string()),
        None,
    )))
}

/// Move a file to another folder of its category
#[utoipa::path(
    patch,
    path = "/api/storage/files/{id}/move",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    request_body = MoveFileDto,
    responses(
        (status = 200, description = "File moved", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File or folder not found"),
        (status = 409, description = "Name already taken in target folder")
    ),
    security(("api_key" = []))
)]
pub async fn move_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<MoveFileDto>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let record = state.store.move_file(id, &dto.folder, &principal.name).await?;
    Ok(Json(ApiResponse::success(
        Some(record.into()),
        Some("File moved".to_string()),
        None,
    )))
}

// =============================================================================
// BACKUP / INTEGRITY
// =============================================================================

/// Copy the primary content into a database backup
#[utoipa::path(
    post,
    path = "/api/storage/files/{id}/backup",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Backup present", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File or primary content not found")
    ),
    security(("api_key" = []))
)]
pub async fn backup_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let record = state.store.migrate_to_backup(id, &principal.name).await?;
    Ok(Json(ApiResponse::success(
        Some(record.into()),
        Some("Backup stored".to_string()),
        None,
    )))
}

/// Write the backup content back to the primary backend
#[utoipa::path(
    post,
    path = "/api/storage/files/{id}/restore",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Primary content restored", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File or backup not found"),
        (status = 422, description = "Backup does not match the recorded checksum")
    ),
    security(("api_key" = []))
)]
pub async fn restore_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let record = state.store.restore_from_backup(id, &principal.name).await?;
    Ok(Json(ApiResponse::success(
        Some(record.into()),
        Some("File restored from backup".to_string()),
        None,
    )))
}

/// Compare the stored content against the recorded checksum
#[utoipa::path(
    get,
    path = "/api/storage/files/{id}/verify",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Verification report", body = ApiResponse<VerifyReportDto>),
        (status = 404, description = "File or primary content not found")
    ),
    security(("api_key" = []))
)]
pub async fn verify_file(
    principal: ApiPrincipal,
    State(state): State<FilesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VerifyReportDto>>> {
    let report = state.store.verify(id, &principal.name).await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes_name() {
        assert_eq!(
            content_disposition("lease.pdf"),
            "inline; filename=\"lease.pdf\"; filename*=UTF-8''lease.pdf"
        );
        let header = content_disposition("say \"hi\".txt");
        assert!(header.starts_with("inline; filename=\"say _hi_.txt\""));
        assert!(content_disposition("café.txt").contains("filename=\"caf_.txt\""));
    }
}
