use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::api_keys::models::ApiPrincipal;
use crate::features::folders::dtos::{
    CreateFolderDto, DeleteFolderQuery, FolderListingDto, FolderResponseDto, FolderSizeDto,
    ListFoldersQuery, MoveFolderDto, RenameFolderDto,
};
use crate::features::folders::services::FolderService;
use crate::shared::types::ApiResponse;

/// Create a folder
#[utoipa::path(
    post,
    path = "/api/storage/folders",
    request_body = CreateFolderDto,
    responses(
        (status = 201, description = "Folder created", body = ApiResponse<FolderResponseDto>),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "Category or parent folder not found"),
        (status = 409, description = "Folder already exists")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn create_folder(
    principal: ApiPrincipal,
    State(service): State<Arc<FolderService>>,
    AppJson(dto): AppJson<CreateFolderDto>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let folder = service
        .create_folder(&dto.category, &dto.parent_path, &dto.name, &principal.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(folder.into()),
            Some("Folder created".to_string()),
            None,
        )),
    ))
}

/// List the folders and files directly below a path
#[utoipa::path(
    get,
    path = "/api/storage/folders",
    params(ListFoldersQuery),
    responses(
        (status = 200, description = "Folder contents", body = ApiResponse<FolderListingDto>),
        (status = 404, description = "Category or folder not found")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn list_folder_children(
    State(service): State<Arc<FolderService>>,
    Query(query): Query<ListFoldersQuery>,
) -> Result<Json<ApiResponse<FolderListingDto>>> {
    let listing = service
        .list_children(&query.category, &query.parent_path)
        .await?;
    Ok(Json(ApiResponse::success(Some(listing.into()), None, None)))
}

#[utoipa::path(
    get,
    path = "/api/storage/folders/{id}",
    params(("id" = Uuid, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Folder found", body = ApiResponse<FolderResponseDto>),
        (status = 404, description = "Folder not found")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn get_folder(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FolderResponseDto>>> {
    let folder = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(folder.into()), None, None)))
}

/// Delete a folder; non-empty folders need `cascade=true`
#[utoipa::path(
    delete,
    path = "/api/storage/folders/{id}",
    params(("id" = Uuid, Path, description = "Folder ID"), DeleteFolderQuery),
    responses(
        (status = 200, description = "Folder deleted", body = ApiResponse<FolderResponseDto>),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "Folder not empty")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn delete_folder(
    principal: ApiPrincipal,
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteFolderQuery>,
) -> Result<Json<ApiResponse<FolderResponseDto>>> {
    let folder = service
        .delete_folder(id, query.cascade, &principal.name)
        .await?;
    Ok(Json(ApiResponse::success(
        Some(folder.into()),
        Some("Folder deleted".to_string()),
        None,
    )))
}

/// Rename a folder together with everything below it
#[utoipa::path(
    patch,
    path = "/api/storage/folders/{id}/rename",
    params(("id" = Uuid, Path, description = "Folder ID")),
    request_body = RenameFolderDto,
    responses(
        (status = 200, description = "Folder renamed", body = ApiResponse<FolderResponseDto>),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "Name already taken")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn rename_folder(
    principal: ApiPrincipal,
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<RenameFolderDto>,
) -> Result<Json<ApiResponse<FolderResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
    let folder = service
        .rename_folder(id, &dto.new_name, &principal.name)
        .await?;
    Ok(Json(ApiResponse::success(
        Some(folder.into()),
        Some("Folder renamed".to_string()),
        None,
    )))
}

#[utoipa::path(
    patch,
    path = "/api/storage/folders/{id}/move",
    params(("id" = Uuid, Path, description = "Folder ID")),
    request_body = MoveFolderDto,
    responses(
        (status = 200, description = "Folder moved", body = ApiResponse<FolderResponseDto>),
        (status = 400, description = "Target is inside the folder"),
        (status = 404, description = "Folder or target not found"),
        (status = 409, description = "Name already taken at target")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn move_folder(
    principal: ApiPrincipal,
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<MoveFolderDto>,
) -> Result<Json<ApiResponse<FolderResponseDto>>> {
    let folder = service
        .move_folder(id, &dto.new_parent_path, &principal.name)
        .await?;
    Ok(Json(ApiResponse::success(
        Some(folder.into()),
        Some("Folder moved".to_string()),
        None,
    )))
}

/// Total bytes of active files at or below the folder
#[utoipa::path(
    get,
    path = "/api/storage/folders/{id}/size",
    params(("id" = Uuid, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Folder size", body = ApiResponse<FolderSizeDto>),
        (status = 404, description = "Folder not found")
    ),
    tag = "folders",
    security(("api_key" = []))
)]
pub async fn get_folder_size(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FolderSizeDto>>> {
    let total_bytes = service.get_folder_size(id).await?;
    Ok(Json(ApiResponse::success(
        Some(FolderSizeDto {
            folder_id: id,
            total_bytes,
        }),
        None,
        None,
    )))
}
