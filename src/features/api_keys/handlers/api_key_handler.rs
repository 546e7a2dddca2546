use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::api_keys::dtos::{ApiKeyResponseDto, CreateApiKeyDto, CreatedApiKeyDto};
use crate::features::api_keys::guards::RequireBootstrapKey;
use crate::features::api_keys::services::ApiKeyService;
use crate::shared::types::{ApiResponse, Meta};

/// List registered API keys (values masked)
#[utoipa::path(
    get,
    path = "/api/storage/api-keys",
    responses(
        (status = 200, description = "Registered keys", body = ApiResponse<Vec<ApiKeyResponseDto>>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Bootstrap key required")
    ),
    tag = "api-keys",
    security(("api_key" = []))
)]
pub async fn list_api_keys(
    RequireBootstrapKey(_principal): RequireBootstrapKey,
    State(service): State<Arc<ApiKeyService>>,
) -> Result<Json<ApiResponse<Vec<ApiKeyResponseDto>>>> {
    let keys: Vec<ApiKeyResponseDto> = service.list().await?.into_iter().map(Into::into).collect();
    let total = keys.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(keys),
        None,
        Some(Meta::total(total)),
    )))
}

/// Create a named API key
///
/// The generated key value is returned once and cannot be retrieved later.
#[utoipa::path(
    post,
    path = "/api/storage/api-keys",
    request_body = CreateApiKeyDto,
    responses(
        (status = 201, description = "Key created", body = ApiResponse<CreatedApiKeyDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Bootstrap key required")
    ),
    tag = "api-keys",
    security(("api_key" = []))
)]
pub async fn create_api_key(
    RequireBootstrapKey(_principal): RequireBootstrapKey,
    State(service): State<Arc<ApiKeyService>>,
    AppJson(dto): AppJson<CreateApiKeyDto>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedApiKeyDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let key = service.create(&dto.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(key.into()),
            Some("API key created".to_string()),
            None,
        )),
    ))
}

/// Revoke an API key
#[utoipa::path(
    delete,
    path = "/api/storage/api-keys/{id}",
    params(("id" = Uuid, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Key revoked", body = ApiResponse<ApiKeyResponseDto>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Bootstrap key required"),
        (status = 404, description = "Key not found")
    ),
    tag = "api-keys",
    security(("api_key" = []))
)]
pub async fn revoke_api_key(
    RequireBootstrapKey(_principal): RequireBootstrapKey,
    State(service): State<Arc<ApiKeyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApiKeyResponseDto>>> {
    let key = service.revoke(id).await?;
    Ok(Json(ApiResponse::success(
        Some(key.into()),
        Some("API key revoked".to_string()),
        None,
    )))
}
