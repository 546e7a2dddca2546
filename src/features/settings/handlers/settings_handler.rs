use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::api_keys::guards::RequireBootstrapKey;
use crate::features::settings::dtos::{SettingsResponseDto, UpdateSettingsDto};
use crate::features::settings::services::SettingsService;
use crate::shared::types::ApiResponse;

/// Get the active storage configuration
#[utoipa::path(
    get,
    path = "/api/storage/settings",
    responses(
        (status = 200, description = "Active storage configuration", body = ApiResponse<SettingsResponseDto>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Bootstrap key required")
    ),
    tag = "settings",
    security(("api_key" = []))
)]
pub async fn get_settings(
    RequireBootstrapKey(_principal): RequireBootstrapKey,
    State(service): State<Arc<SettingsService>>,
) -> Result<Json<ApiResponse<SettingsResponseDto>>> {
    let settings = service.get_active().await?;
    Ok(Json(ApiResponse::success(Some(settings.into()), None, None)))
}

/// Replace the active storage configuration
///
/// Changes apply immediately, except `storage_root` which takes effect after a restart.
#[utoipa::path(
    put,
    path = "/api/storage/settings",
    request_body = UpdateSettingsDto,
    responses(
        (status = 200, description = "Updated storage configuration", body = ApiResponse<SettingsResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Bootstrap key required")
    ),
    tag = "settings",
    security(("api_key" = []))
)]
pub async fn update_settings(
    RequireBootstrapKey(principal): RequireBootstrapKey,
    State(service): State<Arc<SettingsService>>,
    AppJson(dto): AppJson<UpdateSettingsDto>,
) -> Result<Json<ApiResponse<SettingsResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let settings = service.update(dto.into(), &principal.name).await?;

    Ok(Json(ApiResponse::success(
        Some(settings.into()),
        Some("Storage configuration updated".to_string()),
        None,
    )))
}
