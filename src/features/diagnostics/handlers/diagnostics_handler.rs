use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::features::diagnostics::dtos::{
    BackendStatusDto, HealthDto, PingDto, SettingsSummaryDto,
};
use crate::features::settings::SettingsSnapshot;
use crate::modules::storage::PrimaryBackend;
use crate::shared::types::ApiResponse;

#[derive(Clone)]
pub struct DiagnosticsState {
    pub backend: Arc<dyn PrimaryBackend>,
    pub snapshot: Arc<SettingsSnapshot>,
}

impl DiagnosticsState {
    async fn backend_status(&self) -> BackendStatusDto {
        BackendStatusDto {
            storage_type: self.backend.storage_type().to_string(),
            available: self.backend.is_available().await,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/storage/ping",
    responses((status = 200, description = "Service is up", body = ApiResponse<PingDto>)),
    tag = "diagnostics"
)]
pub async fn ping() -> Json<ApiResponse<PingDto>> {
    Json(ApiResponse::success(
        Some(PingDto {
            status: "ok".to_string(),
            timestamp: Utc::now(),
        }),
        None,
        None,
    ))
}

/// Backend availability plus a summary of the active configuration
#[utoipa::path(
    get,
    path = "/api/storage/diagnostics/health",
    responses(
        (status = 200, description = "Healthy", body = ApiResponse<HealthDto>),
        (status = 503, description = "Primary backend unavailable", body = ApiResponse<HealthDto>)
    ),
    tag = "diagnostics"
)]
pub async fn health(
    State(state): State<DiagnosticsState>,
) -> (StatusCode, Json<ApiResponse<HealthDto>>) {
    let backend = state.backend_status().await;
    let settings = state.snapshot.get();

    let (status, label) = if backend.available {
        (StatusCode::OK, "ok")
    } else {
        tracing::warn!("Primary backend {} is unavailable", backend.storage_type);
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthDto {
        status: label.to_string(),
        backend,
        settings: SettingsSummaryDto {
            base_url: settings.base_url.clone(),
            max_file_size_mb: settings.max_file_size_mb,
            enable_caching: settings.enable_caching,
            always_backup: settings.always_backup,
            updated_at: settings.updated_at,
        },
    };

    (status, Json(ApiResponse::success(Some(body), None, None)))
}

#[utoipa::path(
    get,
    path = "/api/storage/diagnostics/backend",
    responses((status = 200, description = "Backend status", body = ApiResponse<BackendStatusDto>)),
    tag = "diagnostics"
)]
pub async fn backend_status(
    State(state): State<DiagnosticsState>,
) -> Json<ApiResponse<BackendStatusDto>> {
    Json(ApiResponse::success(
        Some(state.backend_status().await),
        None,
        None,
    ))
}
