use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::access_logs::{
    dtos as access_logs_dtos, handlers as access_logs_handlers, models as access_logs_models,
};
use crate::features::api_keys::{
    dtos as api_keys_dtos, handlers as api_keys_handlers, models as api_keys_models,
};
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::diagnostics::{dtos as diagnostics_dtos, handlers as diagnostics_handlers};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::features::folders::{dtos as folders_dtos, handlers as folders_handlers};
use crate::features::settings::{dtos as settings_dtos, handlers as settings_handlers};
use crate::features::usage::{dtos as usage_dtos, handlers as usage_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Files
        files_handlers::upload_file,
        files_handlers::upload_raw,
        files_handlers::list_files,
        files_handlers::lookup_file,
        files_handlers::file_exists,
        files_handlers::get_file,
        files_handlers::download_file,
        files_handlers::download_file_by_url,
        files_handlers::delete_file,
        files_handlers::delete_file_by_url,
        files_handlers::rename_file,
        files_handlers::move_file,
        files_handlers::backup_file,
        files_handlers::restore_file,
        files_handlers::verify_file,
        // Folders
        folders_handlers::create_folder,
        folders_handlers::list_folder_children,
        folders_handlers::get_folder,
        folders_handlers::delete_folder,
        folders_handlers::rename_folder,
        folders_handlers::move_folder,
        folders_handlers::get_folder_size,
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
        // Settings
        settings_handlers::get_settings,
        settings_handlers::update_settings,
        // API keys
        api_keys_handlers::list_api_keys,
        api_keys_handlers::create_api_key,
        api_keys_handlers::revoke_api_key,
        // Usage
        usage_handlers::get_usage,
        usage_handlers::correct_usage,
        // Access logs
        access_logs_handlers::list_access_logs,
        // Diagnostics
        diagnostics_handlers::ping,
        diagnostics_handlers::health,
        diagnostics_handlers::backend_status,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Files
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::FileExistsDto,
            files_dtos::RenameFileDto,
            files_dtos::MoveFileDto,
            files_dtos::VerifyReportDto,
            files_models::StorageState,
            files_models::EntityKind,
            files_models::RelatedEntity,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            // Folders
            folders_dtos::FolderResponseDto,
            folders_dtos::CreateFolderDto,
            folders_dtos::RenameFolderDto,
            folders_dtos::MoveFolderDto,
            folders_dtos::FolderListingDto,
            folders_dtos::FolderSizeDto,
            ApiResponse<folders_dtos::FolderResponseDto>,
            // Categories
            categories_dtos::CategoryResponseDto,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            // Settings
            settings_dtos::SettingsResponseDto,
            settings_dtos::UpdateSettingsDto,
            ApiResponse<settings_dtos::SettingsResponseDto>,
            // API keys
            api_keys_dtos::ApiKeyResponseDto,
            api_keys_dtos::CreatedApiKeyDto,
            api_keys_dtos::CreateApiKeyDto,
            api_keys_models::KeySource,
            ApiResponse<api_keys_dtos::CreatedApiKeyDto>,
            // Usage
            usage_dtos::UsageCounterDto,
            usage_dtos::UsageCorrectionDto,
            ApiResponse<Vec<usage_dtos::UsageCounterDto>>,
            // Access logs
            access_logs_dtos::AccessLogDto,
            access_logs_models::AuditAction,
            ApiResponse<Vec<access_logs_dtos::AccessLogDto>>,
            // Diagnostics
            diagnostics_dtos::PingDto,
            diagnostics_dtos::HealthDto,
            diagnostics_dtos::BackendStatusDto,
            diagnostics_dtos::SettingsSummaryDto,
        )
    ),
    tags(
        (name = "files", description = "File upload, download and lifecycle"),
        (name = "folders", description = "Folder hierarchy inside categories"),
        (name = "categories", description = "Top-level storage categories"),
        (name = "settings", description = "Active storage configuration"),
        (name = "api-keys", description = "API key registry"),
        (name = "usage", description = "Per-day storage usage counters"),
        (name = "access-logs", description = "Audit trail of storage operations"),
        (name = "diagnostics", description = "Liveness and backend status (no key required)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Estate Files API",
        version = "0.1.0",
        description = "Categorised file storage with folders, backups and integrity checks",
    )
)]
pub struct ApiDoc;

/// Adds the API key header scheme to the OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
