use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::core::error::Result;
use crate::features::access_logs::dtos::{AccessLogDto, AccessLogQuery};
use crate::features::access_logs::models::AccessLogFilter;
use crate::features::access_logs::services::AccessLogService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Query the storage access log
#[utoipa::path(
    get,
    path = "/api/storage/access-logs",
    params(AccessLogQuery, PaginationQuery),
    responses(
        (status = 200, description = "Log entries, newest first", body = ApiResponse<Vec<AccessLogDto>>),
        (status = 400, description = "Unknown action")
    ),
    tag = "access-logs",
    security(("api_key" = []))
)]
pub async fn list_access_logs(
    State(service): State<Arc<AccessLogService>>,
    Query(query): Query<AccessLogQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<AccessLogDto>>>> {
    let filter = AccessLogFilter {
        from: query.from,
        to: query.to,
        action: query.action.as_deref().map(str::parse).transpose()?,
        success: query.success,
    };

    let (entries, total) = service
        .query(&filter, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(entries.into_iter().map(Into::into).collect()),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}
