use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::api_keys::guards::RequireBootstrapKey;
use crate::features::categories::CategoryService;
use crate::features::usage::dtos::{UsageCorrectionDto, UsageCounterDto, UsageQuery};
use crate::features::usage::services::UsageService;
use crate::shared::types::{ApiResponse, Meta};

/// State for usage handlers
#[derive(Clone)]
pub struct UsageState {
    pub usage: Arc<UsageService>,
    pub categories: Arc<CategoryService>,
}

/// Usage statistics per day and category
#[utoipa::path(
    get,
    path = "/api/storage/usage",
    params(UsageQuery),
    responses(
        (status = 200, description = "Usage rows ordered by date", body = ApiResponse<Vec<UsageCounterDto>>),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Category not found")
    ),
    tag = "usage",
    security(("api_key" = []))
)]
pub async fn get_usage(
    State(state): State<UsageState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<ApiResponse<Vec<UsageCounterDto>>>> {
    let to = query.to.unwrap_or_else(|| Utc::now().date_naive());
    let from = query.from.unwrap_or(to - Duration::days(30));

    let category_id = match query.category.as_deref() {
        Some(name) => Some(state.categories.get_by_name(name).await?.id),
        None => None,
    };

    let rows: Vec<UsageCounterDto> = state
        .usage
        .query(from, to, category_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = rows.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(rows),
        None,
        Some(Meta::total(total)),
    )))
}

/// Apply a signed correction to a usage row
#[utoipa::path(
    post,
    path = "/api/storage/usage/corrections",
    request_body = UsageCorrectionDto,
    responses(
        (status = 200, description = "Corrected row", body = ApiResponse<UsageCounterDto>),
        (status = 400, description = "Empty correction"),
        (status = 403, description = "Bootstrap key required"),
        (status = 404, description = "Category not found")
    ),
    tag = "usage",
    security(("api_key" = []))
)]
pub async fn correct_usage(
    RequireBootstrapKey(principal): RequireBootstrapKey,
    State(state): State<UsageState>,
    AppJson(dto): AppJson<UsageCorrectionDto>,
) -> Result<Json<ApiResponse<UsageCounterDto>>> {
    let category = state.categories.get_by_name(&dto.category).await?;
    let row = state
        .usage
        .correct(category.id, dto.usage_date, dto.delta(), &principal.name)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(row.into()),
        Some("Usage corrected".to_string()),
        None,
    )))
}
