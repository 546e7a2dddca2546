use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::usage::models::{UsageCounter, UsageDelta};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageCounterDto {
    pub usage_date: NaiveDate,
    pub category_id: Uuid,
    pub file_count: i64,
    pub total_bytes: i64,
    pub upload_count: i64,
    pub download_count: i64,
    pub delete_count: i64,
}

impl From<UsageCounter> for UsageCounterDto {
    fn from(c: UsageCounter) -> Self {
        Self {
            usage_date: c.usage_date,
            category_id: c.category_id,
            file_count: c.file_count,
            total_bytes: c.total_bytes,
            upload_count: c.upload_count,
            download_count: c.download_count,
            delete_count: c.delete_count,
        }
    }
}

/// Query params for usage statistics; dates default to the last 30 days
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct UsageQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Category name
    pub category: Option<String>,
}

/// Signed correction applied to one (date, category) row
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UsageCorrectionDto {
    /// Category name
    pub category: String,
    pub usage_date: NaiveDate,
    #[serde(default)]
    pub file_count: i64,
    #[serde(default)]
    pub total_bytes: i64,
    #[serde(default)]
    pub upload_count: i64,
    #[serde(default)]
    pub download_count: i64,
    #[serde(default)]
    pub delete_count: i64,
}

impl UsageCorrectionDto {
    pub fn delta(&self) -> UsageDelta {
        UsageDelta {
            file_count: self.file_count,
            total_bytes: self.total_bytes,
            uploads: self.upload_count,
            downloads: self.download_count,
            deletes: self.delete_count,
        }
    }
}
