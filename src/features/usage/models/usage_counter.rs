use chrono::NaiveDate;
use sqlx::FromRow;
use uuid::Uuid;

/// Per-day, per-category counters
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UsageCounter {
    pub usage_date: NaiveDate,
    pub category_id: Uuid,
    pub file_count: i64,
    pub total_bytes: i64,
    pub upload_count: i64,
    pub download_count: i64,
    pub delete_count: i64,
}

/// Signed increments applied to one counter row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageDelta {
    pub file_count: i64,
    pub total_bytes: i64,
    pub uploads: i64,
    pub downloads: i64,
    pub deletes: i64,
}

impl UsageDelta {
    pub fn upload(size: i64) -> Self {
        Self {
            file_count: 1,
            total_bytes: size,
            uploads: 1,
            ..Self::default()
        }
    }

    pub fn download() -> Self {
        Self {
            downloads: 1,
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            deletes: 1,
            ..Self::default()
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
