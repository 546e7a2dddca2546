use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::usage::models::{UsageCounter, UsageDelta};

#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Add `delta` to the (date, category) row, creating it when missing
    async fn record(&self, category_id: Uuid, date: NaiveDate, delta: UsageDelta)
        -> Result<UsageCounter>;

    /// Rows in `[from, to]`, ordered by date
    async fn query(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        category_id: Option<Uuid>,
    ) -> Result<Vec<UsageCounter>>;
}

pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn record(
        &self,
        category_id: Uuid,
        date: NaiveDate,
        delta: UsageDelta,
    ) -> Result<UsageCounter> {
        sqlx::query_as::<_, UsageCounter>(
            r#"
            INSERT INTO storage_usage_stats (
                usage_date, category_id, file_count, total_bytes,
                upload_count, download_count, delete_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (usage_date, category_id) DO UPDATE SET
                file_count = storage_usage_stats.file_count + EXCLUDED.file_count,
                total_bytes = storage_usage_stats.total_bytes + EXCLUDED.total_bytes,
                upload_count = storage_usage_stats.upload_count + EXCLUDED.upload_count,
                download_count = storage_usage_stats.download_count + EXCLUDED.download_count,
                delete_count = storage_usage_stats.delete_count + EXCLUDED.delete_count
            RETURNING usage_date, category_id, file_count, total_bytes,
                upload_count, download_count, delete_count
            "#,
        )
        .bind(date)
        .bind(category_id)
        .bind(delta.file_count)
        .bind(delta.total_bytes)
        .bind(delta.uploads)
        .bind(delta.downloads)
        .bind(delta.deletes)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn query(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        category_id: Option<Uuid>,
    ) -> Result<Vec<UsageCounter>> {
        sqlx::query_as::<_, UsageCounter>(
            r#"
            SELECT usage_date, category_id, file_count, total_bytes,
                upload_count, download_count, delete_count
            FROM storage_usage_stats
            WHERE usage_date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR category_id = $3)
            ORDER BY usage_date, category_id
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to query usage stats: {:?}", e);
            AppError::Database(e)
        })
    }
}
