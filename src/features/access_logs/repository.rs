use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::access_logs::models::{AccessLogEntry, AccessLogFilter, NewAccessLog};

/// Append-only access log storage
#[async_trait]
pub trait AccessLogRepository: Send + Sync {
    async fn append(&self, entry: NewAccessLog) -> Result<()>;

    /// Entries matching the filter, newest first, with the total count
    async fn query(
        &self,
        filter: &AccessLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AccessLogEntry>, i64)>;
}

pub struct PgAccessLogRepository {
    pool: PgPool,
}

impl PgAccessLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LOG_FILTER: &str = r#"
    ($1::timestamptz IS NULL OR created_at >= $1)
    AND ($2::timestamptz IS NULL OR created_at <= $2)
    AND ($3::text IS NULL OR action = $3)
    AND ($4::boolean IS NULL OR success = $4)
"#;

#[async_trait]
impl AccessLogRepository for PgAccessLogRepository {
    async fn append(&self, entry: NewAccessLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO storage_access_logs
                (action, path, actor, success, error_message, file_size, duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.action.as_str())
        .bind(&entry.path)
        .bind(&entry.actor)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(entry.file_size)
        .bind(entry.duration_ms)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    async fn query(
        &self,
        filter: &AccessLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AccessLogEntry>, i64)> {
        let action = filter.action.map(|a| a.as_str());

        let sql = format!(
            r#"
            SELECT id, action, path, actor, success, error_message, file_size, duration_ms, created_at
            FROM storage_access_logs
            WHERE {}
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            LOG_FILTER
        );
        let entries = sqlx::query_as::<_, AccessLogEntry>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(action)
            .bind(filter.success)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query access logs: {:?}", e);
                AppError::Database(e)
            })?;

        let count_sql = format!("SELECT COUNT(*) FROM storage_access_logs WHERE {}", LOG_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(action)
            .bind(filter.success)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok((entries, total))
    }
}
