use std::sync::Arc;
use std::time::Instant;

use crate::core::error::{AppError, Result};
use crate::features::access_logs::models::{
    AccessLogEntry, AccessLogFilter, AuditAction, NewAccessLog,
};
use crate::features::access_logs::repository::AccessLogRepository;

pub struct AccessLogService {
    repo: Arc<dyn AccessLogRepository>,
}

impl AccessLogService {
    pub fn new(repo: Arc<dyn AccessLogRepository>) -> Self {
        Self { repo }
    }

    /// Append an entry; a failed insert is logged and otherwise ignored
    pub async fn append(&self, entry: NewAccessLog) {
        let action = entry.action;
        if let Err(e) = self.repo.append(entry).await {
            tracing::warn!("Failed to write access log ({}): {}", action.as_str(), e);
        }
    }

    /// Record the outcome of an operation that started at `started`
    pub async fn record<T>(
        &self,
        action: AuditAction,
        path: &str,
        actor: &str,
        outcome: &Result<T>,
        file_size: Option<i64>,
        started: Instant,
    ) {
        let error_message = outcome.as_ref().err().map(outcome_message);
        self.append(NewAccessLog {
            action,
            path: path.to_string(),
            actor: actor.to_string(),
            success: outcome.is_ok(),
            error_message,
            file_size,
            duration_ms: Some(started.elapsed().as_millis() as i64),
        })
        .await;
    }

    pub async fn query(
        &self,
        filter: &AccessLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AccessLogEntry>, i64)> {
        self.repo.query(filter, limit, offset).await
    }
}

/// Error text stored in the log; storage and database details stay in tracing
fn outcome_message(e: &AppError) -> String {
    match e {
        AppError::Database(_) => "Database error".to_string(),
        AppError::Storage(_) => "Storage operation failed".to_string(),
        AppError::Internal(_) => "Internal error".to_string(),
        other => other.to_string(),
    }
}
