use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::usage::models::{UsageCounter, UsageDelta};
use crate::features::usage::repository::UsageRepository;

/// Per-day, per-category usage accounting.
///
/// Storage operations report through the `record_*` methods, which never fail:
/// a lost increment is logged and the operation carries on.
pub struct UsageService {
    repo: Arc<dyn UsageRepository>,
}

impl UsageService {
    pub fn new(repo: Arc<dyn UsageRepository>) -> Self {
        Self { repo }
    }

    pub async fn record_upload(&self, category_id: Uuid, size: i64) {
        self.record_best_effort(category_id, UsageDelta::upload(size)).await;
    }

    pub async fn record_download(&self, category_id: Uuid) {
        self.record_best_effort(category_id, UsageDelta::download()).await;
    }

    pub async fn record_delete(&self, category_id: Uuid) {
        self.record_best_effort(category_id, UsageDelta::delete()).await;
    }

    async fn record_best_effort(&self, category_id: Uuid, delta: UsageDelta) {
        let today = Utc::now().date_naive();
        if let Err(e) = self.repo.record(category_id, today, delta).await {
            tracing::warn!(
                "Failed to record usage for category {}: {}",
                category_id,
                e
            );
        }
    }

    /// Apply an explicit signed correction to one row
    pub async fn correct(
        &self,
        category_id: Uuid,
        date: NaiveDate,
        delta: UsageDelta,
        corrected_by: &str,
    ) -> Result<UsageCounter> {
        if delta.is_zero() {
            return Err(AppError::Validation(
                "Correction must change at least one counter".to_string(),
            ));
        }

        let row = self.repo.record(category_id, date, delta).await?;
        tracing::info!(
            "Usage corrected by {} for category {} on {}: {:?}",
            corrected_by,
            category_id,
            date,
            delta
        );
        Ok(row)
    }

    pub async fn query(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        category_id: Option<Uuid>,
    ) -> Result<Vec<UsageCounter>> {
        if from > to {
            return Err(AppError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }
        self.repo.query(from, to, category_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::memory_store::MemoryStore;

    #[tokio::test]
    async fn test_counters_accumulate_and_never_decrease() {
        let store = Arc::new(MemoryStore::new());
        let service = UsageService::new(store.clone());
        let category = Uuid::new_v4();

        service.record_upload(category, 100).await;
        service.record_upload(category, 50).await;
        service.record_download(category).await;
        service.record_delete(category).await;

        let today = Utc::now().date_naive();
        let rows = service.query(today, today, Some(category)).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.file_count, 2);
        assert_eq!(row.total_bytes, 150);
        assert_eq!(row.upload_count, 2);
        assert_eq!(row.download_count, 1);
        assert_eq!(row.delete_count, 1);
    }

    #[tokio::test]
    async fn test_recording_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        let service = UsageService::new(store.clone());
        store.set_unavailable(true);
        service.record_upload(Uuid::new_v4(), 10).await;
    }

    #[tokio::test]
    async fn test_explicit_correction() {
        let store = Arc::new(MemoryStore::new());
        let service = UsageService::new(store.clone());
        let category = Uuid::new_v4();
        service.record_upload(category, 100).await;

        let today = Utc::now().date_naive();
        let row = service
            .correct(
                category,
                today,
                UsageDelta {
                    file_count: -1,
                    total_bytes: -100,
                    ..UsageDelta::default()
                },
                "bootstrap",
            )
            .await
            .unwrap();
        assert_eq!(row.file_count, 0);
        assert_eq!(row.total_bytes, 0);
        assert_eq!(row.upload_count, 1);

        let err = service
            .correct(category, today, UsageDelta::default(), "bootstrap")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_query_rejects_inverted_range() {
        let service = UsageService::new(Arc::new(MemoryStore::new()));
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();
        assert!(service.query(today, yesterday, None).await.is_err());
    }
}
