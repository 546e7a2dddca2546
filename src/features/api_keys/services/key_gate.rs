use std::sync::Arc;

use crate::core::error::Result;
use crate::features::api_keys::models::ApiPrincipal;
use crate::features::api_keys::repository::ApiKeyRepository;
use crate::features::settings::SettingsSnapshot;

/// Decides whether a presented API key may use the storage API.
///
/// Sources are consulted in a fixed order: the bootstrap key from the
/// environment, the key on the active storage configuration, then the key
/// registry. The first two never touch the database.
pub struct KeyGate {
    bootstrap_key: Option<String>,
    snapshot: Arc<SettingsSnapshot>,
    repo: Arc<dyn ApiKeyRepository>,
}

impl KeyGate {
    pub fn new(
        bootstrap_key: Option<String>,
        snapshot: Arc<SettingsSnapshot>,
        repo: Arc<dyn ApiKeyRepository>,
    ) -> Self {
        Self {
            bootstrap_key,
            snapshot,
            repo,
        }
    }

    /// Resolve a key to a principal. `Ok(None)` means the key is unknown or
    /// revoked; an error means validation itself failed.
    pub async fn validate(&self, key: &str, used_by: &str) -> Result<Option<ApiPrincipal>> {
        if key.is_empty() {
            return Ok(None);
        }

        if self.bootstrap_key.as_deref() == Some(key) {
            return Ok(Some(ApiPrincipal::bootstrap()));
        }

        if self.snapshot.get().api_key.as_deref() == Some(key) {
            return Ok(Some(ApiPrincipal::configuration()));
        }

        let Some(registered) = self.repo.find_active_by_value(key).await? else {
            return Ok(None);
        };

        if let Err(e) = self.repo.record_usage(registered.id, used_by).await {
            tracing::warn!(
                "Failed to record usage for API key {}: {}",
                registered.id,
                e
            );
        }

        Ok(Some(ApiPrincipal::registered(registered.id, &registered.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::features::api_keys::models::KeySource;
    use crate::modules::memory_store::MemoryStore;
    use crate::shared::test_helpers::test_settings;

    fn gate(store: &Arc<MemoryStore>, config_key: Option<&str>) -> KeyGate {
        let mut settings = test_settings("/tmp/root");
        settings.api_key = config_key.map(|k| k.to_string());
        KeyGate::new(
            Some("bootstrap-secret".to_string()),
            Arc::new(SettingsSnapshot::new(settings)),
            store.clone(),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_key_needs_no_database() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let principal = gate(&store, None)
            .validate("bootstrap-secret", "tester")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.source, KeySource::Bootstrap);
    }

    #[tokio::test]
    async fn test_configuration_key_accepted() {
        let store = Arc::new(MemoryStore::new());
        let principal = gate(&store, Some("config-key-0123456789"))
            .validate("config-key-0123456789", "tester")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.source, KeySource::Configuration);
    }

    #[tokio::test]
    async fn test_registered_key_records_usage() {
        let store = Arc::new(MemoryStore::new());
        let key = store.create("tenant-portal", "registered-key").await.unwrap();

        let principal = gate(&store, None)
            .validate("registered-key", "10.0.0.7")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.key_id, Some(key.id));
        assert_eq!(principal.name, "key:tenant-portal");

        let stored = store.find_active_by_value("registered-key").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
        assert_eq!(stored.last_used_by.as_deref(), Some("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_usage_bookkeeping_failure_still_accepts_key() {
        let store = Arc::new(MemoryStore::new());
        let key = store.create("tenant-portal", "registered-key").await.unwrap();
        store.set_key_usage_failing(true);

        let principal = gate(&store, None)
            .validate("registered-key", "10.0.0.7")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.key_id, Some(key.id));
        assert_eq!(principal.source, KeySource::Registered);

        let stored = store.find_active_by_value("registered-key").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 0);
    }

    #[tokio::test]
    async fn test_revoked_and_unknown_keys_rejected() {
        let store = Arc::new(MemoryStore::new());
        let key = store.create("old", "revoked-key").await.unwrap();
        store.revoke(key.id).await.unwrap();

        let gate = gate(&store, None);
        assert!(gate.validate("revoked-key", "x").await.unwrap().is_none());
        assert!(gate.validate("nope", "x").await.unwrap().is_none());
        assert!(gate.validate("", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_registry_failure_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(&store, None);
        store.set_unavailable(true);
        let err = gate.validate("some-key", "x").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
