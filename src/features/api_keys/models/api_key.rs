use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Named, individually revocable API key
#[derive(Debug, Clone, FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub name: String,
    pub key_value: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_used_by: Option<String>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Key value with everything but the last four characters hidden
    pub fn masked_value(&self) -> String {
        let visible: String = self
            .key_value
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}
