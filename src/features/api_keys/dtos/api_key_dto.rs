use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::api_keys::models::ApiKey;

/// Registered key as shown in listings; the value is masked
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponseDto {
    pub id: Uuid,
    pub name: String,
    /// Last four characters of the key, e.g. "****9f3a"
    pub masked_key: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_used_by: Option<String>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyResponseDto {
    fn from(key: ApiKey) -> Self {
        Self {
            masked_key: key.masked_value(),
            id: key.id,
            name: key.name,
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            last_used_by: key.last_used_by,
            usage_count: key.usage_count,
            created_at: key.created_at,
            revoked_at: key.revoked_at,
        }
    }
}

/// Response for a newly created key; the only time the full value is returned
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedApiKeyDto {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for CreatedApiKeyDto {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key: key.key_value,
            created_at: key.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateApiKeyDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
}
