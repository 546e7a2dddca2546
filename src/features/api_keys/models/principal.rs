use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Which validation source accepted the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Key from the process environment
    Bootstrap,
    /// Key on the active storage configuration
    Configuration,
    /// Named key from the key registry
    Registered,
}

/// Caller identity attached to a request by the key gate
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiPrincipal {
    pub source: KeySource,
    /// Registry id for registered keys
    pub key_id: Option<Uuid>,
    /// Name used as the actor in audit records
    pub name: String,
}

impl ApiPrincipal {
    pub fn bootstrap() -> Self {
        Self {
            source: KeySource::Bootstrap,
            key_id: None,
            name: "bootstrap".to_string(),
        }
    }

    pub fn configuration() -> Self {
        Self {
            source: KeySource::Configuration,
            key_id: None,
            name: "configuration".to_string(),
        }
    }

    pub fn registered(key_id: Uuid, name: &str) -> Self {
        Self {
            source: KeySource::Registered,
            key_id: Some(key_id),
            name: format!("key:{}", name),
        }
    }

    pub fn is_bootstrap(&self) -> bool {
        self.source == KeySource::Bootstrap
    }
}
