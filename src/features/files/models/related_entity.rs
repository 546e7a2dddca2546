use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;

/// Kinds of business entity a file can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Property,
    Tenant,
    Owner,
    Beneficiary,
    Vendor,
    Payment,
    Inspection,
    Maintenance,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Property => "property",
            EntityKind::Tenant => "tenant",
            EntityKind::Owner => "owner",
            EntityKind::Beneficiary => "beneficiary",
            EntityKind::Vendor => "vendor",
            EntityKind::Payment => "payment",
            EntityKind::Inspection => "inspection",
            EntityKind::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "property" => Ok(EntityKind::Property),
            "tenant" => Ok(EntityKind::Tenant),
            "owner" => Ok(EntityKind::Owner),
            "beneficiary" => Ok(EntityKind::Beneficiary),
            "vendor" => Ok(EntityKind::Vendor),
            "payment" => Ok(EntityKind::Payment),
            "inspection" => Ok(EntityKind::Inspection),
            "maintenance" => Ok(EntityKind::Maintenance),
            other => Err(AppError::Validation(format!(
                "Unknown related entity kind '{}'",
                other
            ))),
        }
    }
}

/// The business entity a file belongs to, e.g. `{"kind": "tenant", "id": "…"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelatedEntity {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl RelatedEntity {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    /// Rebuild from the stored column pair; both must be present
    pub fn from_columns(kind: Option<&str>, id: Option<Uuid>) -> Option<Self> {
        match (kind, id) {
            (Some(kind), Some(id)) => kind.parse().ok().map(|kind| Self { kind, id }),
            _ => None,
        }
    }

    /// Build from optional request fields; exactly one of them is an error
    pub fn from_parts(kind: Option<&str>, id: Option<&str>) -> Result<Option<Self>, AppError> {
        let kind = kind.map(str::trim).filter(|s| !s.is_empty());
        let id = id.map(str::trim).filter(|s| !s.is_empty());
        match (kind, id) {
            (None, None) => Ok(None),
            (Some(kind), Some(id)) => {
                let id = Uuid::parse_str(id).map_err(|_| {
                    AppError::Validation(format!("Invalid related entity id '{}'", id))
                })?;
                Ok(Some(Self::new(kind.parse()?, id)))
            }
            _ => Err(AppError::Validation(
                "related_kind and related_id must be given together".to_string(),
            )),
        }
    }
}
