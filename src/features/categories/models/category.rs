use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::constants::ANY_FILE_TYPE;

/// Database model for a storage category
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    /// Also the top-level directory name on the primary backend
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub allowed_file_types: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Whether a (lowercase) extension is accepted; `None` only passes under "*"
    pub fn allows_extension(&self, extension: Option<&str>) -> bool {
        if self.allowed_file_types.iter().any(|t| t == ANY_FILE_TYPE) {
            return true;
        }
        match extension {
            Some(ext) => self
                .allowed_file_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub allowed_file_types: Vec<String>,
}

/// Full replacement of the mutable category fields
#[derive(Debug, Clone)]
pub struct CategoryChanges {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub allowed_file_types: Vec<String>,
    pub is_active: bool,
}
