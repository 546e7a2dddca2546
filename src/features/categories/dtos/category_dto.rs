use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::{Category, CategoryChanges, NewCategory};

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Lowercase extensions without dot, or "*"
    pub allowed_file_types: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            display_name: c.display_name,
            description: c.description,
            allowed_file_types: c.allowed_file_types,
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    /// Lowercase letters, digits and single hyphens
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "display_name must be 1-200 characters"))]
    pub display_name: String,
    pub description: Option<String>,
    /// Defaults to ["*"]
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
}

impl From<CreateCategoryDto> for NewCategory {
    fn from(dto: CreateCategoryDto) -> Self {
        Self {
            name: dto.name,
            display_name: dto.display_name,
            description: dto.description,
            allowed_file_types: dto.allowed_file_types,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "display_name must be 1-200 characters"))]
    pub display_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl From<UpdateCategoryDto> for CategoryChanges {
    fn from(dto: UpdateCategoryDto) -> Self {
        Self {
            name: dto.name,
            display_name: dto.display_name,
            description: dto.description,
            allowed_file_types: dto.allowed_file_types,
            is_active: dto.is_active,
        }
    }
}
