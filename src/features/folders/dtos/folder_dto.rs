use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::dtos::FileResponseDto;
use crate::features::folders::models::Folder;
use crate::features::folders::services::FolderListing;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FolderResponseDto {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    /// Path relative to the category root, e.g. `leases/2024`
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Folder> for FolderResponseDto {
    fn from(f: Folder) -> Self {
        Self {
            id: f.id,
            category_id: f.category_id,
            name: f.name,
            path: f.path,
            parent_id: f.parent_id,
            is_active: f.is_active,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderDto {
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    /// Parent folder path; "" creates at the category root
    #[serde(default)]
    pub parent_path: String,
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameFolderDto {
    #[validate(length(min = 1, max = 255, message = "new_name must be 1-255 characters"))]
    pub new_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveFolderDto {
    /// "" moves the folder to the category root
    #[serde(default)]
    pub new_parent_path: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListFoldersQuery {
    pub category: String,
    #[serde(default)]
    pub parent_path: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteFolderQuery {
    /// Also delete everything below the folder
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FolderListingDto {
    pub folders: Vec<FolderResponseDto>,
    pub files: Vec<FileResponseDto>,
}

impl From<FolderListing> for FolderListingDto {
    fn from(listing: FolderListing) -> Self {
        Self {
            folders: listing.folders.into_iter().map(Into::into).collect(),
            files: listing.files.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FolderSizeDto {
    pub folder_id: Uuid,
    pub total_bytes: i64,
}
