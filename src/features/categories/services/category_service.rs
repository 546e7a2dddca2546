use std::sync::Arc;
use uuid::Uuid;

use crate::core::config::parse_type_list;
use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryChanges, NewCategory};
use crate::features::categories::repository::CategoryRepository;
use crate::features::settings::SettingsSnapshot;
use crate::shared::constants::ANY_FILE_TYPE;
use crate::shared::validation::{split_file_name, validate_category_name};

/// Service for storage categories and the upload type/size policy
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    snapshot: Arc<SettingsSnapshot>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, snapshot: Arc<SettingsSnapshot>) -> Self {
        Self { repo, snapshot }
    }

    pub async fn create(&self, category: NewCategory) -> Result<Category> {
        validate_category_name(&category.name)?;
        let category = NewCategory {
            allowed_file_types: normalize_types(&category.allowed_file_types),
            ..category
        };

        if self.repo.get_by_name(&category.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                category.name
            )));
        }

        let created = self.repo.create(category).await?;
        tracing::info!("Category created: {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Category> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Category> {
        self.repo
            .get_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", name)))
    }

    /// Category that can accept new content
    pub async fn get_active_by_name(&self, name: &str) -> Result<Category> {
        let category = self.get_by_name(name).await?;
        if !category.is_active {
            return Err(AppError::Validation(format!(
                "Category '{}' is inactive",
                name
            )));
        }
        Ok(category)
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        self.repo.list().await
    }

    /// Replace a category's fields. The name is frozen once anything references it.
    pub async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Category> {
        validate_category_name(&changes.name)?;
        let existing = self.get(id).await?;

        if existing.name != changes.name && self.repo.count_references(id).await? > 0 {
            return Err(AppError::Conflict(format!(
                "Category '{}' is in use and cannot be renamed",
                existing.name
            )));
        }

        let changes = CategoryChanges {
            allowed_file_types: normalize_types(&changes.allowed_file_types),
            ..changes
        };

        let updated = self
            .repo
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
        tracing::info!("Category updated: {} ({})", updated.name, updated.id);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let existing = self.get(id).await?;

        let references = self.repo.count_references(id).await?;
        if references > 0 {
            return Err(AppError::Conflict(format!(
                "Category '{}' is referenced by {} folders or files",
                existing.name, references
            )));
        }

        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }
        tracing::info!("Category deleted: {} ({})", existing.name, id);
        Ok(())
    }

    /// Check a file name against the category's list and the global list
    pub async fn validate_file_type(&self, file_name: &str, category_name: &str) -> Result<Category> {
        let category = self.get_active_by_name(category_name).await?;
        let (_, extension) = split_file_name(file_name);
        let extension = extension.as_deref();

        if !category.allows_extension(extension) {
            return Err(AppError::Validation(format!(
                "File type '{}' is not allowed in category '{}'",
                extension.unwrap_or(""),
                category.name
            )));
        }

        let settings = self.snapshot.get();
        if !settings.allows_any_type() {
            let allowed = extension
                .map(|ext| {
                    settings
                        .allowed_file_types
                        .iter()
                        .any(|t| t.eq_ignore_ascii_case(ext))
                })
                .unwrap_or(false);
            if !allowed {
                return Err(AppError::Validation(format!(
                    "File type '{}' is not allowed by the storage configuration",
                    extension.unwrap_or("")
                )));
            }
        }

        Ok(category)
    }

    /// Inclusive upper bound from the active settings
    pub fn validate_file_size(&self, size: i64) -> Result<()> {
        let settings = self.snapshot.get();
        if size > settings.max_file_size_bytes() {
            return Err(AppError::Validation(format!(
                "File size {} bytes exceeds the maximum of {} MB",
                size, settings.max_file_size_mb
            )));
        }
        Ok(())
    }
}

fn normalize_types(types: &[String]) -> Vec<String> {
    let normalized = parse_type_list(&types.join(","));
    if normalized.is_empty() {
        vec![ANY_FILE_TYPE.to_string()]
    } else {
        normalized
    }
}
