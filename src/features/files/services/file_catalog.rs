use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{FileFilter, FileRecord, NewFileRecord};
use crate::features::files::repository::FileRepository;
use crate::shared::types::PaginationQuery;
use crate::shared::validation::{join_path, split_file_name, validate_path_segment};

/// Upper bound on `name_N` candidates tried for one upload
const MAX_NAME_SUFFIX: u32 = 1000;

/// Canonical metadata for stored files
#[derive(Clone)]
pub struct FileCatalog {
    repo: Arc<dyn FileRepository>,
}

impl FileCatalog {
    pub fn new(repo: Arc<dyn FileRepository>) -> Self {
        Self { repo }
    }

    /// Any record by id, soft-deleted ones included
    pub async fn get(&self, id: Uuid) -> Result<FileRecord> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))
    }

    pub async fn get_active(&self, id: Uuid) -> Result<FileRecord> {
        let record = self.get(id).await?;
        if record.is_deleted {
            return Err(AppError::NotFound(format!("File {} not found", id)));
        }
        Ok(record)
    }

    pub async fn get_by_path(&self, stored_path: &str) -> Result<FileRecord> {
        self.repo
            .find_by_path(stored_path.trim_start_matches('/'))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No file at '{}'", stored_path)))
    }

    pub async fn get_by_url(&self, url: &str) -> Result<FileRecord> {
        self.repo
            .find_by_url(url)
            .await?
            .ok_or_else(|| AppError::NotFound("No file with this URL".to_string()))
    }

    pub async fn exists_path(&self, stored_path: &str) -> Result<bool> {
        Ok(self
            .repo
            .find_by_path(stored_path.trim_start_matches('/'))
            .await?
            .is_some())
    }

    pub async fn exists_url(&self, url: &str) -> Result<bool> {
        Ok(self.repo.find_by_url(url).await?.is_some())
    }

    pub async fn list(
        &self,
        filter: &FileFilter,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<FileRecord>, i64)> {
        self.repo
            .list(filter, pagination.limit(), pagination.offset())
            .await
    }

    /// Insert a record; the unique index backstops the existence check
    pub async fn register(&self, file: NewFileRecord) -> Result<FileRecord> {
        if self.exists_path(&file.stored_path).await? {
            return Err(AppError::Conflict(format!(
                "A file already exists at '{}'",
                file.stored_path
            )));
        }
        self.repo.insert(file).await
    }

    /// Mark deleted; false when it already was
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        self.repo.soft_delete(id).await
    }

    pub async fn record_access(&self, id: Uuid) -> Result<()> {
        self.repo.record_access(id).await
    }

    /// First free `(file name, stored path)` in a folder, suffixing the stem
    /// (`lease.pdf`, `lease_1.pdf`, `lease_2.pdf`, ...)
    pub async fn free_location(
        &self,
        category: &str,
        folder_path: &str,
        file_name: &str,
    ) -> Result<(String, String)> {
        for n in 0..MAX_NAME_SUFFIX {
            let candidate = if n == 0 {
                file_name.to_string()
            } else {
                suffixed_name(file_name, n)
            };
            let path = Self::stored_path(category, folder_path, &candidate);
            if !self.exists_path(&path).await? {
                return Ok((candidate, path));
            }
        }
        Err(AppError::Conflict(format!(
            "Too many files named '{}' in this folder",
            file_name
        )))
    }

    /// `<category>/<folder path>/<file name>`
    pub fn stored_path(category: &str, folder_path: &str, file_name: &str) -> String {
        join_path(&join_path(category, folder_path), file_name)
    }

    /// Name after a rename: the old extension is kept unless the new name has one
    pub fn rename_target(current: &str, requested: &str) -> Result<String> {
        validate_path_segment(requested, "File name")?;
        if split_file_name(requested).1.is_some() {
            return Ok(requested.to_string());
        }
        match current.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Ok(format!("{}.{}", requested, ext)),
            _ => Ok(requested.to_string()),
        }
    }
}

fn suffixed_name(file_name: &str, n: u32) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => format!("{}_{}.{}", stem, n, ext),
        _ => format!("{}_{}", file_name, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::memory_store::MemoryStore;

    fn new_record(path: &str) -> NewFileRecord {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        NewFileRecord {
            id: Uuid::new_v4(),
            stored_path: path.to_string(),
            file_name,
            content_type: "application/pdf".to_string(),
            file_size: 3,
            category_id: Uuid::new_v4(),
            folder_id: None,
            checksum: "abc".to_string(),
            uploaded_by: "tester".to_string(),
            url: format!("http://files.test/{}", path),
            related_entity: None,
        }
    }

    #[test]
    fn test_rename_target_keeps_extension() {
        assert_eq!(FileCatalog::rename_target("lease.pdf", "contract").unwrap(), "contract.pdf");
        assert_eq!(
            FileCatalog::rename_target("lease.pdf", "contract.docx").unwrap(),
            "contract.docx"
        );
        assert_eq!(FileCatalog::rename_target("README", "NOTES").unwrap(), "NOTES");
        assert!(FileCatalog::rename_target("lease.pdf", "../evil").is_err());
        assert!(FileCatalog::rename_target("lease.pdf", "").is_err());
    }

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("lease.pdf", 1), "lease_1.pdf");
        assert_eq!(suffixed_name("archive.tar.gz", 2), "archive.tar_2.gz");
        assert_eq!(suffixed_name("README", 3), "README_3");
    }

    #[tokio::test]
    async fn test_free_location_suffixes_collisions() {
        let catalog = FileCatalog::new(Arc::new(MemoryStore::new()));
        catalog.register(new_record("leases/2024/lease.pdf")).await.unwrap();
        catalog.register(new_record("leases/2024/lease_1.pdf")).await.unwrap();

        let (name, path) = catalog
            .free_location("leases", "2024", "lease.pdf")
            .await
            .unwrap();
        assert_eq!(name, "lease_2.pdf");
        assert_eq!(path, "leases/2024/lease_2.pdf");

        let (name, path) = catalog.free_location("leases", "", "lease.pdf").await.unwrap();
        assert_eq!(name, "lease.pdf");
        assert_eq!(path, "leases/lease.pdf");
    }

    #[test]
    fn test_stored_path_at_root_and_in_folders() {
        assert_eq!(FileCatalog::stored_path("documents", "", "lease.pdf"), "documents/lease.pdf");
        assert_eq!(
            FileCatalog::stored_path("documents", "leases", "lease.pdf"),
            "documents/leases/lease.pdf"
        );
        assert_eq!(
            FileCatalog::stored_path("documents", "leases/2024", "lease.pdf"),
            "documents/leases/2024/lease.pdf"
        );
    }

    #[tokio::test]
    async fn test_register_conflict_and_soft_delete() {
        let catalog = FileCatalog::new(Arc::new(MemoryStore::new()));
        let record = catalog.register(new_record("docs/a.pdf")).await.unwrap();

        let err = catalog.register(new_record("docs/a.pdf")).await.unwrap_err();
        assert!(err.is_conflict());

        assert!(catalog.soft_delete(record.id).await.unwrap());
        assert!(!catalog.soft_delete(record.id).await.unwrap());

        // Gone from lookups, still retrievable by id
        assert!(!catalog.exists_path("docs/a.pdf").await.unwrap());
        assert!(catalog.get(record.id).await.unwrap().is_deleted);
        assert!(catalog.get_active(record.id).await.is_err());

        // The path is free again
        catalog.register(new_record("docs/a.pdf")).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_access_increments() {
        let catalog = FileCatalog::new(Arc::new(MemoryStore::new()));
        let record = catalog.register(new_record("docs/b.pdf")).await.unwrap();
        catalog.record_access(record.id).await.unwrap();
        catalog.record_access(record.id).await.unwrap();
        let record = catalog.get(record.id).await.unwrap();
        assert_eq!(record.access_count, 2);
        assert!(record.last_accessed_at.is_some());
    }
}
