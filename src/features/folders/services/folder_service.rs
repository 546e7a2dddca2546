use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access_logs::{AccessLogService, AuditAction};
use crate::features::categories::models::Category;
use crate::features::categories::CategoryService;
use crate::features::files::models::FileRecord;
use crate::features::files::repository::FileRepository;
use crate::features::files::services::FileStore;
use crate::features::folders::models::{Folder, NewFolder, SubtreeMove};
use crate::features::folders::repository::FolderRepository;
use crate::features::settings::SettingsSnapshot;
use crate::modules::storage::PrimaryBackend;
use crate::shared::validation::{join_path, normalize_folder_path, validate_path_segment};

/// Immediate contents of a folder (or category root)
pub struct FolderListing {
    pub folders: Vec<Folder>,
    pub files: Vec<FileRecord>,
}

/// Folder hierarchy per category
pub struct FolderService {
    folders: Arc<dyn FolderRepository>,
    files: Arc<dyn FileRepository>,
    categories: Arc<CategoryService>,
    store: Arc<FileStore>,
    backend: Arc<dyn PrimaryBackend>,
    snapshot: Arc<SettingsSnapshot>,
    audit: Arc<AccessLogService>,
}

impl FolderService {
    pub fn new(
        folders: Arc<dyn FolderRepository>,
        files: Arc<dyn FileRepository>,
        categories: Arc<CategoryService>,
        store: Arc<FileStore>,
        backend: Arc<dyn PrimaryBackend>,
        snapshot: Arc<SettingsSnapshot>,
        audit: Arc<AccessLogService>,
    ) -> Self {
        Self {
            folders,
            files,
            categories,
            store,
            backend,
            snapshot,
            audit,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Folder> {
        match self.folders.get(id).await? {
            Some(folder) if folder.is_active => Ok(folder),
            _ => Err(AppError::NotFound(format!("Folder {} not found", id))),
        }
    }

    pub async fn find_by_path(&self, category: &str, path: &str) -> Result<Folder> {
        let category = self.categories.get_by_name(category).await?;
        let path = normalize_folder_path(path)?;
        self.folders
            .find_by_path(category.id, &path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Folder '{}' not found", path)))
    }

    pub async fn create_folder(
        &self,
        category: &str,
        parent_path: &str,
        name: &str,
        actor: &str,
    ) -> Result<Folder> {
        let started = Instant::now();
        let parent_path = normalize_folder_path(parent_path)?;
        let path = join_path(&parent_path, name);

        let result = async {
            validate_path_segment(name, "Folder name")?;
            let category = self.categories.get_active_by_name(category).await?;
            let parent_id = self.resolve_parent(&category, &parent_path).await?;

            if self.folders.find_by_path(category.id, &path).await?.is_some() {
                return Err(AppError::Conflict(format!("Folder '{}' already exists", path)));
            }

            self.folders
                .create(NewFolder {
                    category_id: category.id,
                    name: name.to_string(),
                    path: path.clone(),
                    parent_id,
                })
                .await
        }
        .await;

        self.audit
            .record(
                AuditAction::CreateFolder,
                &join_path(category, &path),
                actor,
                &result,
                None,
                started,
            )
            .await;

        if let Ok(folder) = &result {
            info!("Folder created: {}/{}", category, folder.path);
        }
        result
    }

    pub async fn rename_folder(&self, id: Uuid, new_name: &str, actor: &str) -> Result<Folder> {
        let started = Instant::now();

        let result = async {
            validate_path_segment(new_name, "Folder name")?;
            let folder = self.get(id).await?;
            if folder.name == new_name {
                return Ok(folder);
            }

            let category = self.categories.get(folder.category_id).await?;
            let new_path = join_path(folder.parent_path(), new_name);
            self.relocate(&folder, &category, new_name, folder.parent_id, &new_path)
                .await
        }
        .await;

        self.audit_folder(AuditAction::RenameFolder, id, actor, &result, started)
            .await;
        result
    }

    /// Move under another folder of the same category ("" = category root)
    pub async fn move_folder(&self, id: Uuid, new_parent_path: &str, actor: &str) -> Result<Folder> {
        let started = Instant::now();

        let result = async {
            let folder = self.get(id).await?;
            let parent_path = normalize_folder_path(new_parent_path)?;

            if folder.contains_path(&parent_path) {
                return Err(AppError::Validation(
                    "A folder cannot be moved into itself or one of its descendants".to_string(),
                ));
            }

            let category = self.categories.get(folder.category_id).await?;
            let parent_id = self.resolve_parent(&category, &parent_path).await?;
            let new_path = join_path(&parent_path, &folder.name);
            if new_path == folder.path {
                return Ok(folder);
            }

            let name = folder.name.clone();
            self.relocate(&folder, &category, &name, parent_id, &new_path)
                .await
        }
        .await;

        self.audit_folder(AuditAction::MoveFolder, id, actor, &result, started)
            .await;
        result
    }

    /// Move the directory, then rewrite the catalog; the directory is moved
    /// back when the catalog transaction fails.
    async fn relocate(
        &self,
        folder: &Folder,
        category: &Category,
        new_name: &str,
        new_parent_id: Option<Uuid>,
        new_path: &str,
    ) -> Result<Folder> {
        if self
            .folders
            .find_by_path(category.id, new_path)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Folder '{}' already exists",
                new_path
            )));
        }

        let old_dir = join_path(&category.name, &folder.path);
        let new_dir = join_path(&category.name, new_path);
        let moved = self.backend.move_tree(&old_dir, &new_dir).await?;

        let change = SubtreeMove {
            folder_id: folder.id,
            category_id: category.id,
            new_name: new_name.to_string(),
            new_parent_id,
            old_path: folder.path.clone(),
            new_path: new_path.to_string(),
            old_stored_prefix: old_dir.clone(),
            new_stored_prefix: new_dir.clone(),
            base_url: self.snapshot.get().base_url.clone(),
        };

        match self.folders.relocate_subtree(change).await {
            Ok(updated) => {
                info!("Folder moved: {} -> {}", old_dir, new_dir);
                Ok(updated)
            }
            Err(e) => {
                if moved {
                    if let Err(undo) = self.backend.move_tree(&new_dir, &old_dir).await {
                        tracing::error!(
                            "Failed to move {} back to {} after catalog error: {}",
                            new_dir,
                            old_dir,
                            undo
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Delete a folder. Without `cascade` it must be empty; with it every
    /// active file below is deleted and every folder below deactivated.
    pub async fn delete_folder(&self, id: Uuid, cascade: bool, actor: &str) -> Result<Folder> {
        let started = Instant::now();

        let result = async {
            let folder = self.get(id).await?;
            let subtree = self.folders.list_subtree(folder.category_id, &folder.path).await?;

            let mut files = Vec::new();
            for member in &subtree {
                files.extend(
                    self.files
                        .list_in_folder(folder.category_id, Some(member.id))
                        .await?,
                );
            }

            if !cascade && (subtree.len() > 1 || !files.is_empty()) {
                return Err(AppError::Conflict(format!(
                    "Folder '{}' is not empty",
                    folder.path
                )));
            }

            for file in &files {
                self.store.delete(file.id, actor).await?;
            }

            let deactivated = self
                .folders
                .deactivate_subtree(folder.category_id, &folder.path)
                .await?;
            info!(
                "Folder deleted: {} ({} folders, {} files)",
                folder.path,
                deactivated,
                files.len()
            );

            Ok(Folder {
                is_active: false,
                ..folder
            })
        }
        .await;

        self.audit_folder(AuditAction::DeleteFolder, id, actor, &result, started)
            .await;
        result
    }

    /// Total size of active files at or below the folder
    pub async fn get_folder_size(&self, id: Uuid) -> Result<i64> {
        let folder = self.get(id).await?;

        let mut total = 0;
        let mut pending = vec![folder.id];
        while let Some(current) = pending.pop() {
            total += self
                .files
                .sum_sizes_in_folder(folder.category_id, Some(current))
                .await?;
            for child in self
                .folders
                .list_children(folder.category_id, Some(current))
                .await?
            {
                pending.push(child.id);
            }
        }
        Ok(total)
    }

    /// Immediate child folders and active files
    pub async fn list_children(&self, category: &str, parent_path: &str) -> Result<FolderListing> {
        let category = self.categories.get_by_name(category).await?;
        let parent_path = normalize_folder_path(parent_path)?;
        let parent_id = self.resolve_parent(&category, &parent_path).await?;

        Ok(FolderListing {
            folders: self.folders.list_children(category.id, parent_id).await?,
            files: self.files.list_in_folder(category.id, parent_id).await?,
        })
    }

    async fn resolve_parent(&self, category: &Category, parent_path: &str) -> Result<Option<Uuid>> {
        if parent_path.is_empty() {
            return Ok(None);
        }
        let parent = self
            .folders
            .find_by_path(category.id, parent_path)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Parent folder '{}' not found", parent_path))
            })?;
        Ok(Some(parent.id))
    }

    async fn audit_folder(
        &self,
        action: AuditAction,
        id: Uuid,
        actor: &str,
        result: &Result<Folder>,
        started: Instant,
    ) {
        let path = match result {
            Ok(folder) => folder.path.clone(),
            Err(e) => {
                warn!("{} failed for folder {}: {}", action.as_str(), id, e);
                id.to_string()
            }
        };
        self.audit
            .record(action, &path, actor, result, None, started)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::StorageHarness;

    #[tokio::test]
    async fn test_create_requires_parent_and_unique_path() {
        let h = StorageHarness::new().await;
        let leases = h.folders.create_folder("documents", "", "leases", "t").await.unwrap();
        assert_eq!(leases.path, "leases");
        assert!(leases.parent_id.is_none());

        let year = h
            .folders
            .create_folder("documents", "leases", "2024", "t")
            .await
            .unwrap();
        assert_eq!(year.path, "leases/2024");
        assert_eq!(year.parent_id, Some(leases.id));

        let err = h
            .folders
            .create_folder("documents", "leases", "2024", "t")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = h
            .folders
            .create_folder("documents", "missing", "x", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        for bad in ["", "a/b", "..", "a\\b"] {
            let err = h.folders.create_folder("documents", "", bad, "t").await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{:?}", bad);
        }

        // Same path in another category is fine
        h.folders.create_folder("leases", "", "leases", "t").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_rewrites_subtree_atomically() {
        let h = StorageHarness::new().await;
        let leases = h.folders.create_folder("documents", "", "leases", "t").await.unwrap();
        let year = h
            .folders
            .create_folder("documents", "leases", "2024", "t")
            .await
            .unwrap();
        let file = h
            .files
            .upload(h.request("documents", "leases/2024", "a.txt"), b"a".to_vec())
            .await
            .unwrap();

        let renamed = h.folders.rename_folder(leases.id, "contracts", "t").await.unwrap();
        assert_eq!(renamed.path, "contracts");

        let year = h.folders.get(year.id).await.unwrap();
        assert_eq!(year.path, "contracts/2024");

        let file = h.files.catalog().get(file.id).await.unwrap();
        assert_eq!(file.stored_path, "documents/contracts/2024/a.txt");
        assert_eq!(file.url, "http://files.test/documents/contracts/2024/a.txt");
        assert_eq!(h.files.read(file.id, "t").await.unwrap().data, b"a".to_vec());
        assert!(!h.root().join("documents/leases").exists());
    }

    #[tokio::test]
    async fn test_rename_to_existing_name_conflicts() {
        let h = StorageHarness::new().await;
        let a = h.folders.create_folder("documents", "", "a", "t").await.unwrap();
        h.folders.create_folder("documents", "", "b", "t").await.unwrap();
        h.files
            .upload(h.request("documents", "a", "x.txt"), b"x".to_vec())
            .await
            .unwrap();

        let err = h.folders.rename_folder(a.id, "b", "t").await.unwrap_err();
        assert!(err.is_conflict());
        assert!(h.root().join("documents/a/x.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_catalog_rewrite_moves_directory_back() {
        let h = StorageHarness::new().await;
        let a = h.folders.create_folder("documents", "", "a", "t").await.unwrap();
        h.files
            .upload(h.request("documents", "a", "x.txt"), b"x".to_vec())
            .await
            .unwrap();

        h.store.fail_next_subtree_move();

        assert!(h.folders.rename_folder(a.id, "renamed", "t").await.is_err());
        assert!(h.root().join("documents/a/x.txt").exists());
        assert!(!h.root().join("documents/renamed").exists());
        assert_eq!(h.folders.get(a.id).await.unwrap().path, "a");
    }

    #[tokio::test]
    async fn test_move_cycle_guard_and_conflict() {
        let h = StorageHarness::new().await;
        let a = h.folders.create_folder("documents", "", "a", "t").await.unwrap();
        h.folders.create_folder("documents", "a", "b", "t").await.unwrap();
        let c = h.folders.create_folder("documents", "", "c", "t").await.unwrap();
        h.folders.create_folder("documents", "c", "a", "t").await.unwrap();

        for target in ["a", "a/b"] {
            let err = h.folders.move_folder(a.id, target, "t").await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}", target);
        }

        let err = h.folders.move_folder(a.id, "c", "t").await.unwrap_err();
        assert!(err.is_conflict());

        let moved = h.folders.move_folder(c.id, "a/b", "t").await.unwrap();
        assert_eq!(moved.path, "a/b/c");
        let nested = h.folders.find_by_path("documents", "a/b/c/a").await.unwrap();
        assert_eq!(nested.name, "a");

        let back = h.folders.move_folder(c.id, "", "t").await.unwrap();
        assert_eq!(back.path, "c");
        assert!(back.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_requires_empty_unless_cascade() {
        let h = StorageHarness::new().await;
        let a = h.folders.create_folder("documents", "", "a", "t").await.unwrap();
        h.folders.create_folder("documents", "a", "b", "t").await.unwrap();
        let file = h
            .files
            .upload(h.request("documents", "a/b", "x.txt"), b"x".to_vec())
            .await
            .unwrap();

        let err = h.folders.delete_folder(a.id, false, "t").await.unwrap_err();
        assert!(err.is_conflict());

        h.folders.delete_folder(a.id, true, "t").await.unwrap();
        assert!(h.files.catalog().get(file.id).await.unwrap().is_deleted);
        assert!(!h.root().join("documents/a/b/x.txt").exists());
        assert!(h.folders.get(a.id).await.is_err());
        assert!(h.folders.find_by_path("documents", "a/b").await.is_err());

        // Name is reusable afterwards
        h.folders.create_folder("documents", "", "a", "t").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_empty_folder() {
        let h = StorageHarness::new().await;
        let a = h.folders.create_folder("documents", "", "empty", "t").await.unwrap();
        let deleted = h.folders.delete_folder(a.id, false, "t").await.unwrap();
        assert!(!deleted.is_active);
    }

    #[tokio::test]
    async fn test_folder_size_is_recursive() {
        let h = StorageHarness::new().await;
        let a = h.folders.create_folder("documents", "", "a", "t").await.unwrap();
        h.folders.create_folder("documents", "a", "b", "t").await.unwrap();
        h.files
            .upload(h.request("documents", "a", "one.txt"), vec![0u8; 10])
            .await
            .unwrap();
        let deep = h
            .files
            .upload(h.request("documents", "a/b", "two.txt"), vec![0u8; 32])
            .await
            .unwrap();
        h.files
            .upload(h.request("documents", "", "outside.txt"), vec![0u8; 100])
            .await
            .unwrap();

        assert_eq!(h.folders.get_folder_size(a.id).await.unwrap(), 42);

        h.files.delete(deep.id, "t").await.unwrap();
        assert_eq!(h.folders.get_folder_size(a.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_list_children_is_shallow() {
        let h = StorageHarness::new().await;
        h.folders.create_folder("documents", "", "a", "t").await.unwrap();
        h.folders.create_folder("documents", "a", "b", "t").await.unwrap();
        h.files
            .upload(h.request("documents", "", "root.txt"), b"r".to_vec())
            .await
            .unwrap();
        h.files
            .upload(h.request("documents", "a", "inner.txt"), b"i".to_vec())
            .await
            .unwrap();

        let root = h.folders.list_children("documents", "").await.unwrap();
        assert_eq!(root.folders.len(), 1);
        assert_eq!(root.files.len(), 1);
        assert_eq!(root.files[0].file_name, "root.txt");

        let inner = h.folders.list_children("documents", "a").await.unwrap();
        assert_eq!(inner.folders[0].path, "a/b");
        assert_eq!(inner.files[0].file_name, "inner.txt");
    }
}
