//! In-memory repositories for service tests.
//!
//! One store implements every repository trait and emulates the unique
//! indexes and transactional updates of the Postgres schema. Setting it
//! unavailable makes every call fail like a dropped connection pool.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access_logs::models::{AccessLogEntry, AccessLogFilter, NewAccessLog};
use crate::features::access_logs::repository::AccessLogRepository;
use crate::features::api_keys::models::ApiKey;
use crate::features::api_keys::repository::ApiKeyRepository;
use crate::features::categories::models::{Category, CategoryChanges, NewCategory};
use crate::features::categories::repository::CategoryRepository;
use crate::features::files::models::{BackupBlob, FileFilter, FileRecord, NewFileRecord};
use crate::features::files::repository::FileRepository;
use crate::features::folders::models::{Folder, NewFolder, SubtreeMove};
use crate::features::folders::repository::FolderRepository;
use crate::features::settings::models::{
    NewStorageSettings, StorageSettings, UpdateStorageSettings,
};
use crate::features::settings::repository::SettingsRepository;
use crate::features::usage::models::{UsageCounter, UsageDelta};
use crate::features::usage::repository::UsageRepository;

#[derive(Default)]
struct State {
    settings: Vec<StorageSettings>,
    api_keys: Vec<ApiKey>,
    categories: Vec<Category>,
    folders: Vec<Folder>,
    files: Vec<FileRecord>,
    backups: HashMap<Uuid, BackupBlob>,
    usage: HashMap<(NaiveDate, Uuid), UsageCounter>,
    access_logs: Vec<AccessLogEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    fail_subtree_move: AtomicBool,
    fail_backup_save: AtomicBool,
    fail_key_usage: AtomicBool,
}

fn in_subtree(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn below(path: &str, root: &str) -> bool {
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/'))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next subtree relocation fail without changing anything
    pub fn fail_next_subtree_move(&self) {
        self.fail_subtree_move.store(true, Ordering::SeqCst);
    }

    /// Make the next backup save fail without changing anything
    pub fn fail_next_backup(&self) {
        self.fail_backup_save.store(true, Ordering::SeqCst);
    }

    /// Make key usage bookkeeping fail while lookups keep working
    pub fn set_key_usage_failing(&self, failing: bool) {
        self.fail_key_usage.store(failing, Ordering::SeqCst);
    }

    /// Install `settings` as the only active row
    pub fn seed_settings(&self, settings: StorageSettings) -> StorageSettings {
        let mut state = self.state.lock();
        state.settings.iter_mut().for_each(|s| s.is_active = false);
        state.settings.push(settings.clone());
        settings
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn path_taken(state: &State, stored_path: &str, except: Option<Uuid>) -> bool {
        state
            .files
            .iter()
            .any(|f| !f.is_deleted && f.stored_path == stored_path && Some(f.id) != except)
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_active(&self) -> Result<Option<StorageSettings>> {
        self.check()?;
        Ok(self.state.lock().settings.iter().find(|s| s.is_active).cloned())
    }

    async fn insert_active(&self, settings: NewStorageSettings) -> Result<StorageSettings> {
        self.check()?;
        let mut state = self.state.lock();
        if state.settings.iter().any(|s| s.is_active) {
            return Err(AppError::Conflict(
                "An active storage configuration already exists".to_string(),
            ));
        }
        let row = StorageSettings {
            id: Uuid::new_v4(),
            base_url: settings.base_url,
            storage_root: settings.storage_root,
            max_file_size_mb: settings.max_file_size_mb,
            allowed_file_types: settings.allowed_file_types,
            enable_caching: settings.enable_caching,
            api_key: None,
            always_backup: settings.always_backup,
            is_active: true,
            updated_at: Utc::now(),
            updated_by: None,
        };
        state.settings.push(row.clone());
        Ok(row)
    }

    async fn update_active(
        &self,
        update: UpdateStorageSettings,
        updated_by: &str,
    ) -> Result<StorageSettings> {
        self.check()?;
        let mut state = self.state.lock();
        let row = state
            .settings
            .iter_mut()
            .find(|s| s.is_active)
            .ok_or_else(|| AppError::NotFound("No active storage configuration".to_string()))?;
        let base_changed = row.base_url != update.base_url;
        row.base_url = update.base_url;
        row.storage_root = update.storage_root;
        row.max_file_size_mb = update.max_file_size_mb;
        row.allowed_file_types = update.allowed_file_types;
        row.enable_caching = update.enable_caching;
        row.api_key = update.api_key;
        row.always_backup = update.always_backup;
        row.updated_at = Utc::now();
        row.updated_by = Some(updated_by.to_string());
        let updated = row.clone();

        if base_changed {
            for file in state.files.iter_mut() {
                file.url = updated.file_url(&file.stored_path);
            }
        }
        Ok(updated)
    }
}

// =============================================================================
// API KEYS
// =============================================================================

#[async_trait]
impl ApiKeyRepository for MemoryStore {
    async fn create(&self, name: &str, key_value: &str) -> Result<ApiKey> {
        self.check()?;
        let mut state = self.state.lock();
        if state.api_keys.iter().any(|k| k.key_value == key_value) {
            return Err(AppError::Conflict("API key already exists".to_string()));
        }
        let key = ApiKey {
            id: Uuid::new_v4(),
            name: name.to_string(),
            key_value: key_value.to_string(),
            is_active: true,
            last_used_at: None,
            last_used_by: None,
            usage_count: 0,
            created_at: Utc::now(),
            revoked_at: None,
        };
        state.api_keys.push(key.clone());
        Ok(key)
    }

    async fn list(&self) -> Result<Vec<ApiKey>> {
        self.check()?;
        Ok(self.state.lock().api_keys.iter().rev().cloned().collect())
    }

    async fn find_active_by_value(&self, key_value: &str) -> Result<Option<ApiKey>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .api_keys
            .iter()
            .find(|k| k.is_active && k.key_value == key_value)
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<Option<ApiKey>> {
        self.check()?;
        let mut state = self.state.lock();
        Ok(state.api_keys.iter_mut().find(|k| k.id == id).map(|k| {
            k.is_active = false;
            k.revoked_at.get_or_insert_with(Utc::now);
            k.clone()
        }))
    }

    async fn record_usage(&self, id: Uuid, used_by: &str) -> Result<()> {
        self.check()?;
        if self.fail_key_usage.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock();
        if let Some(k) = state.api_keys.iter_mut().find(|k| k.id == id) {
            k.last_used_at = Some(Utc::now());
            k.last_used_by = Some(used_by.to_string());
            k.usage_count += 1;
        }
        Ok(())
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: NewCategory) -> Result<Category> {
        self.check()?;
        let mut state = self.state.lock();
        if state.categories.iter().any(|c| c.name == category.name) {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                category.name
            )));
        }
        let now = Utc::now();
        let row = Category {
            id: Uuid::new_v4(),
            name: category.name,
            display_name: category.display_name,
            description: category.description,
            allowed_file_types: category.allowed_file_types,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.categories.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        self.check()?;
        Ok(self.state.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .categories
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        self.check()?;
        let mut categories = self.state.lock().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>> {
        self.check()?;
        let mut state = self.state.lock();
        if state
            .categories
            .iter()
            .any(|c| c.id != id && c.name == changes.name)
        {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                changes.name
            )));
        }
        Ok(state.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = changes.name;
            c.display_name = changes.display_name;
            c.description = changes.description;
            c.allowed_file_types = changes.allowed_file_types;
            c.is_active = changes.is_active;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut state = self.state.lock();
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        Ok(state.categories.len() < before)
    }

    async fn count_references(&self, id: Uuid) -> Result<i64> {
        self.check()?;
        let state = self.state.lock();
        let folders = state.folders.iter().filter(|f| f.category_id == id).count();
        let files = state.files.iter().filter(|f| f.category_id == id).count();
        Ok((folders + files) as i64)
    }
}

// =============================================================================
// FOLDERS
// =============================================================================

#[async_trait]
impl FolderRepository for MemoryStore {
    async fn create(&self, folder: NewFolder) -> Result<Folder> {
        self.check()?;
        let mut state = self.state.lock();
        if state.folders.iter().any(|f| {
            f.is_active && f.category_id == folder.category_id && f.path == folder.path
        }) {
            return Err(AppError::Conflict(format!(
                "Folder '{}' already exists",
                folder.path
            )));
        }
        let now = Utc::now();
        let row = Folder {
            id: Uuid::new_v4(),
            category_id: folder.category_id,
            name: folder.name,
            path: folder.path,
            parent_id: folder.parent_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.folders.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Folder>> {
        self.check()?;
        Ok(self.state.lock().folders.iter().find(|f| f.id == id).cloned())
    }

    async fn find_by_path(&self, category_id: Uuid, path: &str) -> Result<Option<Folder>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .folders
            .iter()
            .find(|f| f.is_active && f.category_id == category_id && f.path == path)
            .cloned())
    }

    async fn list_children(
        &self,
        category_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Folder>> {
        self.check()?;
        let mut children: Vec<Folder> = self
            .state
            .lock()
            .folders
            .iter()
            .filter(|f| f.is_active && f.category_id == category_id && f.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn list_subtree(&self, category_id: Uuid, path: &str) -> Result<Vec<Folder>> {
        self.check()?;
        let mut subtree: Vec<Folder> = self
            .state
            .lock()
            .folders
            .iter()
            .filter(|f| f.is_active && f.category_id == category_id && in_subtree(&f.path, path))
            .cloned()
            .collect();
        subtree.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(subtree)
    }

    async fn relocate_subtree(&self, change: SubtreeMove) -> Result<Folder> {
        self.check()?;
        if self.fail_subtree_move.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut state = self.state.lock();
        if !state
            .folders
            .iter()
            .any(|f| f.id == change.folder_id && f.is_active)
        {
            return Err(AppError::NotFound(format!(
                "Folder {} not found",
                change.folder_id
            )));
        }

        let rewrite = |path: &str, old: &str, new: &str| format!("{}{}", new, &path[old.len()..]);

        // Validate every unique index before touching anything
        let moved_folders: HashSet<Uuid> = state
            .folders
            .iter()
            .filter(|f| {
                f.is_active
                    && f.category_id == change.category_id
                    && in_subtree(&f.path, &change.old_path)
            })
            .map(|f| f.id)
            .collect();
        for folder in state.folders.iter().filter(|f| moved_folders.contains(&f.id)) {
            let new_path = rewrite(&folder.path, &change.old_path, &change.new_path);
            if state.folders.iter().any(|other| {
                other.is_active
                    && other.category_id == change.category_id
                    && !moved_folders.contains(&other.id)
                    && other.path == new_path
            }) {
                return Err(AppError::Conflict(format!(
                    "Folder '{}' already exists",
                    change.new_path
                )));
            }
        }

        let moved_files: HashSet<Uuid> = state
            .files
            .iter()
            .filter(|f| !f.is_deleted && below(&f.stored_path, &change.old_stored_prefix))
            .map(|f| f.id)
            .collect();
        for file in state.files.iter().filter(|f| moved_files.contains(&f.id)) {
            let new_path = rewrite(
                &file.stored_path,
                &change.old_stored_prefix,
                &change.new_stored_prefix,
            );
            if state.files.iter().any(|other| {
                !other.is_deleted && !moved_files.contains(&other.id) && other.stored_path == new_path
            }) {
                return Err(AppError::Conflict(format!(
                    "Folder '{}' already exists",
                    change.new_path
                )));
            }
        }

        let now = Utc::now();
        let mut updated = None;
        for folder in state
            .folders
            .iter_mut()
            .filter(|f| moved_folders.contains(&f.id))
        {
            folder.path = rewrite(&folder.path, &change.old_path, &change.new_path);
            folder.updated_at = now;
            if folder.id == change.folder_id {
                folder.name = change.new_name.clone();
                folder.parent_id = change.new_parent_id;
                updated = Some(folder.clone());
            }
        }

        let base_url = change.base_url.trim_end_matches('/');
        for file in state
            .files
            .iter_mut()
            .filter(|f| moved_files.contains(&f.id))
        {
            file.stored_path = rewrite(
                &file.stored_path,
                &change.old_stored_prefix,
                &change.new_stored_prefix,
            );
            file.url = format!("{}/{}", base_url, file.stored_path);
        }

        updated.ok_or_else(|| AppError::NotFound(format!("Folder {} not found", change.folder_id)))
    }

    async fn deactivate_subtree(&self, category_id: Uuid, path: &str) -> Result<u64> {
        self.check()?;
        let mut state = self.state.lock();
        let now = Utc::now();
        let mut changed = 0;
        for folder in state
            .folders
            .iter_mut()
            .filter(|f| f.is_active && f.category_id == category_id && in_subtree(&f.path, path))
        {
            folder.is_active = false;
            folder.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}

// =============================================================================
// FILES
// =============================================================================

#[async_trait]
impl FileRepository for MemoryStore {
    async fn insert(&self, file: NewFileRecord) -> Result<FileRecord> {
        self.check()?;
        let mut state = self.state.lock();
        if Self::path_taken(&state, &file.stored_path, None) {
            return Err(AppError::Conflict(format!(
                "A file already exists at '{}'",
                file.stored_path
            )));
        }
        if state.files.iter().any(|f| f.id == file.id) {
            return Err(AppError::Conflict(format!("File {} already exists", file.id)));
        }
        let row = FileRecord {
            id: file.id,
            stored_path: file.stored_path,
            file_name: file.file_name,
            content_type: file.content_type,
            file_size: file.file_size,
            category_id: file.category_id,
            folder_id: file.folder_id,
            checksum: file.checksum,
            uploaded_at: Utc::now(),
            uploaded_by: file.uploaded_by,
            last_accessed_at: None,
            access_count: 0,
            is_deleted: false,
            deleted_at: None,
            has_backup: false,
            url: file.url,
            related_entity_kind: file.related_entity.map(|e| e.kind.as_str().to_string()),
            related_entity_id: file.related_entity.map(|e| e.id),
        };
        state.files.push(row.clone());
        Ok(row)
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        state.files.retain(|f| f.id != id);
        state.backups.remove(&id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>> {
        self.check()?;
        Ok(self.state.lock().files.iter().find(|f| f.id == id).cloned())
    }

    async fn find_by_path(&self, stored_path: &str) -> Result<Option<FileRecord>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .find(|f| !f.is_deleted && f.stored_path == stored_path)
            .cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<FileRecord>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .find(|f| !f.is_deleted && f.url == url)
            .cloned())
    }

    async fn list(
        &self,
        filter: &FileFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileRecord>, i64)> {
        self.check()?;
        let state = self.state.lock();
        let matching: Vec<&FileRecord> = state
            .files
            .iter()
            .rev()
            .filter(|f| !f.is_deleted)
            .filter(|f| filter.category_id.is_none_or(|id| f.category_id == id))
            .filter(|f| filter.folder_id.is_none_or(|folder| f.folder_id == folder))
            .filter(|f| {
                filter
                    .related_entity
                    .is_none_or(|e| f.related_entity() == Some(e))
            })
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn list_in_folder(
        &self,
        category_id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Vec<FileRecord>> {
        self.check()?;
        let mut files: Vec<FileRecord> = self
            .state
            .lock()
            .files
            .iter()
            .filter(|f| !f.is_deleted && f.category_id == category_id && f.folder_id == folder_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }

    async fn sum_sizes_in_folder(&self, category_id: Uuid, folder_id: Option<Uuid>) -> Result<i64> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .filter(|f| !f.is_deleted && f.category_id == category_id && f.folder_id == folder_id)
            .map(|f| f.file_size)
            .sum())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut state = self.state.lock();
        match state.files.iter_mut().find(|f| f.id == id && !f.is_deleted) {
            Some(file) => {
                file.is_deleted = true;
                file.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn relocate(
        &self,
        id: Uuid,
        file_name: &str,
        folder_id: Option<Uuid>,
        stored_path: &str,
        url: &str,
    ) -> Result<Option<FileRecord>> {
        self.check()?;
        let mut state = self.state.lock();
        if Self::path_taken(&state, stored_path, Some(id)) {
            return Err(AppError::Conflict(format!(
                "A file already exists at '{}'",
                stored_path
            )));
        }
        Ok(state
            .files
            .iter_mut()
            .find(|f| f.id == id && !f.is_deleted)
            .map(|f| {
                f.file_name = file_name.to_string();
                f.folder_id = folder_id;
                f.stored_path = stored_path.to_string();
                f.url = url.to_string();
                f.clone()
            }))
    }

    async fn record_access(&self, id: Uuid) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        if let Some(f) = state.files.iter_mut().find(|f| f.id == id) {
            f.access_count += 1;
            f.last_accessed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn save_backup(
        &self,
        file_id: Uuid,
        content_base64: &str,
        mime_type: &str,
    ) -> Result<FileRecord> {
        self.check()?;
        if self.fail_backup_save.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock();
        let record = state
            .files
            .iter_mut()
            .find(|f| f.id == file_id && !f.is_deleted)
            .map(|f| {
                f.has_backup = true;
                f.clone()
            })
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
        state.backups.insert(
            file_id,
            BackupBlob {
                file_id,
                content_base64: content_base64.to_string(),
                mime_type: mime_type.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(record)
    }

    async fn get_backup(&self, file_id: Uuid) -> Result<Option<BackupBlob>> {
        self.check()?;
        Ok(self.state.lock().backups.get(&file_id).cloned())
    }

    async fn delete_backup(&self, file_id: Uuid) -> Result<bool> {
        self.check()?;
        let mut state = self.state.lock();
        if let Some(f) = state.files.iter_mut().find(|f| f.id == file_id) {
            f.has_backup = false;
        }
        Ok(state.backups.remove(&file_id).is_some())
    }
}

// =============================================================================
// USAGE
// =============================================================================

#[async_trait]
impl UsageRepository for MemoryStore {
    async fn record(
        &self,
        category_id: Uuid,
        date: NaiveDate,
        delta: UsageDelta,
    ) -> Result<UsageCounter> {
        self.check()?;
        let mut state = self.state.lock();
        let row = state
            .usage
            .entry((date, category_id))
            .or_insert_with(|| UsageCounter {
                usage_date: date,
                category_id,
                file_count: 0,
                total_bytes: 0,
                upload_count: 0,
                download_count: 0,
                delete_count: 0,
            });
        row.file_count += delta.file_count;
        row.total_bytes += delta.total_bytes;
        row.upload_count += delta.uploads;
        row.download_count += delta.downloads;
        row.delete_count += delta.deletes;
        Ok(row.clone())
    }

    async fn query(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        category_id: Option<Uuid>,
    ) -> Result<Vec<UsageCounter>> {
        self.check()?;
        let mut rows: Vec<UsageCounter> = self
            .state
            .lock()
            .usage
            .values()
            .filter(|r| r.usage_date >= from && r.usage_date <= to)
            .filter(|r| category_id.is_none_or(|id| r.category_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.usage_date
                .cmp(&b.usage_date)
                .then(a.category_id.cmp(&b.category_id))
        });
        Ok(rows)
    }
}

// =============================================================================
// ACCESS LOGS
// =============================================================================

#[async_trait]
impl AccessLogRepository for MemoryStore {
    async fn append(&self, entry: NewAccessLog) -> Result<()> {
        self.check()?;
        self.state.lock().access_logs.push(AccessLogEntry {
            id: Uuid::new_v4(),
            action: entry.action.as_str().to_string(),
            path: entry.path,
            actor: entry.actor,
            success: entry.success,
            error_message: entry.error_message,
            file_size: entry.file_size,
            duration_ms: entry.duration_ms,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn query(
        &self,
        filter: &AccessLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AccessLogEntry>, i64)> {
        self.check()?;
        let state = self.state.lock();
        let matching: Vec<&AccessLogEntry> = state
            .access_logs
            .iter()
            .rev()
            .filter(|e| filter.from.is_none_or(|from| e.created_at >= from))
            .filter(|e| filter.to.is_none_or(|to| e.created_at <= to))
            .filter(|e| filter.action.is_none_or(|a| e.action == a.as_str()))
            .filter(|e| filter.success.is_none_or(|s| e.success == s))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}
