//! Primary backend plus database backup, behind the file catalog
//!
//! A file is in one of three states: bytes on the primary backend only, on
//! both the primary and in a backup blob, or in the backup blob only (after
//! the primary copy was lost). Reads fall back to the backup transparently.

use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access_logs::{AccessLogService, AuditAction};
use crate::features::categories::CategoryService;
use crate::features::files::models::{
    BackupBlob, FileFilter, FileRecord, NewFileRecord, RelatedEntity, StorageState,
};
use crate::features::files::repository::FileRepository;
use crate::features::files::services::{FileCatalog, FileLocks};
use crate::features::folders::repository::FolderRepository;
use crate::features::settings::models::StorageSettings;
use crate::features::settings::SettingsSnapshot;
use crate::features::usage::UsageService;
use crate::modules::storage::{IntegrityVerifier, PrimaryBackend};
use crate::shared::constants::STAGING_DIR;
use crate::shared::types::PaginationQuery;
use crate::shared::validation::{join_path, normalize_folder_path, validate_path_segment};

/// Conflicting inserts tolerated before an upload gives up
const MAX_REGISTER_ATTEMPTS: usize = 32;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Everything about an upload except the bytes
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    /// Guessed from the file name when absent
    pub content_type: Option<String>,
    pub category: String,
    /// Folder path relative to the category root ("" = root)
    pub folder: String,
    pub with_backup: bool,
    pub related_entity: Option<RelatedEntity>,
    pub uploaded_by: String,
}

/// Backend that produced a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Primary,
    Backup,
}

impl ServedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedFrom::Primary => "primary",
            ServedFrom::Backup => "backup",
        }
    }
}

#[derive(Debug)]
pub struct FileContent {
    pub record: FileRecord,
    pub data: Vec<u8>,
    pub served_from: ServedFrom,
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub file_id: Uuid,
    pub expected: String,
    pub actual: String,
    pub matches: bool,
}

pub struct FileStore {
    backend: Arc<dyn PrimaryBackend>,
    files: Arc<dyn FileRepository>,
    catalog: FileCatalog,
    folders: Arc<dyn FolderRepository>,
    categories: Arc<CategoryService>,
    snapshot: Arc<SettingsSnapshot>,
    usage: Arc<UsageService>,
    audit: Arc<AccessLogService>,
    locks: FileLocks,
}

impl FileStore {
    pub fn new(
        backend: Arc<dyn PrimaryBackend>,
        files: Arc<dyn FileRepository>,
        folders: Arc<dyn FolderRepository>,
        categories: Arc<CategoryService>,
        snapshot: Arc<SettingsSnapshot>,
        usage: Arc<UsageService>,
        audit: Arc<AccessLogService>,
    ) -> Self {
        Self {
            catalog: FileCatalog::new(Arc::clone(&files)),
            backend,
            files,
            folders,
            categories,
            snapshot,
            usage,
            audit,
            locks: FileLocks::new(),
        }
    }

    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    // =========================================================================
    // UPLOAD
    // =========================================================================

    /// Validate, register and store a file held in memory
    pub async fn upload(&self, request: UploadRequest, data: Vec<u8>) -> Result<FileRecord> {
        let started = Instant::now();
        let size = data.len() as i64;

        let result = self.upload_inner(&request, &data).await;

        let path = match &result {
            Ok(record) => record.stored_path.clone(),
            Err(_) => FileCatalog::stored_path(&request.category, &request.folder, &request.file_name),
        };
        self.audit
            .record(AuditAction::Upload, &path, &request.uploaded_by, &result, Some(size), started)
            .await;

        if let Ok(record) = &result {
            self.usage.record_upload(record.category_id, size).await;
            info!(
                "Uploaded {} ({} bytes, backup={})",
                record.stored_path, size, record.has_backup
            );
        }
        result
    }

    /// Upload from a byte stream, capped at the configured maximum size
    pub async fn upload_stream<S, B, E>(&self, request: UploadRequest, stream: S) -> Result<FileRecord>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let settings = self.snapshot.get();
        let limit = usize::try_from(settings.max_file_size_bytes()).unwrap_or(usize::MAX);

        let mut stream = std::pin::pin!(stream);
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Failed to read upload body: {}", e)))?;
            let chunk = chunk.as_ref();
            if data.len() + chunk.len() > limit {
                return Err(AppError::Validation(format!(
                    "File size exceeds the maximum of {} MB",
                    settings.max_file_size_mb
                )));
            }
            data.extend_from_slice(chunk);
        }

        self.upload(request, data).await
    }

    async fn upload_inner(&self, request: &UploadRequest, data: &[u8]) -> Result<FileRecord> {
        validate_path_segment(&request.file_name, "File name")?;
        let category = self
            .categories
            .validate_file_type(&request.file_name, &request.category)
            .await?;
        self.categories.validate_file_size(data.len() as i64)?;

        let folder_path = normalize_folder_path(&request.folder)?;
        let folder_id = self.resolve_folder(category.id, &folder_path).await?;

        let content_type = request
            .content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| guess_content_type(&request.file_name));
        let settings = self.snapshot.get();

        // Readers that find the row before its bytes wait on this lock
        let id = Uuid::new_v4();
        let _lock = self.locks.acquire(id).await;

        let staged = staging_key();
        self.backend.put(&staged, data).await?;

        let upload = StagedUpload {
            catalog: self.catalog.clone(),
            files: Arc::clone(&self.files),
            backend: Arc::clone(&self.backend),
            staged,
            category: category.name.clone(),
            folder_path,
            file_name: request.file_name.clone(),
            base: NewFileRecord {
                id,
                stored_path: String::new(),
                file_name: String::new(),
                content_type,
                file_size: data.len() as i64,
                category_id: category.id,
                folder_id,
                checksum: IntegrityVerifier::compute(data),
                uploaded_by: request.uploaded_by.clone(),
                url: String::new(),
                related_entity: request.related_entity,
            },
            backup: (request.with_backup || settings.always_backup)
                .then(|| BackupBlob::encode(data)),
            settings,
        };
        run_detached(upload.commit()).await
    }

    async fn resolve_folder(&self, category_id: Uuid, folder_path: &str) -> Result<Option<Uuid>> {
        if folder_path.is_empty() {
            return Ok(None);
        }
        let folder = self
            .folders
            .find_by_path(category_id, folder_path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Folder '{}' not found", folder_path)))?;
        Ok(Some(folder.id))
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub async fn read(&self, id: Uuid, actor: &str) -> Result<FileContent> {
        let started = Instant::now();
        let result = self.read_inner(id).await;

        let (path, size) = match &result {
            Ok(content) => (content.record.stored_path.clone(), Some(content.record.file_size)),
            Err(_) => (id.to_string(), None),
        };
        self.audit
            .record(AuditAction::Download, &path, actor, &result, size, started)
            .await;

        if let Ok(content) = &result {
            self.usage.record_download(content.record.category_id).await;
        }
        result
    }

    pub async fn read_by_url(&self, url: &str, actor: &str) -> Result<FileContent> {
        let record = self.catalog.get_by_url(url).await?;
        self.read(record.id, actor).await
    }

    async fn read_inner(&self, id: Uuid) -> Result<FileContent> {
        let record = self.catalog.get_active(id).await?;

        let (record, (data, served_from)) = match self.load(&record).await? {
            Some(loaded) => (record, loaded),
            None => {
                // An upload or rename of this file may still be publishing
                let _lock = self.locks.acquire(id).await;
                let record = self.catalog.get_active(id).await?;
                let loaded = self.load(&record).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Content of file {} is missing", id))
                })?;
                (record, loaded)
            }
        };

        if let Err(e) = self.catalog.record_access(record.id).await {
            warn!("Failed to record access for file {}: {}", record.id, e);
        }

        Ok(FileContent {
            record,
            data,
            served_from,
        })
    }

    /// Primary bytes, else the backup. A primary error surfaces only when
    /// there is no backup to fall back to.
    async fn load(&self, record: &FileRecord) -> Result<Option<(Vec<u8>, ServedFrom)>> {
        let primary_error = match self.backend.get(&record.stored_path).await {
            Ok(Some(data)) => return Ok(Some((data, ServedFrom::Primary))),
            Ok(None) => None,
            Err(e) => {
                warn!("Primary read failed for {}: {}", record.stored_path, e);
                Some(e)
            }
        };

        match self.read_backup(record).await? {
            Some(data) => {
                info!("Served {} from backup", record.stored_path);
                Ok(Some((data, ServedFrom::Backup)))
            }
            None => match primary_error {
                Some(e) => Err(e),
                None => Ok(None),
            },
        }
    }

    async fn read_backup(&self, record: &FileRecord) -> Result<Option<Vec<u8>>> {
        if !record.has_backup {
            return Ok(None);
        }
        match self.files.get_backup(record.id).await? {
            Some(blob) => Ok(Some(blob.decode()?)),
            None => Ok(None),
        }
    }

    /// Where the bytes of an active file currently live; `None` when lost
    pub async fn storage_state(&self, record: &FileRecord) -> Result<Option<StorageState>> {
        let on_primary = self.backend.exists(&record.stored_path).await?;
        Ok(match (on_primary, record.has_backup) {
            (true, false) => Some(StorageState::PrimaryOnly),
            (true, true) => Some(StorageState::Both),
            (false, true) => Some(StorageState::BackupOnly),
            (false, false) => None,
        })
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Remove bytes and backup, then soft-delete. Deleting twice is a no-op.
    pub async fn delete(&self, id: Uuid, actor: &str) -> Result<FileRecord> {
        let _lock = self.locks.acquire(id).await;

        let record = self.catalog.get(id).await?;
        if record.is_deleted {
            debug!("File {} already deleted", id);
            return Ok(record);
        }

        let started = Instant::now();
        let result = self.delete_locked(&record).await;
        self.audit
            .record(
                AuditAction::Delete,
                &record.stored_path,
                actor,
                &result,
                Some(record.file_size),
                started,
            )
            .await;

        if result.is_ok() {
            self.usage.record_delete(record.category_id).await;
            info!("Deleted {}", record.stored_path);
        }
        result
    }

    pub async fn delete_by_url(&self, url: &str, actor: &str) -> Result<FileRecord> {
        let record = self.catalog.get_by_url(url).await?;
        self.delete(record.id, actor).await
    }

    async fn delete_locked(&self, record: &FileRecord) -> Result<FileRecord> {
        if !self.backend.delete(&record.stored_path).await? {
            debug!("No primary bytes for {}", record.stored_path);
        }
        self.files.delete_backup(record.id).await?;
        self.catalog.soft_delete(record.id).await?;
        self.catalog.get(record.id).await
    }

    // =========================================================================
    // RENAME / MOVE
    // =========================================================================

    pub async fn rename(&self, id: Uuid, new_name: &str, actor: &str) -> Result<FileRecord> {
        let _lock = self.locks.acquire(id).await;
        let started = Instant::now();

        let result = async {
            let record = self.catalog.get_active(id).await?;
            let target = FileCatalog::rename_target(&record.file_name, new_name)?;
            if target == record.file_name {
                return Ok(record);
            }

            let category = self.categories.get(record.category_id).await?;
            self.categories
                .validate_file_type(&target, &category.name)
                .await?;

            let new_path = join_path(record.directory(), &target);
            self.relocate(&record, &target, record.folder_id, &new_path)
                .await
        }
        .await;

        self.audit_relocation(AuditAction::Rename, id, actor, &result, started)
            .await;
        result
    }

    /// Move into another folder of the same category ("" = category root)
    pub async fn move_file(&self, id: Uuid, folder: &str, actor: &str) -> Result<FileRecord> {
        let _lock = self.locks.acquire(id).await;
        let started = Instant::now();

        let result = async {
            let record = self.catalog.get_active(id).await?;
            let category = self.categories.get(record.category_id).await?;
            let folder_path = normalize_folder_path(folder)?;
            let folder_id = self.resolve_folder(category.id, &folder_path).await?;

            let new_path = FileCatalog::stored_path(&category.name, &folder_path, &record.file_name);
            if new_path == record.stored_path {
                return Ok(record);
            }
            self.relocate(&record, &record.file_name, folder_id, &new_path)
                .await
        }
        .await;

        self.audit_relocation(AuditAction::Move, id, actor, &result, started)
            .await;
        result
    }

    /// Stage a copy of the bytes, repoint the catalog, publish the copy, drop
    /// the old bytes. The catalog update claims the new path under the unique
    /// index before anything is written there, so a concurrent upload can
    /// never be overwritten. The original stays intact on any failure.
    async fn relocate(
        &self,
        record: &FileRecord,
        file_name: &str,
        folder_id: Option<Uuid>,
        new_path: &str,
    ) -> Result<FileRecord> {
        if self.catalog.exists_path(new_path).await? {
            return Err(AppError::Conflict(format!(
                "A file already exists at '{}'",
                new_path
            )));
        }

        // Nothing to copy for backup-only files
        let staged = staging_key();
        let copied = self.backend.copy(&record.stored_path, &staged).await?;

        let files = Arc::clone(&self.files);
        let backend = Arc::clone(&self.backend);
        let original = record.clone();
        let file_name = file_name.to_string();
        let new_path = new_path.to_string();
        let url = self.snapshot.get().file_url(&new_path);

        run_detached(async move {
            let updated = files
                .relocate(original.id, &file_name, folder_id, &new_path, &url)
                .await
                .and_then(|r| {
                    r.ok_or_else(|| AppError::NotFound(format!("File {} not found", original.id)))
                });
            let updated = match updated {
                Ok(updated) => updated,
                Err(e) => {
                    if copied {
                        discard_staged(backend.as_ref(), &staged).await;
                    }
                    return Err(e);
                }
            };

            if !copied {
                return Ok(updated);
            }

            if let Err(e) = publish_staged(backend.as_ref(), &staged, &new_path).await {
                if let Err(revert) = files
                    .relocate(
                        original.id,
                        &original.file_name,
                        original.folder_id,
                        &original.stored_path,
                        &original.url,
                    )
                    .await
                {
                    error!(
                        "Failed to restore catalog entry {} after publish failure: {}",
                        original.id, revert
                    );
                }
                discard_staged(backend.as_ref(), &staged).await;
                return Err(e);
            }

            if let Err(e) = backend.delete(&original.stored_path).await {
                warn!("Left orphaned bytes at {}: {}", original.stored_path, e);
            }
            Ok(updated)
        })
        .await
    }

    async fn audit_relocation(
        &self,
        action: AuditAction,
        id: Uuid,
        actor: &str,
        result: &Result<FileRecord>,
        started: Instant,
    ) {
        let path = match result {
            Ok(record) => record.stored_path.clone(),
            Err(_) => id.to_string(),
        };
        self.audit
            .record(action, &path, actor, result, None, started)
            .await;
    }

    // =========================================================================
    // BACKUP
    // =========================================================================

    /// Copy the primary bytes into a backup blob; no-op when one exists
    pub async fn migrate_to_backup(&self, id: Uuid, actor: &str) -> Result<FileRecord> {
        let _lock = self.locks.acquire(id).await;

        let record = self.catalog.get_active(id).await?;
        if record.has_backup {
            return Ok(record);
        }

        let started = Instant::now();
        let result = async {
            let data = self
                .backend
                .get(&record.stored_path)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Primary content of file {} is missing", id))
                })?;
            self.files
                .save_backup(id, &BackupBlob::encode(&data), &record.content_type)
                .await
        }
        .await;

        self.audit
            .record(
                AuditAction::MigrateToBackup,
                &record.stored_path,
                actor,
                &result,
                Some(record.file_size),
                started,
            )
            .await;
        result
    }

    /// Write the backup bytes back to the primary backend
    pub async fn restore_from_backup(&self, id: Uuid, actor: &str) -> Result<FileRecord> {
        let _lock = self.locks.acquire(id).await;
        let started = Instant::now();

        let record = self.catalog.get_active(id).await?;
        let result = async {
            let blob = self
                .files
                .get_backup(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("File {} has no backup", id)))?;
            let data = blob.decode()?;

            if IntegrityVerifier::compute(&data) != record.checksum {
                return Err(AppError::Integrity(format!(
                    "Backup of file {} does not match its checksum",
                    id
                )));
            }

            self.backend.put(&record.stored_path, &data).await?;
            Ok(record.clone())
        }
        .await;

        self.audit
            .record(
                AuditAction::RestoreFromBackup,
                &record.stored_path,
                actor,
                &result,
                Some(record.file_size),
                started,
            )
            .await;

        if result.is_ok() {
            info!("Restored {} from backup", record.stored_path);
        }
        result
    }

    // =========================================================================
    // LISTING
    // =========================================================================

    /// List active files by category name and folder path. A folder without a
    /// category is rejected since folder paths are per category.
    pub async fn list(
        &self,
        category: Option<&str>,
        folder: Option<&str>,
        related_entity: Option<RelatedEntity>,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<FileRecord>, i64)> {
        let mut filter = FileFilter {
            related_entity,
            ..FileFilter::default()
        };

        match (category, folder) {
            (None, Some(_)) => {
                return Err(AppError::Validation(
                    "folder filter requires a category".to_string(),
                ))
            }
            (Some(name), folder) => {
                let category = self.categories.get_by_name(name).await?;
                filter.category_id = Some(category.id);
                if let Some(folder) = folder {
                    let path = normalize_folder_path(folder)?;
                    filter.folder_id = Some(self.resolve_folder(category.id, &path).await?);
                }
            }
            (None, None) => {}
        }

        self.catalog.list(&filter, pagination).await
    }

    // =========================================================================
    // INTEGRITY
    // =========================================================================

    /// Checksum of whatever the primary backend holds at `path`
    pub async fn checksum_of(&self, path: &str) -> Result<Option<String>> {
        self.backend.checksum(path.trim_start_matches('/')).await
    }

    /// Compare the primary bytes against the catalog checksum. A mismatch is
    /// reported and logged, never corrected.
    pub async fn verify(&self, id: Uuid, actor: &str) -> Result<VerifyReport> {
        let started = Instant::now();
        let record = self.catalog.get_active(id).await?;

        let actual = self.checksum_of(&record.stored_path).await?.ok_or_else(|| {
            AppError::NotFound(format!("Primary content of file {} is missing", id))
        })?;

        let report = VerifyReport {
            file_id: id,
            matches: actual == record.checksum,
            expected: record.checksum.clone(),
            actual,
        };

        let outcome = if report.matches {
            Ok(())
        } else {
            warn!(
                "Checksum mismatch for {}: expected {}, found {}",
                record.stored_path, report.expected, report.actual
            );
            Err(AppError::Integrity("Checksum mismatch".to_string()))
        };
        self.audit
            .record(
                AuditAction::Verify,
                &record.stored_path,
                actor,
                &outcome,
                Some(record.file_size),
                started,
            )
            .await;

        Ok(report)
    }
}

/// Upload bytes already written to the staging area, waiting for a
/// catalog row and their final path
struct StagedUpload {
    catalog: FileCatalog,
    files: Arc<dyn FileRepository>,
    backend: Arc<dyn PrimaryBackend>,
    settings: Arc<StorageSettings>,
    staged: String,
    category: String,
    folder_path: String,
    file_name: String,
    /// Record fields that do not depend on the chosen name
    base: NewFileRecord,
    /// Encoded backup blob, when one was requested
    backup: Option<String>,
}

impl StagedUpload {
    /// Register, save the backup, publish. Nothing is left behind on failure.
    async fn commit(self) -> Result<FileRecord> {
        let record = match self.register().await {
            Ok(record) => record,
            Err(e) => {
                discard_staged(self.backend.as_ref(), &self.staged).await;
                return Err(e);
            }
        };

        match self.publish(record.clone()).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(cleanup) = self.files.hard_delete(record.id).await {
                    error!(
                        "Failed to remove catalog entry {} after failed upload: {}",
                        record.id, cleanup
                    );
                }
                discard_staged(self.backend.as_ref(), &self.staged).await;
                Err(e)
            }
        }
    }

    /// Insert the row at the first free name, retrying when another upload
    /// takes the name between the lookup and the insert
    async fn register(&self) -> Result<FileRecord> {
        for attempt in 1..=MAX_REGISTER_ATTEMPTS {
            let (file_name, stored_path) = self
                .catalog
                .free_location(&self.category, &self.folder_path, &self.file_name)
                .await?;

            let new_record = NewFileRecord {
                url: self.settings.file_url(&stored_path),
                stored_path,
                file_name,
                ..self.base.clone()
            };

            match self.catalog.register(new_record).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_conflict() => {
                    debug!("Path taken concurrently, retrying (attempt {})", attempt);
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::Conflict(format!(
            "Could not find a free name for '{}'",
            self.file_name
        )))
    }

    async fn publish(&self, record: FileRecord) -> Result<FileRecord> {
        let record = match &self.backup {
            Some(blob) => {
                self.files
                    .save_backup(record.id, blob, &record.content_type)
                    .await?
            }
            None => record,
        };
        publish_staged(self.backend.as_ref(), &self.staged, &record.stored_path).await?;
        Ok(record)
    }
}

/// Fresh key under the staging directory
fn staging_key() -> String {
    format!("{}/{}", STAGING_DIR, Uuid::new_v4().simple())
}

async fn publish_staged(backend: &dyn PrimaryBackend, staged: &str, target: &str) -> Result<()> {
    if backend.rename(staged, target).await? {
        Ok(())
    } else {
        Err(AppError::Storage(format!(
            "Staged bytes for '{}' are missing",
            target
        )))
    }
}

async fn discard_staged(backend: &dyn PrimaryBackend, staged: &str) {
    if let Err(e) = backend.delete(staged).await {
        warn!("Left staged bytes at {}: {}", staged, e);
    }
}

/// Run `work` on its own task; it completes even if the caller is dropped
async fn run_detached<T, F>(work: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| AppError::Internal(format!("Storage task failed: {}", e)))?
}

fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
