//! Local filesystem storage backend
//!
//! Writes go to a hidden temp file in the target directory, are fsynced and
//! then renamed into place, so a crash mid-write leaves at most an orphaned
//! `.tmp` file and never a truncated published file.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{IntegrityVerifier, PrimaryBackend};
use crate::core::error::{AppError, Result};

/// Local filesystem storage backend
pub struct LocalStorageBackend {
    root: PathBuf,
}

impl LocalStorageBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage key to a path below the root.
    ///
    /// Keys are `/`-separated relative paths; anything that could climb out of
    /// the root (absolute paths, `..`) is rejected.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Storage(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = Self::temp_path_for(path);
        let write_result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            // Clean up orphaned temp file
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

fn io_error(action: &str, key: &str, e: std::io::Error) -> AppError {
    error!("Failed to {} '{}': {}", action, key, e);
    AppError::Storage(format!("Failed to {} '{}': {}", action, key, e))
}

#[async_trait]
impl PrimaryBackend for LocalStorageBackend {
    async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create storage root {}: {}",
                self.root.display(),
                e
            ))
        })?;
        info!("Local storage root ready: {}", self.root.display());
        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        Self::write_atomic(&path, data)
            .await
            .map_err(|e| io_error("write", key, e))?;
        debug!("Stored {} bytes at {}", data.len(), key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", key, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(_) => {
                debug!("Deleted file: {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("File already deleted: {}", key);
                Ok(false)
            }
            Err(e) => Err(io_error("delete", key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("stat", key, e)),
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<bool> {
        // Read then atomic write, so the destination is never half-copied
        let Some(data) = self.get(from).await? else {
            return Ok(false);
        };
        self.put(to, &data).await?;
        Ok(true)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<bool> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory for", to, e))?;
        }

        match fs::rename(&source, &target).await {
            Ok(_) => {
                debug!("Renamed {} -> {}", from, to);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("rename", from, e)),
        }
    }

    async fn move_tree(&self, from: &str, to: &str) -> Result<bool> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;

        match fs::metadata(&source).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(AppError::Storage(format!("'{}' is not a directory", from)));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error("stat", from, e)),
        }

        // A leftover empty directory at the target is fine to replace
        if fs::metadata(&target).await.is_ok() {
            if let Err(e) = fs::remove_dir(&target).await {
                warn!("Target directory '{}' exists and is not empty", to);
                return Err(io_error("replace directory", to, e));
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory for", to, e))?;
        }

        fs::rename(&source, &target)
            .await
            .map_err(|e| io_error("move directory", from, e))?;
        info!("Moved directory {} -> {}", from, to);
        Ok(true)
    }

    async fn checksum(&self, key: &str) -> Result<Option<String>> {
        let path = self.resolve(key)?;
        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("open", key, e)),
        };
        let digest = IntegrityVerifier::compute_reader(&mut file)
            .await
            .map_err(|e| io_error("hash", key, e))?;
        Ok(Some(digest))
    }

    async fn is_available(&self) -> bool {
        matches!(fs::metadata(&self.root).await, Ok(meta) if meta.is_dir())
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
