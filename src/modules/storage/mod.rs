//! Primary storage backend for file bytes
//!
//! The primary backend is path-addressed: every file lives under a key of the
//! form `<category>/<folder path>/<file name>`. Backup copies are not handled
//! here; they live in the database next to the catalog.

use async_trait::async_trait;

use crate::core::error::Result;

mod integrity;
mod local;

pub use integrity::IntegrityVerifier;
pub use local::LocalStorageBackend;

/// Byte storage behind the file catalog
#[async_trait]
pub trait PrimaryBackend: Send + Sync {
    /// Prepare the backend (create the root directory, validate access)
    async fn initialize(&self) -> Result<()>;

    /// Write `data` under `key`, replacing any previous content.
    /// Readers never observe partially written content.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read the bytes under `key`, `None` if nothing is stored there
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the bytes under `key`; returns whether anything was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether bytes exist under `key`
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Copy `from` to `to`; returns false when `from` holds nothing
    async fn copy(&self, from: &str, to: &str) -> Result<bool>;

    /// Move a single object, replacing whatever is under `to`.
    /// Returns false when `from` holds nothing.
    async fn rename(&self, from: &str, to: &str) -> Result<bool>;

    /// Move a whole directory subtree; returns false when `from` holds nothing
    async fn move_tree(&self, from: &str, to: &str) -> Result<bool>;

    /// Checksum of the bytes under `key`, streamed from the backend
    async fn checksum(&self, key: &str) -> Result<Option<String>>;

    /// Whether the backend is currently reachable
    async fn is_available(&self) -> bool;

    /// Human-readable identifier of the backend type
    fn storage_type(&self) -> &'static str;
}
