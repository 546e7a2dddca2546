mod file_catalog;
mod file_locks;
mod file_store;

pub use file_catalog::FileCatalog;
pub use file_locks::FileLocks;
pub use file_store::{FileContent, FileStore, ServedFrom, UploadRequest, VerifyReport};
