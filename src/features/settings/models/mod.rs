mod storage_settings;

pub use storage_settings::{NewStorageSettings, StorageSettings, UpdateStorageSettings};
