mod backup;
mod file_record;
mod related_entity;

pub use backup::BackupBlob;
pub use file_record::{FileFilter, FileRecord, NewFileRecord, StorageState};
pub use related_entity::{EntityKind, RelatedEntity};
