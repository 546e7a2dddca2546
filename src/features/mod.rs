pub mod access_logs;
pub mod api_keys;
pub mod categories;
pub mod diagnostics;
pub mod files;
pub mod folders;
pub mod settings;
pub mod usage;
