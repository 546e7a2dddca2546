mod settings_service;
mod settings_snapshot;

pub use settings_service::SettingsService;
pub use settings_snapshot::SettingsSnapshot;
