mod settings_refresher;

pub use settings_refresher::{RefresherHandle, SettingsRefresher};
