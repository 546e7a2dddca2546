use parking_lot::RwLock;
use std::sync::Arc;

use crate::features::settings::models::StorageSettings;

/// Immutable view of the active storage settings, swapped as a whole.
///
/// Readers clone the inner `Arc` and never block writers for longer than the
/// pointer swap.
pub struct SettingsSnapshot {
    current: RwLock<Arc<StorageSettings>>,
}

impl SettingsSnapshot {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn get(&self) -> Arc<StorageSettings> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, settings: StorageSettings) {
        *self.current.write() = Arc::new(settings);
    }
}
