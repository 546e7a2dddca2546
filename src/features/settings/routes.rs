use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::settings::handlers::{get_settings, update_settings};
use crate::features::settings::services::SettingsService;

/// Create routes for the storage configuration (bootstrap key only)
pub fn routes(service: Arc<SettingsService>) -> Router {
    Router::new()
        .route(
            "/api/storage/settings",
            get(get_settings).put(update_settings),
        )
        .with_state(service)
}
