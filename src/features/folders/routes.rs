use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::features::folders::handlers;
use crate::features::folders::services::FolderService;

/// Create routes for the folders feature
pub fn routes(service: Arc<FolderService>) -> Router {
    Router::new()
        .route(
            "/api/storage/folders",
            get(handlers::list_folder_children).post(handlers::create_folder),
        )
        .route(
            "/api/storage/folders/{id}",
            get(handlers::get_folder).delete(handlers::delete_folder),
        )
        .route("/api/storage/folders/{id}/rename", patch(handlers::rename_folder))
        .route("/api/storage/folders/{id}/move", patch(handlers::move_folder))
        .route("/api/storage/folders/{id}/size", get(handlers::get_folder_size))
        .with_state(service)
}
