use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::features::api_keys::handlers::{create_api_key, list_api_keys, revoke_api_key};
use crate::features::api_keys::services::ApiKeyService;

/// Create routes for the key registry (bootstrap key only)
pub fn routes(service: Arc<ApiKeyService>) -> Router {
    Router::new()
        .route(
            "/api/storage/api-keys",
            get(list_api_keys).post(create_api_key),
        )
        .route("/api/storage/api-keys/{id}", delete(revoke_api_key))
        .with_state(service)
}
