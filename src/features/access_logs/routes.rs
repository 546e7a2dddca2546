use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::access_logs::handlers::list_access_logs;
use crate::features::access_logs::services::AccessLogService;

/// Create routes for the access log
pub fn routes(service: Arc<AccessLogService>) -> Router {
    Router::new()
        .route("/api/storage/access-logs", get(list_access_logs))
        .with_state(service)
}
