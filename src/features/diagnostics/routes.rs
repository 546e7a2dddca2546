use axum::{routing::get, Router};

use crate::features::diagnostics::handlers::{self, DiagnosticsState};

/// Diagnostic routes; the key gate lets these through without a key
pub fn routes(state: DiagnosticsState) -> Router {
    Router::new()
        .route("/api/storage/ping", get(handlers::ping))
        .route("/api/storage/diagnostics/health", get(handlers::health))
        .route(
            "/api/storage/diagnostics/backend",
            get(handlers::backend_status),
        )
        .with_state(state)
}
