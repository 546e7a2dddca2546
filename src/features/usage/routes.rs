use axum::{
    routing::{get, post},
    Router,
};

use crate::features::usage::handlers::{correct_usage, get_usage, UsageState};

/// Create routes for usage statistics
pub fn routes(state: UsageState) -> Router {
    Router::new()
        .route("/api/storage/usage", get(get_usage))
        .route("/api/storage/usage/corrections", post(correct_usage))
        .with_state(state)
}
