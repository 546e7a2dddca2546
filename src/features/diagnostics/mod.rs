//! Unauthenticated liveness and backend diagnostics under `/api/storage`.

pub mod dtos;
pub mod handlers;
pub mod routes;

pub use handlers::DiagnosticsState;
pub use routes::routes;
