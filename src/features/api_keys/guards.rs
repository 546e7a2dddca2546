//! Authorization guards for management routes.
//!
//! Storage operations accept any principal the key gate let through;
//! configuration, category, key and usage-correction management additionally
//! require the bootstrap key.

use crate::core::error::AppError;
use crate::features::api_keys::models::ApiPrincipal;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for routes reserved to the bootstrap key.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireBootstrapKey(principal): RequireBootstrapKey) { ... }
/// ```
pub struct RequireBootstrapKey(pub ApiPrincipal);

impl<S> FromRequestParts<S> for RequireBootstrapKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<ApiPrincipal>()
            .ok_or_else(|| AppError::Unauthorized("API key is required".to_string()))?;

        if !principal.is_bootstrap() {
            return Err(AppError::Forbidden(
                "This operation requires the bootstrap key".to_string(),
            ));
        }

        Ok(RequireBootstrapKey(principal.clone()))
    }
}
