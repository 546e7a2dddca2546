use crate::core::error::AppError;
use crate::features::api_keys::KeyGate;
use crate::shared::constants::{
    API_KEY_FORM_FIELD, API_KEY_HEADER, API_KEY_QUERY_PARAM, EXEMPT_DIAGNOSTIC_PATHS, PING_SUFFIX,
};
use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Swagger UI\"")],
                "Unauthorized",
            )
                .into_response())
        })
    }
}

// =============================================================================
// KEY GATE
// =============================================================================

#[derive(Clone)]
pub struct KeyGateState {
    pub gate: Arc<KeyGate>,
    /// Upper bound when buffering multipart bodies to look for the key
    pub body_limit: usize,
}

fn is_exempt(path: &str) -> bool {
    path.ends_with(PING_SUFFIX) || EXEMPT_DIAGNOSTIC_PATHS.contains(&path)
}

/// Who is calling, for key usage statistics
fn caller_of(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    forwarded
        .or(user_agent)
        .unwrap_or("unknown")
        .to_string()
}

fn key_from_query(parts: &Parts) -> Option<String> {
    let query = parts.uri.query()?;
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name != API_KEY_QUERY_PARAM {
            return None;
        }
        urlencoding::decode(value)
            .ok()
            .map(|v| v.into_owned())
            .filter(|v| !v.is_empty())
    })
}

fn is_multipart(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Buffer a multipart body and look for an `apiKey` field. The returned
/// request carries the same bytes, so the handler still sees the full form.
async fn key_from_multipart(
    parts: Parts,
    body: Body,
    limit: usize,
) -> Result<(Option<String>, Request), AppError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let request_copy = Request::from_parts(parts.clone(), Body::from(bytes.clone()));
    let mut key = None;
    if let Ok(mut multipart) = Multipart::from_request(request_copy, &()).await {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some(API_KEY_FORM_FIELD) {
                key = field.text().await.ok().filter(|v| !v.is_empty());
                break;
            }
        }
    }

    Ok((key, Request::from_parts(parts, Body::from(bytes))))
}

/// Reject requests without a valid API key and attach the caller's
/// `ApiPrincipal` otherwise.
///
/// The key is taken from the `X-API-Key` header, then the `apiKey` query
/// parameter, then an `apiKey` multipart field.
pub async fn key_gate_middleware(
    State(state): State<KeyGateState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_exempt(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let (parts, body) = req.into_parts();

    let header_key = parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let (key, mut req) = match header_key.or_else(|| key_from_query(&parts)) {
        Some(key) => (Some(key), Request::from_parts(parts, body)),
        None if is_multipart(&parts) => key_from_multipart(parts, body, state.body_limit).await?,
        None => (None, Request::from_parts(parts, body)),
    };

    let key = key.ok_or_else(|| AppError::Unauthorized("API key is required".to_string()))?;

    let used_by = caller_of(req.headers());
    let principal = match state.gate.validate(&key, &used_by).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            tracing::debug!("Rejected invalid API key from {}", used_by);
            return Err(AppError::Unauthorized("Invalid API key".to_string()));
        }
        Err(e) => {
            tracing::error!("API key validation failed: {}", e);
            return Err(AppError::Internal("API key validation failed".to_string()));
        }
    };

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
