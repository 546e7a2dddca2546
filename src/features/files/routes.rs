use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::features::files::handlers::{self, FilesState};

/// Headroom over the configured size for multipart framing and form fields
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the files feature
///
/// `max_body` is the configured maximum file size at startup; uploads are
/// checked against the live setting again while streaming.
pub fn routes(state: FilesState, max_body: usize) -> Router {
    let upload_limit = DefaultBodyLimit::max(max_body.saturating_add(BODY_OVERHEAD));

    Router::new()
        .route(
            "/api/storage/files",
            get(handlers::list_files).post(handlers::upload_file).layer(upload_limit),
        )
        .route(
            "/api/storage/files/raw",
            put(handlers::upload_raw).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/storage/files/lookup", get(handlers::lookup_file))
        .route("/api/storage/files/exists", get(handlers::file_exists))
        .route("/api/storage/files/download", get(handlers::download_file_by_url))
        .route(
            "/api/storage/files/by-url",
            axum::routing::delete(handlers::delete_file_by_url),
        )
        .route(
            "/api/storage/files/{id}",
            get(handlers::get_file).delete(handlers::delete_file),
        )
        .route("/api/storage/files/{id}/content", get(handlers::download_file))
        .route("/api/storage/files/{id}/rename", patch(handlers::rename_file))
        .route("/api/storage/files/{id}/move", patch(handlers::move_file))
        .route("/api/storage/files/{id}/backup", post(handlers::backup_file))
        .route("/api/storage/files/{id}/restore", post(handlers::restore_file))
        .route("/api/storage/files/{id}/verify", get(handlers::verify_file))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::middleware::{key_gate_middleware, KeyGateState};
    use crate::features::api_keys::KeyGate;
    use crate::shared::test_helpers::StorageHarness;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::Value;
    use std::sync::Arc;

    const KEY: &str = "boot-key";

    fn server(h: &StorageHarness) -> TestServer {
        let gate = KeyGate::new(
            Some(KEY.to_string()),
            Arc::clone(&h.snapshot),
            h.store.clone(),
        );
        let app = routes(
            FilesState {
                store: Arc::clone(&h.files),
                snapshot: Arc::clone(&h.snapshot),
            },
            1024 * 1024,
        )
        .layer(axum::middleware::from_fn_with_state(
            KeyGateState {
                gate: Arc::new(gate),
                body_limit: 4 * 1024 * 1024,
            },
            key_gate_middleware,
        ));
        TestServer::new(app).unwrap()
    }

    fn key_header() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(KEY),
        )
    }

    fn upload_form(category: &str, file_name: &str, data: &[u8]) -> MultipartForm {
        MultipartForm::new().add_text("category", category).add_part(
            "file",
            Part::bytes(data.to_vec())
                .file_name(file_name)
                .mime_type("text/plain"),
        )
    }

    #[tokio::test]
    async fn test_upload_download_delete_over_http() {
        let h = StorageHarness::new().await;
        let server = server(&h);
        let (name, value) = key_header();

        let response = server
            .post("/api/storage/files")
            .add_header(name.clone(), value.clone())
            .multipart(upload_form("documents", "notes.txt", b"hello"))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["stored_path"], "documents/notes.txt");
        assert_eq!(body["data"]["url"], "http://files.test/documents/notes.txt");

        let response = server
            .get(&format!("/api/storage/files/{}/content", id))
            .add_header(name.clone(), value.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.as_bytes().as_ref(), b"hello");
        assert_eq!(response.header("x-served-from"), "primary");
        assert_eq!(
            response.header("cache-control"),
            "public, max-age=86400"
        );

        let response = server
            .delete(&format!("/api/storage/files/{}", id))
            .add_header(name.clone(), value.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let response = server
            .get(&format!("/api/storage/files/{}/content", id))
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_key_accepted_as_form_field() {
        let h = StorageHarness::new().await;
        let server = server(&h);

        let response = server
            .post("/api/storage/files")
            .multipart(upload_form("documents", "a.txt", b"a").add_text("apiKey", KEY))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = server
            .post("/api/storage/files")
            .multipart(upload_form("documents", "b.txt", b"b"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_type() {
        let h = StorageHarness::new().await;
        let server = server(&h);
        let (name, value) = key_header();

        let response = server
            .post("/api/storage/files")
            .add_header(name, value)
            .multipart(upload_form("leases", "notes.txt", b"text"))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }
}
