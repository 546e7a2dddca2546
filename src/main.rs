mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::access_logs::{
    repository::PgAccessLogRepository, routes as access_logs_routes, AccessLogService,
};
use crate::features::api_keys::{
    repository::PgApiKeyRepository, routes as api_keys_routes, ApiKeyService, KeyGate,
};
use crate::features::categories::{
    repository::PgCategoryRepository, routes as categories_routes, CategoryService,
};
use crate::features::diagnostics::{routes as diagnostics_routes, DiagnosticsState};
use crate::features::files::{
    repository::PgFileRepository, routes as files_routes, FileStore, FilesState,
};
use crate::features::folders::{
    repository::PgFolderRepository, routes as folders_routes, FolderService,
};
use crate::features::settings::{
    repository::PgSettingsRepository, routes as settings_routes, SettingsRefresher,
    SettingsService, SettingsSnapshot,
};
use crate::features::usage::{
    handlers::UsageState, repository::PgUsageRepository, routes as usage_routes, UsageService,
};
use crate::modules::storage::{LocalStorageBackend, PrimaryBackend};
use axum::{middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Active storage settings (seeded from the environment on first start)
    let settings_repo = Arc::new(PgSettingsRepository::new(pool.clone()));
    let settings = SettingsService::load_or_seed(settings_repo.as_ref(), &config.storage)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load storage settings: {}", e))?;
    let snapshot = Arc::new(SettingsSnapshot::new(settings.clone()));
    tracing::info!(
        "Storage settings loaded: root={}, base_url={}",
        settings.storage_root,
        settings.base_url
    );

    // Primary backend; the service cannot run without it
    let backend: Arc<dyn PrimaryBackend> =
        Arc::new(LocalStorageBackend::new(settings.storage_root.clone()));
    backend
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage backend: {}", e))?;
    tracing::info!("Storage backend initialized ({})", backend.storage_type());

    // Repositories
    let category_repo = Arc::new(PgCategoryRepository::new(pool.clone()));
    let folder_repo = Arc::new(PgFolderRepository::new(pool.clone()));
    let file_repo = Arc::new(PgFileRepository::new(pool.clone()));
    let usage_repo = Arc::new(PgUsageRepository::new(pool.clone()));
    let access_log_repo = Arc::new(PgAccessLogRepository::new(pool.clone()));
    let api_key_repo = Arc::new(PgApiKeyRepository::new(pool.clone()));

    // Services
    let category_service = Arc::new(CategoryService::new(category_repo, Arc::clone(&snapshot)));
    let usage_service = Arc::new(UsageService::new(usage_repo));
    let access_log_service = Arc::new(AccessLogService::new(access_log_repo));
    let file_store = Arc::new(FileStore::new(
        Arc::clone(&backend),
        file_repo.clone(),
        folder_repo.clone(),
        Arc::clone(&category_service),
        Arc::clone(&snapshot),
        Arc::clone(&usage_service),
        Arc::clone(&access_log_service),
    ));
    let folder_service = Arc::new(FolderService::new(
        folder_repo,
        file_repo,
        Arc::clone(&category_service),
        Arc::clone(&file_store),
        Arc::clone(&backend),
        Arc::clone(&snapshot),
        Arc::clone(&access_log_service),
    ));
    let settings_service = Arc::new(SettingsService::new(
        settings_repo.clone(),
        Arc::clone(&snapshot),
    ));
    let api_key_service = Arc::new(ApiKeyService::new(api_key_repo.clone()));
    let key_gate = Arc::new(KeyGate::new(
        config.storage.bootstrap_api_key.clone(),
        Arc::clone(&snapshot),
        api_key_repo,
    ));
    if config.storage.bootstrap_api_key.is_none() {
        tracing::warn!("STORAGE_BOOTSTRAP_API_KEY not set; key administration is unavailable");
    }
    tracing::info!("Storage services initialized");

    // Keep the settings snapshot in sync with the database
    let refresher = SettingsRefresher::new(
        settings_repo,
        Arc::clone(&snapshot),
        config.storage.settings_refresh_interval,
    )
    .spawn();

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    let body_limit = config.app.max_request_body_size;

    // Storage routes (require an API key, except the diagnostic ones)
    let storage_routes = Router::new()
        .merge(files_routes::routes(
            FilesState {
                store: Arc::clone(&file_store),
                snapshot: Arc::clone(&snapshot),
            },
            body_limit,
        ))
        .merge(folders_routes::routes(folder_service))
        .merge(categories_routes::routes(Arc::clone(&category_service)))
        .merge(settings_routes::routes(settings_service))
        .merge(api_keys_routes::routes(api_key_service))
        .merge(usage_routes::routes(UsageState {
            usage: usage_service,
            categories: category_service,
        }))
        .merge(access_logs_routes::routes(access_log_service))
        .merge(diagnostics_routes::routes(DiagnosticsState {
            backend,
            snapshot,
        }))
        .layer(axum::middleware::from_fn_with_state(
            middleware::KeyGateState {
                gate: key_gate,
                body_limit,
            },
            middleware::key_gate_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(storage_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
