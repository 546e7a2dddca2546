/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 200;

// =============================================================================
// KEY GATE
// =============================================================================

/// Header carrying the storage API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter carrying the storage API key
pub const API_KEY_QUERY_PARAM: &str = "apiKey";

/// Multipart form field carrying the storage API key
pub const API_KEY_FORM_FIELD: &str = "apiKey";

/// Diagnostic sub-paths reachable without a key
pub const EXEMPT_DIAGNOSTIC_PATHS: &[&str] = &[
    "/api/storage/diagnostics/health",
    "/api/storage/diagnostics/backend",
];

/// Health-check suffix reachable without a key
pub const PING_SUFFIX: &str = "/ping";

// =============================================================================
// STORAGE
// =============================================================================

/// Backend directory for bytes not yet published under a catalog path.
/// Not a valid category name, so no category directory can shadow it.
pub const STAGING_DIR: &str = ".staging";

// =============================================================================
// DOWNLOADS
// =============================================================================

/// Response header telling the caller which backend served the payload
pub const SERVED_FROM_HEADER: &str = "x-served-from";

/// Response header with the catalog checksum of the payload
pub const CHECKSUM_HEADER: &str = "x-checksum-sha256";

/// Cache-Control max-age used when caching is enabled in the storage settings
pub const CACHE_MAX_AGE_SECS: u64 = 86_400;

/// Wildcard entry in allowed-file-type lists
pub const ANY_FILE_TYPE: &str = "*";
