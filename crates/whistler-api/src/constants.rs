//! API constants
//!
//! Route prefixes are fixed because deployed mobile clients hard-code them.

/// REST endpoints (reports, media registration)
pub const REST_PREFIX: &str = "/rest/v1";

/// Evidence upload endpoints
pub const FILES_PREFIX: &str = "/files";

/// Media file upload endpoints
pub const MEDIA_PREFIX: &str = "/media";

/// OpenAPI document route
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Default cap on in-flight requests (`HTTP_CONCURRENCY_LIMIT` overrides)
pub const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Number of trusted reverse proxies in front of the service (`TRUSTED_PROXY_COUNT` overrides)
pub const DEFAULT_TRUSTED_PROXY_COUNT: usize = 0;

/// Timeout for each dependency probed by the health endpoint, in seconds
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
