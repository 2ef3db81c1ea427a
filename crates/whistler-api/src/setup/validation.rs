//! Configuration validation
//!
//! Startup checks on top of [`Config::validate`] for settings that live outside `Config`.

use anyhow::Result;
use whistler_core::Config;

use crate::constants::{DEFAULT_HTTP_CONCURRENCY_LIMIT, DEFAULT_TRUSTED_PROXY_COUNT};

/// Validate critical configuration values, failing fast on anything unusable.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.cors_origins().iter().any(|origin| origin == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Please set specific allowed origins via CORS_ORIGINS."
        ));
    }

    let trusted = trusted_proxy_count();
    if trusted > 10 {
        tracing::warn!(
            trusted_proxy_count = trusted,
            "TRUSTED_PROXY_COUNT is very high - ensure this matches your actual proxy setup"
        );
    }

    if http_concurrency_limit() == 0 {
        return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT cannot be 0"));
    }

    Ok(())
}

/// `TRUSTED_PROXY_COUNT`, defaulting to no trusted proxies.
pub fn trusted_proxy_count() -> usize {
    std::env::var("TRUSTED_PROXY_COUNT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TRUSTED_PROXY_COUNT)
}

/// `HTTP_CONCURRENCY_LIMIT`, the cap on in-flight requests.
pub fn http_concurrency_limit() -> usize {
    std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
}
