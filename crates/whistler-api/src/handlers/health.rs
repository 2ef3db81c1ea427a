//! Health check handler

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;
use whistler_core::ResourceId;
use whistler_storage::StorageError;

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;

/// Never registered; probing it only exercises the store's lookup path.
const PROBE_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

/// Liveness plus database and storage probes
///
/// Only the database decides the status code; a failing storage probe reports `degraded`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "Database unreachable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let database = run_check(timeout, state.ledger.ping(), "unhealthy").await;
    let healthy = database == "healthy";

    let store = state.uploads.store().clone();
    let storage = run_check(
        timeout,
        async move {
            let probe = ResourceId::parse(PROBE_ID).map_err(|e| e.to_string())?;
            match store.stat(&probe).await {
                Ok(_) | Err(StorageError::NotFound(_)) => Ok(()),
                Err(e) => Err(e.to_string()),
            }
        },
        "degraded",
    )
    .await;

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database,
        storage,
    };

    if !healthy {
        tracing::error!(database = %response.database, "Health check failed");
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
