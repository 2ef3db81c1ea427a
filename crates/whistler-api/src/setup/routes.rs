//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use whistler_core::Config;

use crate::constants::{FILES_PREFIX, MEDIA_PREFIX, OPENAPI_PATH, REST_PREFIX};
use crate::handlers::{health, media_registration, reports, uploads};
use crate::state::AppState;

use super::validation::http_concurrency_limit;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let concurrency_limit = http_concurrency_limit().max(1);
    tracing::info!(
        http_concurrency_limit = concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    Ok(api_routes()
        .route(OPENAPI_PATH, get(|| async { Json(crate::api_doc::get_openapi_spec()) }))
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes()))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Handler routes without middleware; state is supplied by the caller.
pub fn api_routes() -> Router<Arc<AppState>> {
    let rest = Router::new()
        .route("/reports", post(reports::create_report))
        .route(
            "/media/forms/registrations",
            post(media_registration::register_media_files),
        );

    let files = Router::new()
        .route("/{name}", post(uploads::upload_evidence))
        .route("/{name}/info", get(uploads::evidence_info))
        .route("/{name}/done", post(uploads::evidence_done));

    let media = Router::new()
        .route("/{uid}", post(uploads::upload_media))
        .route("/{uid}/info", get(uploads::media_info))
        .route("/{uid}/done", post(uploads::media_done));

    Router::new()
        .nest(REST_PREFIX, rest)
        .nest(FILES_PREFIX, files)
        .nest(MEDIA_PREFIX, media)
        .route("/health", get(health::health_check))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins().iter().any(|origin| origin == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
