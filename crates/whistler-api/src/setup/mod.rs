//! Application setup and initialization
//!
//! Everything main.rs needs to go from a [`Config`] to a running router.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use whistler_core::{Config, RuleValidator};
use whistler_db::{PgLifecycleLedger, PgReportStore};

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration, before anything is opened
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())?;
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let store = storage::setup_storage(&config).await?;

    let validator = RuleValidator::new(config.allowed_file_extensions())
        .context("Failed to build payload validator")?;

    let state = Arc::new(
        AppState::new(
            config.clone(),
            Arc::new(PgLifecycleLedger::new(pool.clone())),
            Arc::new(PgReportStore::new(pool)),
            store,
            Arc::new(validator),
        )
        .with_trusted_proxy_count(validation::trusted_proxy_count()),
    );

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
