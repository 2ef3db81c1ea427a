//! Resource store setup

use std::sync::Arc;

use anyhow::{Context, Result};
use whistler_core::Config;
use whistler_storage::{LocalResourceStore, ResourceStore};

/// Opens the flat upload directory, creating it if needed.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ResourceStore>> {
    let store = LocalResourceStore::new(config.base_dir())
        .await
        .context("Failed to initialize resource store")?;

    tracing::info!(
        base_dir = %store.base_dir().display(),
        "Resource store initialized"
    );

    Ok(Arc::new(store))
}
