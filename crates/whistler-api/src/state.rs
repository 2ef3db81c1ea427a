//! Application state
//!
//! One service object per concern, built once at startup and shared by every handler.

use std::sync::Arc;

use whistler_core::{Config, PayloadValidator};
use whistler_db::{LifecycleLedger, ReportStore};
use whistler_storage::ResourceStore;

use crate::constants::DEFAULT_TRUSTED_PROXY_COUNT;
use crate::services::{MediaRegistration, ReportIngestion, UploadGateway};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Kept alongside the services for the health probe.
    pub ledger: Arc<dyn LifecycleLedger>,
    pub ingestion: ReportIngestion,
    pub registration: MediaRegistration,
    pub uploads: UploadGateway,
    /// Reverse proxies whose `x-forwarded-for` entries are trusted when logging clients.
    pub trusted_proxy_count: usize,
}

impl AppState {
    pub fn new(
        config: Config,
        ledger: Arc<dyn LifecycleLedger>,
        reports: Arc<dyn ReportStore>,
        store: Arc<dyn ResourceStore>,
        validator: Arc<dyn PayloadValidator>,
    ) -> Self {
        Self {
            ingestion: ReportIngestion::new(reports, validator.clone()),
            registration: MediaRegistration::new(ledger.clone(), validator),
            uploads: UploadGateway::new(ledger.clone(), store),
            ledger,
            config,
            trusted_proxy_count: DEFAULT_TRUSTED_PROXY_COUNT,
        }
    }

    pub fn with_trusted_proxy_count(mut self, count: usize) -> Self {
        self.trusted_proxy_count = count;
        self
    }
}
