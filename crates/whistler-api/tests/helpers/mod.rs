//! Test helpers: build AppState and router for integration tests.
//!
//! The ledger and report store are the in-memory implementation from `whistler-db`;
//! bytes go to a temporary directory through the real local resource store.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use whistler_api::setup::routes;
use whistler_api::AppState;
use whistler_core::{Config, RuleValidator};
use whistler_db::InMemoryStore;
use whistler_storage::LocalResourceStore;

/// Test application: server plus handles on its backing stores.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn base_dir(&self) -> &Path {
        self._temp_dir.path()
    }
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config::new("postgres://localhost/whistler_test", temp_dir.path());

    let store = InMemoryStore::new();
    let resources = LocalResourceStore::new(temp_dir.path())
        .await
        .expect("Failed to create resource store");
    let validator = RuleValidator::new(config.allowed_file_extensions())
        .expect("Failed to build validator");

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(resources),
        Arc::new(validator),
    ));

    let router = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        store,
        _temp_dir: temp_dir,
    }
}

/// Fresh client-side identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Minimal valid report body referencing the given evidence identifiers as `.jpg` files.
pub fn report_body(evidences: &[&str]) -> Value {
    let evidences: Vec<Value> = evidences
        .iter()
        .map(|uid| json!({"name": uid, "path": format!("{}.jpg", uid)}))
        .collect();
    json!({
        "title": "Broken street light",
        "location": "Main St",
        "evidences": evidences,
        "recipients": [{"title": "City council", "email": "council@example.org"}],
    })
}
