//! Whistler persistence
//!
//! The lifecycle ledger and the report store, each behind a trait with a PostgreSQL
//! implementation. The `test-helpers` feature adds an in-memory implementation of both.

pub mod db;

pub use db::{
    LifecycleLedger, PgLifecycleLedger, PgReportStore, ReportStore, ReportTransaction,
};

#[cfg(any(test, feature = "test-helpers"))]
pub use db::memory::InMemoryStore;
