//! Database repositories
//!
//! `ledger` owns per-identifier upload state. `reports` owns report rows and their
//! evidence associations, and only reads ledger state inside its own transaction.

pub mod ledger;
pub mod reports;

#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;

pub use ledger::{LifecycleLedger, PgLifecycleLedger};
pub use reports::{PgReportStore, ReportStore, ReportTransaction};
