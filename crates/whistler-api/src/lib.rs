//! Whistler API Library
//!
//! This crate provides the HTTP gateway: report ingestion, bulk media registration and
//! the append-only upload endpoints, plus application setup.

pub mod api_doc;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
mod utils;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
