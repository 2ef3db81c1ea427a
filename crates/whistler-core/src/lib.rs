//! Whistler Core Library
//!
//! This crate provides the domain models, error types, configuration, and validation
//! rules shared by the storage, database, and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{LifecycleState, Lookup, ResourceId, ResourceKind};
pub use validation::{FieldError, FieldErrors, PayloadValidator, RuleValidator};
