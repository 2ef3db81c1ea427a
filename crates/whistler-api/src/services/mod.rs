//! Business logic behind the HTTP handlers

pub mod ingestion;
pub mod registration;
pub mod upload_gateway;

pub use ingestion::ReportIngestion;
pub use registration::MediaRegistration;
pub use upload_gateway::UploadGateway;
