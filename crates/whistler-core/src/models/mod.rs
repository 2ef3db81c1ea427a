//! Data models for the application
//!
//! Organized by domain: resource identifiers and their lifecycle, reports with their
//! evidence associations, and bulk-registered media files.

mod identifier;
mod lifecycle;
mod media_file;
mod metadata;
mod report;

pub(crate) use identifier::is_uuid;
pub use identifier::{file_extension, ResourceId};
pub use lifecycle::{
    FinalizeOutcome, LifecycleRecord, LifecycleState, Lookup, Registration, ResourceKind,
};
pub use media_file::{FileInfo, FormMediaFileRegister, MediaFile, MediaFileInfo};
pub use metadata::{Location, Metadata};
pub use report::{
    Evidence, EvidenceAssociation, Recipient, Report, ReportPayload, ReportResponse,
    ReviewStatus, StoredReport,
};
