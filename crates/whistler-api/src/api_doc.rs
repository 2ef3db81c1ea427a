//! OpenAPI documentation, served at [`crate::constants::OPENAPI_PATH`].

use utoipa::OpenApi;
use whistler_core::models;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Whistler API",
        version = "0.1.0",
        description = "Report ingestion and resumable, append-only evidence and media uploads. \
            Identifiers are client-generated UUIDs; a resource accepts bytes until it is finalized."
    ),
    paths(
        // Reports
        handlers::reports::create_report,
        // Media registration
        handlers::media_registration::register_media_files,
        // Evidence uploads
        handlers::uploads::upload_evidence,
        handlers::uploads::evidence_info,
        handlers::uploads::evidence_done,
        // Media uploads
        handlers::uploads::upload_media,
        handlers::uploads::media_info,
        handlers::uploads::media_done,
        // Health
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::HealthCheckResponse,
        models::ReportPayload,
        models::Evidence,
        models::Recipient,
        models::Metadata,
        models::Location,
        models::Report,
        models::ReportResponse,
        models::EvidenceAssociation,
        models::FormMediaFileRegister,
        models::MediaFile,
        models::FileInfo,
        models::MediaFileInfo,
    )),
    tags(
        (name = "reports", description = "Report ingestion"),
        (name = "media", description = "Media file registration"),
        (name = "uploads", description = "Append-only evidence and media uploads"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/rest/v1/reports",
            "/rest/v1/media/forms/registrations",
            "/files/{name}",
            "/files/{name}/info",
            "/files/{name}/done",
            "/media/{uid}",
            "/media/{uid}/info",
            "/media/{uid}/done",
            "/health",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
