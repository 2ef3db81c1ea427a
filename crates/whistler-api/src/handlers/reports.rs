//! Report ingestion handler

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use bytes::Bytes;
use whistler_core::models::{ReportPayload, ReportResponse};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Create a report and link its evidences
///
/// The body is read raw: it is persisted verbatim next to the normalized report.
#[utoipa::path(
    post,
    path = "/rest/v1/reports",
    tag = "reports",
    request_body = ReportPayload,
    responses(
        (status = 200, description = "Report created", body = ReportResponse),
        (status = 400, description = "Malformed or invalid report", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let report = state.ingestion.create_report(&body).await?;
    Ok(Json(ReportResponse { data: report }))
}
