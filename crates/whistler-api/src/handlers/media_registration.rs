use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use bytes::Bytes;
use whistler_core::models::FormMediaFileRegister;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Register media files ahead of their uploads
#[utoipa::path(
    post,
    path = "/rest/v1/media/forms/registrations",
    tag = "media",
    request_body = FormMediaFileRegister,
    responses(
        (status = 200, description = "All attachments registered"),
        (status = 400, description = "Malformed or invalid form", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register_media_files(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, HttpAppError> {
    state.registration.register(&body).await?;
    Ok(StatusCode::OK)
}
