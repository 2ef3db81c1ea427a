//! Upload endpoints
//!
//! `/files/{name}` addresses evidence, `/media/{uid}` addresses media files. Both accept a
//! raw byte body that is appended to whatever the resource already holds.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use whistler_core::models::{FileInfo, MediaFileInfo, ResourceKind};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::ip_extraction::extract_client_ip;

type ClientAddr = Option<Extension<ConnectInfo<SocketAddr>>>;

fn client_ip(state: &AppState, headers: &HeaderMap, addr: &ClientAddr) -> String {
    let socket_addr = addr.as_ref().map(|Extension(ConnectInfo(addr))| addr);
    extract_client_ip(headers, socket_addr, state.trusted_proxy_count)
}

async fn append(
    state: &AppState,
    kind: ResourceKind,
    raw_id: &str,
    headers: &HeaderMap,
    addr: &ClientAddr,
    body: Body,
) -> Result<StatusCode, HttpAppError> {
    let ip = client_ip(state, headers, addr);
    state
        .uploads
        .upload(kind, raw_id, body.into_data_stream(), &ip)
        .await?;
    Ok(StatusCode::OK)
}

/// Append evidence bytes
#[utoipa::path(
    post,
    path = "/files/{name}",
    tag = "uploads",
    params(("name" = String, Path, description = "Evidence identifier (UUID)")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Bytes appended and synced"),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 403, description = "Evidence is not accepting uploads", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn upload_evidence(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    addr: ClientAddr,
    body: Body,
) -> Result<StatusCode, HttpAppError> {
    append(&state, ResourceKind::Evidence, &name, &headers, &addr, body).await
}

/// Stored size of an evidence upload
#[utoipa::path(
    get,
    path = "/files/{name}/info",
    tag = "uploads",
    params(("name" = String, Path, description = "Evidence identifier (UUID)")),
    responses(
        (status = 200, description = "Current size", body = FileInfo),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Evidence not registered", body = ErrorResponse)
    )
)]
pub async fn evidence_info(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<FileInfo>, HttpAppError> {
    let (id, size) = state.uploads.info(ResourceKind::Evidence, &name).await?;
    Ok(Json(FileInfo {
        name: id.to_string(),
        size,
    }))
}

/// Finalize an evidence upload
#[utoipa::path(
    post,
    path = "/files/{name}/done",
    tag = "uploads",
    params(("name" = String, Path, description = "Evidence identifier (UUID)")),
    responses(
        (status = 200, description = "Evidence marked uploaded"),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Evidence unknown or already finalized", body = ErrorResponse)
    )
)]
pub async fn evidence_done(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    state.uploads.done(ResourceKind::Evidence, &name).await?;
    Ok(StatusCode::OK)
}

/// Append media file bytes
#[utoipa::path(
    post,
    path = "/media/{uid}",
    tag = "uploads",
    params(("uid" = String, Path, description = "Media file identifier (UUID)")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Bytes appended and synced"),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 403, description = "Media file is not accepting uploads", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    addr: ClientAddr,
    body: Body,
) -> Result<StatusCode, HttpAppError> {
    append(&state, ResourceKind::MediaFile, &uid, &headers, &addr, body).await
}

/// Stored size of a media file upload
#[utoipa::path(
    get,
    path = "/media/{uid}/info",
    tag = "uploads",
    params(("uid" = String, Path, description = "Media file identifier (UUID)")),
    responses(
        (status = 200, description = "Current size", body = MediaFileInfo),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Media file not registered", body = ErrorResponse)
    )
)]
pub async fn media_info(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<MediaFileInfo>, HttpAppError> {
    let (id, size) = state.uploads.info(ResourceKind::MediaFile, &uid).await?;
    Ok(Json(MediaFileInfo {
        uid: id.to_string(),
        size,
    }))
}

/// Finalize a media file upload
#[utoipa::path(
    post,
    path = "/media/{uid}/done",
    tag = "uploads",
    params(("uid" = String, Path, description = "Media file identifier (UUID)")),
    responses(
        (status = 200, description = "Media file marked uploaded"),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Media file unknown or already finalized", body = ErrorResponse)
    )
)]
pub async fn media_done(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    state.uploads.done(ResourceKind::MediaFile, &uid).await?;
    Ok(StatusCode::OK)
}
