//! Upload gateway integration tests.
//!
//! Run with: `cargo test -p whistler-api --test uploads_test`

mod helpers;

use axum::http::StatusCode;
use bytes::Bytes;
use helpers::{new_id, setup_test_app};
use serde_json::{json, Value};
use whistler_core::models::Registration;
use whistler_db::LifecycleLedger;

async fn register_media(app: &helpers::TestApp, uid: &str) {
    let response = app
        .client()
        .post("/rest/v1/media/forms/registrations")
        .json(&json!({
            "attachments": [{"uid": uid, "fileName": format!("{}.jpg", uid), "created": 1_700_000_000}]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_media_register_upload_info_done_then_closed() {
    let app = setup_test_app().await;
    let client = app.client();
    let f1 = new_id();
    register_media(&app, &f1).await;

    let payload = Bytes::from_static(b"\xff\xd8\xff\xe0 not really a jpeg");
    let response = client
        .post(&format!("/media/{}", f1))
        .bytes(payload.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.as_bytes().is_empty());

    let info: Value = client.get(&format!("/media/{}/info", f1)).await.json();
    assert_eq!(info, json!({"uid": f1, "size": payload.len()}));

    let response = client.post(&format!("/media/{}/done", f1)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = client
        .post(&format!("/media/{}", f1))
        .bytes(Bytes::from_static(b"more"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // The rejected append left the stored bytes alone.
    let info: Value = client.get(&format!("/media/{}/info", f1)).await.json();
    assert_eq!(info["size"], payload.len());
}

#[tokio::test]
async fn test_done_twice_second_is_not_found() {
    let app = setup_test_app().await;
    let client = app.client();
    let e1 = new_id();
    app.store
        .register(&Registration::evidence(e1.clone(), ".jpg"))
        .await
        .unwrap();

    let first = client.post(&format!("/files/{}/done", e1)).await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let second = client.post(&format!("/files/{}/done", e1)).await;
    assert_eq!(second.status_code(), StatusCode::NOT_FOUND);
    let body: Value = second.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_info_for_unregistered_id_is_not_found_even_with_bytes_on_disk() {
    let app = setup_test_app().await;
    let orphan = new_id();
    std::fs::write(app.base_dir().join(&orphan), b"stray bytes").unwrap();

    for path in [
        format!("/files/{}/info", orphan),
        format!("/media/{}/info", orphan),
    ] {
        let response = app.client().get(&path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_evidence_upload_is_resumable_by_appending() {
    let app = setup_test_app().await;
    let client = app.client();
    let e1 = new_id();
    app.store
        .register(&Registration::evidence(e1.clone(), ".jpg"))
        .await
        .unwrap();

    let info: Value = client.get(&format!("/files/{}/info", e1)).await.json();
    assert_eq!(info, json!({"name": e1, "size": 0}));

    for chunk in [&b"first-"[..], &b"second"[..]] {
        let response = client
            .post(&format!("/files/{}", e1))
            .bytes(Bytes::copy_from_slice(chunk))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let info: Value = client.get(&format!("/files/{}/info", e1)).await.json();
    assert_eq!(info["size"], 12);
    assert_eq!(
        std::fs::read(app.base_dir().join(&e1)).unwrap(),
        b"first-second"
    );
}

#[tokio::test]
async fn test_upload_to_unregistered_evidence_is_forbidden() {
    let app = setup_test_app().await;
    let e1 = new_id();

    let response = app
        .client()
        .post(&format!("/files/{}", e1))
        .add_header("x-forwarded-for", "203.0.113.9")
        .bytes(Bytes::from_static(b"abc"))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "UPLOAD_CLOSED");
    assert!(!app.base_dir().join(&e1).exists());
}

#[tokio::test]
async fn test_malformed_identifiers_are_bad_requests() {
    let app = setup_test_app().await;
    let client = app.client();

    for path in ["/files/not-a-uuid", "/media/..%2Fetc%2Fpasswd"] {
        let response = client.post(path).bytes(Bytes::from_static(b"x")).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{path}");
    }
    let response = client.get("/files/abc/info").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let response = client.post("/media/abc/done").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_evidence_and_media_ledgers_are_separate() {
    let app = setup_test_app().await;
    let id = new_id();
    register_media(&app, &id).await;

    let response = app
        .client()
        .post(&format!("/files/{}", id))
        .bytes(Bytes::from_static(b"abc"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app.client().post(&format!("/files/{}/done", id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_database_and_storage() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app().await;
    let body: Value = app.client().get("/api/openapi.json").await.json();
    assert!(body["paths"]["/files/{name}/done"].is_object());
}
