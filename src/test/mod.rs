//! End-to-end checks of the HTTP surface against the in-memory store.

use actix_web::{cookie::Cookie, test, web, App};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    constants::{JwtConfig, PublicUploadConfig, WebhookSecret},
    middlewares::ACCESS_TOKEN_COOKIE,
    modules::{
        self,
        upload::{
            repository::UploadRepository, repository_memory::UploadRepositoryMemory,
            schema::UploadStatus, service::UploadService,
        },
        webhook::{service::WebhookService, signature},
    },
    utils::Claims,
};

const JWT_SECRET: &str = "test-jwt-secret";
const WEBHOOK_SECRET: &str = "test-webhook-secret";

fn jwt_config() -> JwtConfig {
    JwtConfig { secret: JWT_SECRET.to_string(), algorithm: Algorithm::HS256 }
}

fn public_config() -> PublicUploadConfig {
    PublicUploadConfig {
        api_key: "public-api-key".to_string(),
        accept: vec!["image/png".to_string(), "image/jpeg".to_string()],
        max_size: 5 * 1024 * 1024,
    }
}

fn configure_app(repo: Arc<UploadRepositoryMemory>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(UploadService::with_dependencies(repo.clone())))
            .app_data(web::Data::new(WebhookService::with_dependencies(
                repo,
                WebhookSecret::new(WEBHOOK_SECRET),
                Some(300),
            )))
            .app_data(web::Data::new(public_config()))
            .app_data(web::Data::new(jwt_config()))
            .configure(modules::configure);
    }
}

fn token(user_id: &Uuid) -> String {
    Claims::new(user_id, 300).encode(&jwt_config()).unwrap()
}

fn bearer(user_id: &Uuid) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id)))
}

fn signed_webhook_at(body: &str, timestamp: i64) -> test::TestRequest {
    let ts = timestamp.to_string();
    let sig = signature::sign(&WebhookSecret::new(WEBHOOK_SECRET), Some(&ts), body.as_bytes());
    test::TestRequest::post()
        .uri("/webhook/filestack")
        .insert_header((signature::SIGNATURE_HEADER, sig))
        .insert_header((signature::TIMESTAMP_HEADER, ts))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

fn signed_webhook(body: &str) -> test::TestRequest {
    signed_webhook_at(body, chrono::Utc::now().timestamp())
}

fn descriptor(handle: &str) -> Value {
    json!({
        "handle": handle,
        "url": "https://cdn/x",
        "mimetype": "image/png",
        "size": 1024,
        "filename": "a.png",
        "uploadDate": 1_700_000_000_000i64
    })
}

#[actix_web::test]
async fn upload_then_webhook_confirms_the_record() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    let user = Uuid::now_v7();

    let req = test::TestRequest::post()
        .uri("/upload-result")
        .insert_header(bearer(&user))
        .set_json(descriptor("abc123"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ok"], true);

    let upload = repo.find_by_handle("abc123").await.unwrap().unwrap();
    assert_eq!(upload.status, UploadStatus::Uploaded);
    assert_eq!(upload.owner_id, Some(user));

    let webhook = r#"{"handle":"abc123","outcome":"success"}"#;
    for _ in 0..2 {
        let resp = test::call_service(&app, signed_webhook(webhook).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["ok"], true);
        assert_eq!(
            repo.find_by_handle("abc123").await.unwrap().unwrap().status,
            UploadStatus::Confirmed
        );
    }
}

#[actix_web::test]
async fn repeated_client_reports_leave_one_record() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    let user = Uuid::now_v7();

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/upload-result")
            .insert_header(bearer(&user))
            .set_json(descriptor("abc123"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    assert_eq!(repo.len().await, 1);
}

#[actix_web::test]
async fn upload_result_requires_a_caller_identity() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;

    // Middleware rejections surface as service errors rather than responses.
    let req =
        test::TestRequest::post().uri("/upload-result").set_json(descriptor("abc123")).to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 401);

    let req = test::TestRequest::post()
        .uri("/upload-result")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .set_json(descriptor("abc123"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 401);

    let req = test::TestRequest::post()
        .uri("/upload-result")
        .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "not-a-token"))
        .set_json(descriptor("abc123"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 401);

    assert_eq!(repo.len().await, 0);
}

#[actix_web::test]
async fn session_cookie_identifies_the_caller() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    let user = Uuid::now_v7();

    let req = test::TestRequest::post()
        .uri("/upload-result")
        .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, token(&user)))
        .set_json(descriptor("abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let upload = repo.find_by_handle("abc123").await.unwrap().unwrap();
    assert_eq!(upload.owner_id, Some(user));
}

#[actix_web::test]
async fn malformed_descriptors_are_rejected_with_400() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    let user = Uuid::now_v7();

    let mut missing_handle = descriptor("abc123");
    missing_handle.as_object_mut().unwrap().remove("handle");
    let mut empty_url = descriptor("abc123");
    empty_url["url"] = json!("");
    let mut negative_size = descriptor("abc123");
    negative_size["size"] = json!(-5);
    let mut blocked_type = descriptor("abc123");
    blocked_type["mimetype"] = json!("application/x-msdownload");
    let mut untyped = descriptor("abc123");
    untyped.as_object_mut().unwrap().remove("mimetype");
    untyped["filename"] = json!("payload.exe");
    let mut too_large = descriptor("abc123");
    too_large["size"] = json!(50 * 1024 * 1024);

    let payloads = [missing_handle, empty_url, negative_size, blocked_type, untyped, too_large];
    for payload in payloads {
        let req = test::TestRequest::post()
            .uri("/upload-result")
            .insert_header(bearer(&user))
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{payload}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["ok"], false);
    }

    assert_eq!(repo.len().await, 0);
}

#[actix_web::test]
async fn webhook_with_a_bad_signature_is_401_and_writes_nothing() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    let user = Uuid::now_v7();

    let req = test::TestRequest::post()
        .uri("/upload-result")
        .insert_header(bearer(&user))
        .set_json(descriptor("abc123"))
        .to_request();
    test::call_service(&app, req).await;
    let writes = repo.write_count();

    let original = r#"{"handle":"abc123","outcome":"success"}"#;
    let sig = signature::sign(&WebhookSecret::new(WEBHOOK_SECRET), None, original.as_bytes());
    let req = test::TestRequest::post()
        .uri("/webhook/filestack")
        .insert_header((signature::SIGNATURE_HEADER, sig))
        .set_payload(r#"{"handle":"abc123","outcome":"failure"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req =
        test::TestRequest::post().uri("/webhook/filestack").set_payload(original).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let an_hour_ago = chrono::Utc::now().timestamp() - 3600;
    let stale = signed_webhook_at(original, an_hour_ago);
    let resp = test::call_service(&app, stale.to_request()).await;
    assert_eq!(resp.status(), 401);

    assert_eq!(repo.write_count(), writes);
    let upload = repo.find_by_handle("abc123").await.unwrap().unwrap();
    assert_eq!(upload.status, UploadStatus::Uploaded);
}

#[actix_web::test]
async fn webhook_for_unknown_handle_is_acknowledged() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;

    let webhook = signed_webhook(r#"{"handle":"ghost","outcome":"success"}"#);
    let resp = test::call_service(&app, webhook.to_request()).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(repo.len().await, 0);
}

#[actix_web::test]
async fn webhook_during_store_outage_asks_for_redelivery() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    repo.set_unavailable(true);

    let webhook = signed_webhook(r#"{"handle":"abc123","outcome":"success"}"#);
    let resp = test::call_service(&app, webhook.to_request()).await;

    assert_eq!(resp.status(), 503);
}

#[actix_web::test]
async fn upload_config_exposes_only_public_settings() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo))).await;

    let req = test::TestRequest::get().uri("/upload-config").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["api_key"], "public-api-key");
    assert_eq!(body["data"]["accept"], json!(["image/png", "image/jpeg"]));
    assert!(!body.to_string().contains(WEBHOOK_SECRET));
}

#[actix_web::test]
async fn callers_can_poll_their_own_uploads_only() {
    let repo = Arc::new(UploadRepositoryMemory::new());
    let app = test::init_service(App::new().configure(configure_app(repo.clone()))).await;
    let alice = Uuid::now_v7();
    let bob = Uuid::now_v7();

    let req = test::TestRequest::post()
        .uri("/upload-result")
        .insert_header(bearer(&alice))
        .set_json(descriptor("abc123"))
        .to_request();
    test::call_service(&app, req).await;

    let req =
        test::TestRequest::get().uri("/uploads/abc123").insert_header(bearer(&alice)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["externalHandle"], "abc123");
    assert_eq!(body["data"]["status"], "uploaded");

    let req =
        test::TestRequest::get().uri("/uploads/abc123").insert_header(bearer(&bob)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get()
        .uri("/uploads?limit=10")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let req = test::TestRequest::get()
        .uri("/uploads?limit=0")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
