//! End-to-end flows against a real Postgres.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use echodoc::{
    app::build_app,
    config::AppConfig,
    state::AppState,
    storage::{InMemoryMediaStore, MediaStore},
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "../src/conversion/fixtures.rs"]
mod fixtures;

use fixtures::pdf_with_text as pdf;

struct Harness {
    app: Router,
    vendor: MockServer,
    media: Arc<InMemoryMediaStore>,
}

impl Harness {
    async fn start() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("connect");
        sqlx::migrate!("./migrations").run(&db).await.expect("migrate");

        let vendor = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-narration".to_vec()))
            .mount(&vendor)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf(Some("Quarterly report"))))
            .mount(&vendor)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/revised.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf(Some("Revised report"))))
            .mount(&vendor)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/blank.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf(None)))
            .mount(&vendor)
            .await;

        let mut cfg = AppConfig::for_tests();
        cfg.database_url = database_url;
        cfg.tts.base_url = vendor.uri();
        cfg.rate_limit.max_requests = 10_000;

        let media = Arc::new(InMemoryMediaStore::new(cfg.media.public_base_url.clone()));
        let state = AppState::from_parts(db, Arc::new(cfg), media.clone() as Arc<dyn MediaStore>)
            .expect("state");

        Self {
            app: build_app(state),
            vendor,
            media,
        }
    }

    fn doc(&self, name: &str) -> String {
        format!("{}/docs/{name}", self.vendor.uri())
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn register(&self, name: &str) -> String {
        let email = format!("{}@x.com", Uuid::new_v4());
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "email": email, "name": name, "password": "secret1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create(&self, token: &str, link: &str, name: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/pdfs",
                Some(token),
                Some(json!({ "pdf_link": link, "pdf_name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["pdf"].clone()
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn register_then_login_same_identity() {
    let h = Harness::start().await;
    let email = format!("{}@x.com", Uuid::new_v4());

    let (status, reg) = h
        .call(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": email, "name": "Ann", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reg["user"]["name"], "Ann");

    let (status, login) = h
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["name"], "Ann");

    // Both tokens open the same (empty) document set.
    for token in [reg["token"].as_str().unwrap(), login["token"].as_str().unwrap()] {
        let (status, list) = h.call(Method::GET, "/api/v1/pdfs", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_is_rejected() {
    let h = Harness::start().await;
    let email = format!("{}@x.com", Uuid::new_v4());
    let body = json!({ "email": email, "name": "Ann", "password": "secret1" });

    let (status, _) = h.call(Method::POST, "/api/v1/auth/register", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, err) = h.call(Method::POST, "/api/v1/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["message"], "Email already registered");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn wrong_password_and_unknown_email_look_the_same() {
    let h = Harness::start().await;
    let email = format!("{}@x.com", Uuid::new_v4());
    h.call(
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": email, "name": "Ann", "password": "secret1" })),
    )
    .await;

    let wrong = h
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "secret2" })),
        )
        .await;
    let unknown = h
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn blank_pdf_creates_nothing() {
    let h = Harness::start().await;
    let token = h.register("Ann").await;

    let (status, body) = h
        .call(
            Method::POST,
            "/api/v1/pdfs",
            Some(&token),
            Some(json!({ "pdf_link": h.doc("blank.pdf"), "pdf_name": "Blank" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No extractable text found in PDF");

    let (status, list) = h.call(Method::GET, "/api/v1/pdfs", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
    assert!(h.media.objects().is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn created_pdf_reads_back_identically() {
    let h = Harness::start().await;
    let token = h.register("Ann").await;

    let pdf = h.create(&token, &h.doc("report.pdf"), "Report").await;
    assert_eq!(pdf["pdf_link"], h.doc("report.pdf"));
    assert!(!pdf["audio_link"].as_str().unwrap().is_empty());
    assert_eq!(pdf["pdf_name"], "Report");

    let id = pdf["_id"].as_str().unwrap();
    let (status, fetched) = h
        .call(Method::GET, &format!("/api/v1/pdfs/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, pdf);

    let (_, list) = h.call(Method::GET, "/api/v1/pdfs", Some(&token), None).await;
    assert_eq!(list, json!([pdf]));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn patch_replaces_links_and_keeps_id() {
    let h = Harness::start().await;
    let token = h.register("Ann").await;
    let original = h.create(&token, &h.doc("report.pdf"), "Report").await;
    let id = original["_id"].as_str().unwrap();

    let (status, body) = h
        .call(
            Method::PATCH,
            &format!("/api/v1/pdfs/{id}"),
            Some(&token),
            Some(json!({ "pdf_link": h.doc("revised.pdf") })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PDF updated successfully");
    let updated = &body["pdf"];
    assert_eq!(updated["_id"], original["_id"]);
    assert_eq!(updated["pdf_link"], h.doc("revised.pdf"));
    assert_ne!(updated["audio_link"], original["audio_link"]);
    assert_eq!(updated["pdf_name"], "Report");
    assert_eq!(updated["createdAt"], original["createdAt"]);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn patch_unknown_id_is_404() {
    let h = Harness::start().await;
    let token = h.register("Ann").await;
    let (status, _) = h
        .call(
            Method::PATCH,
            &format!("/api/v1/pdfs/{}", Uuid::new_v4()),
            Some(&token),
            Some(json!({ "pdf_link": h.doc("report.pdf") })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn delete_then_get_is_404_and_list_shrinks() {
    let h = Harness::start().await;
    let token = h.register("Ann").await;
    let first = h.create(&token, &h.doc("report.pdf"), "First").await;
    let second = h.create(&token, &h.doc("revised.pdf"), "Second").await;

    let (_, list) = h.call(Method::GET, "/api/v1/pdfs", Some(&token), None).await;
    assert_eq!(list, json!([second.clone(), first.clone()]));

    let id = first["_id"].as_str().unwrap();
    let (status, body) = h
        .call(Method::DELETE, &format!("/api/v1/pdfs/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PDF deleted successfully");

    let (status, _) = h
        .call(Method::GET, &format!("/api/v1/pdfs/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h
        .call(Method::DELETE, &format!("/api/v1/pdfs/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = h.call(Method::GET, "/api/v1/pdfs", Some(&token), None).await;
    assert_eq!(list, json!([second]));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn documents_are_listed_per_owner() {
    let h = Harness::start().await;
    let ann = h.register("Ann").await;
    let bob = h.register("Bob").await;
    let pdf = h.create(&ann, &h.doc("report.pdf"), "Ann's").await;

    let (_, bob_list) = h.call(Method::GET, "/api/v1/pdfs", Some(&bob), None).await;
    assert_eq!(bob_list, json!([]));

    // Reads by id are not restricted to the owner.
    let id = pdf["_id"].as_str().unwrap();
    let (status, _) = h
        .call(Method::GET, &format!("/api/v1/pdfs/{id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn token_for_missing_user_still_creates_document() {
    let h = Harness::start().await;
    let token = echodoc::auth::jwt::JwtKeys::from_config(&AppConfig::for_tests().jwt)
        .sign(Uuid::new_v4(), "Ghost")
        .unwrap();

    let pdf = h.create(&token, &h.doc("report.pdf"), "Orphan").await;
    let id = pdf["_id"].as_str().unwrap();
    let (status, fetched) = h
        .call(Method::GET, &format!("/api/v1/pdfs/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, pdf);

    let (status, body) = h.call(Method::GET, "/api/v1/pdfs", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}
