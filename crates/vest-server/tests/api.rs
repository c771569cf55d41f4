//! End-to-end HTTP tests driven through `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use vest_auth::{TokenSigner, hash_password};
use vest_config::VestConfig;
use vest_core::enums::Role;
use vest_db::repos::user::NewUser;
use vest_db::service::VestService;
use vest_mail::Mailer;
use vest_server::{AppState, app};

const BOUNDARY: &str = "vest-test-boundary";
const ADMIN_PASSWORD: &str = "back-office-1";
const MAX_UPLOAD_BYTES: usize = 1_024;

struct TestApp {
    router: Router,
    admin_token: String,
    _uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let uploads = TempDir::new().unwrap();
        let mut config = VestConfig::default();
        config.server.upload_dir = uploads.path().to_string_lossy().into_owned();
        config.server.max_upload_bytes = MAX_UPLOAD_BYTES;

        let service = VestService::new_local(":memory:").await.unwrap();
        service
            .create_user(NewUser {
                name: "Operations".into(),
                email: "ops@vest.local".into(),
                phone: None,
                password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        let signer = TokenSigner::new("integration-secret-with-enough-bytes", "vest", 3_600);
        let state = AppState::new(service, signer, Mailer::disabled(), config);
        let mut test = Self {
            router: app(state),
            admin_token: String::new(),
            _uploads: uploads,
        };
        let (status, body) = test
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": "ops@vest.local", "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        test.admin_token = body["token"].as_str().unwrap().to_string();
        test
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn multipart(&self, uri: &str, token: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "name": name, "email": email, "password": "correct-horse-9" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_index(&self, name: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/admin/indices",
                Some(&self.admin_token),
                json!({
                    "name": name,
                    "risk_level": "medium",
                    "min_investment_cents": 10_000,
                    "target_weekly_rate_bps": 200
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Submit KYC with a PNG document and have the admin approve it.
    async fn verify(&self, token: &str) {
        let (status, body) = self.multipart("/api/kyc", token, &kyc_parts(b"\x89PNG fake")).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let kyc_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .json(
                Method::POST,
                &format!("/api/admin/kyc/{kyc_id}/approve"),
                Some(&self.admin_token),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Create and approve a payment, returning the resulting investment id.
    async fn invest(&self, token: &str, index_id: &str, amount_cents: i64) -> String {
        let (status, payment) = self
            .json(
                Method::POST,
                "/api/payments",
                Some(token),
                json!({
                    "index_id": index_id,
                    "amount_cents": amount_cents,
                    "method": "bank_transfer",
                    "reference": "TRX-1"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{payment}");

        let (status, approved) = self
            .json(
                Method::POST,
                &format!("/api/admin/payments/{}/approve", payment["id"].as_str().unwrap()),
                Some(&self.admin_token),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{approved}");
        approved["investment_id"].as_str().unwrap().to_string()
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::File {
                name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn kyc_parts(document: &[u8]) -> Vec<Part<'_>> {
    vec![
        Part::Text("full_name", "Ada Obi"),
        Part::Text("date_of_birth", "1990-04-12"),
        Part::Text("address", "12 Marina Road"),
        Part::Text("country", "NG"),
        Part::Text("id_type", "passport"),
        Part::Text("id_number", "A01234567"),
        Part::File {
            name: "document",
            content_type: "image/png",
            bytes: document,
        },
    ]
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "local");
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = TestApp::new().await;
    let token = app.register("Ada Obi", "Ada@Example.com").await;

    let (status, me) = app.get("/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["kyc_status"], "not_submitted");

    let (status, _) = app
        .json(
            Method::PATCH,
            "/api/me",
            Some(&token),
            json!({ "phone": "+2348000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, me) = app.get("/api/me", Some(&token)).await;
    assert_eq!(me["phone"], "+2348000000000");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "correct-horse-9" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-horse-9" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    app.register("Ada", "ada@example.com").await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "name": "Other", "email": "ADA@example.com", "password": "correct-horse-9" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn weak_password_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation");
}

#[tokio::test]
async fn protected_routes_require_the_right_caller() {
    let app = TestApp::new().await;
    let token = app.register("Ada", "ada@example.com").await;

    let (status, _) = app.get("/api/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/dashboard", Some("not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, _) = app.get("/api/admin/stats", Some(&app.admin_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn payments_require_verified_identity() {
    let app = TestApp::new().await;
    let index_id = app.create_index("Tech Growth").await;
    let token = app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/payments",
            Some(&token),
            json!({ "index_id": index_id, "amount_cents": 50_000, "method": "bank_transfer" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");
}

#[tokio::test]
async fn investor_lifecycle_over_http() {
    let app = TestApp::new().await;
    let index_id = app.create_index("Tech Growth").await;
    let token = app.register("Ada", "ada@example.com").await;
    app.verify(&token).await;

    let (_, kyc) = app.get("/api/kyc", Some(&token)).await;
    assert_eq!(kyc["kyc_status"], "approved");

    let investment_id = app.invest(&token, "tech-growth", 100_000).await;

    let (status, investments) = app.get("/api/investments", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(investments.as_array().unwrap().len(), 1);

    let distribute = json!({ "rate_bps": 250, "period": "2026-W10" });
    let uri = format!("/api/admin/indices/{index_id}/distributions");
    let (status, report) = app
        .json(Method::POST, &uri, Some(&app.admin_token), distribute.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    assert_eq!(report["distribution"]["total_amount_cents"], 2_500);
    assert_eq!(report["credits"][0]["investment_id"], investment_id.as_str());

    let (status, body) = app
        .json(Method::POST, &uri, Some(&app.admin_token), distribute)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (_, detail) = app
        .get(&format!("/api/investments/{investment_id}"), Some(&token))
        .await;
    assert_eq!(detail["investment"]["total_returns_cents"], 2_500);
    assert_eq!(detail["returns"].as_array().unwrap().len(), 1);

    let (_, dashboard) = app.get("/api/dashboard", Some(&token)).await;
    assert_eq!(dashboard["balance"]["withdrawable_cents"], 2_500);

    let withdraw = |amount: i64| {
        json!({ "amount_cents": amount, "method": "mobile_money", "destination": "+2348000000000" })
    };
    let (status, withdrawal) = app
        .json(Method::POST, "/api/withdrawals", Some(&token), withdraw(2_000))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{withdrawal}");

    let (status, body) = app
        .json(Method::POST, "/api/withdrawals", Some(&token), withdraw(1_000))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "insufficient_funds");

    let wid = withdrawal["id"].as_str().unwrap();
    for step in ["approve", "paid"] {
        let (status, body) = app
            .json(
                Method::POST,
                &format!("/api/admin/withdrawals/{wid}/{step}"),
                Some(&app.admin_token),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{step}: {body}");
    }

    let (_, listing) = app.get("/api/withdrawals", Some(&token)).await;
    assert_eq!(listing["items"][0]["status"], "paid");
    assert_eq!(listing["balance"]["withdrawable_cents"], 500);

    let (_, stats) = app.get("/api/admin/stats", Some(&app.admin_token)).await;
    assert_eq!(stats["assets_under_management_cents"], 100_000);

    let (_, audit) = app
        .get("/api/admin/audit?action=distributed", Some(&app.admin_token))
        .await;
    assert_eq!(audit.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn other_investors_cannot_see_foreign_records() {
    let app = TestApp::new().await;
    let index_id = app.create_index("Tech Growth").await;
    let owner = app.register("Ada", "ada@example.com").await;
    app.verify(&owner).await;
    let investment_id = app.invest(&owner, &index_id, 50_000).await;

    let stranger = app.register("Bola", "bola@example.com").await;
    let (status, body) = app
        .get(&format!("/api/investments/{investment_id}"), Some(&stranger))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn admin_can_fetch_stored_kyc_document() {
    let app = TestApp::new().await;
    let token = app.register("Ada", "ada@example.com").await;
    let (status, body) = app.multipart("/api/kyc", &token, &kyc_parts(b"\x89PNG doc")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let request = Request::builder()
        .uri(format!("/api/admin/kyc/{}/files/document", body["id"].as_str().unwrap()))
        .header(AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"\x89PNG doc");
}

#[tokio::test]
async fn uploads_are_checked_for_type_and_size() {
    let app = TestApp::new().await;
    let token = app.register("Ada", "ada@example.com").await;

    let mut parts = kyc_parts(b"plain text");
    parts.pop();
    parts.push(Part::File {
        name: "document",
        content_type: "text/plain",
        bytes: b"plain text",
    });
    let (status, body) = app.multipart("/api/kyc", &token, &parts).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "unsupported_media_type");

    let oversized = vec![0x89; MAX_UPLOAD_BYTES + 1];
    let (status, body) = app.multipart("/api/kyc", &token, &kyc_parts(&oversized)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "payload_too_large");

    let (_, kyc) = app.get("/api/kyc", Some(&token)).await;
    assert_eq!(kyc["submission"], Value::Null);
}

#[tokio::test]
async fn distribution_rejects_periods_that_would_not_reparse() {
    let app = TestApp::new().await;
    let index_id = app.create_index("Tech Growth").await;
    let token = app.register("Ada", "ada@example.com").await;
    app.verify(&token).await;
    let investment_id = app.invest(&token, &index_id, 100_000).await;

    let uri = format!("/api/admin/indices/{index_id}/distributions");
    for period in ["0999-W10", "+999-W10"] {
        let (status, body) = app
            .json(
                Method::POST,
                &uri,
                Some(&app.admin_token),
                json!({ "rate_bps": 250, "period": period }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{period}: {body}");
        assert_eq!(body["error"]["code"], "bad_request");
    }

    let (status, history) = app.get(&uri, Some(&app.admin_token)).await;
    assert_eq!(status, StatusCode::OK, "{history}");
    assert_eq!(history.as_array().unwrap().len(), 0);

    let (status, detail) = app
        .get(&format!("/api/investments/{investment_id}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK, "{detail}");
    assert_eq!(detail["returns"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_fail_alike() {
    let app = TestApp::new().await;
    app.register("Ada", "ada@example.com").await;

    let (wrong_status, wrong_body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-horse-9" }),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "wrong-horse-9" }),
        )
        .await;
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, wrong_status);
    assert_eq!(unknown_body, wrong_body);
}
