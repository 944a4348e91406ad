//! Registration, logins, password reset and the login audit over HTTP.

use hyper::StatusCode;
use serde_json::json;
use wiremock::matchers::{path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fleet_types::{AccountStatus, UserId, UserRole};

use crate::common::{PASSWORD, TestApp, id_of};

#[tokio::test]
async fn register_joins_first_org_as_driver() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    app.org("Later Co");

    let token = app.register("ana@example.com", "DRIVER").await;
    let me = app.get("/api/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["email"], "ana@example.com");
    assert_eq!(me.data()["role"], "DRIVER");
    assert_eq!(me.data()["orgId"], acme.id.to_string());
}

#[tokio::test]
async fn register_rejects_taken_email_case_insensitively() {
    let app = TestApp::new();
    app.register("ana@example.com", "DRIVER").await;

    let reply = app
        .public_post(
            "/api/auth/register",
            json!({"name": "Ana", "email": "ANA@Example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.code(), "EMAIL_EXISTS");
}

#[tokio::test]
async fn register_lists_every_invalid_field() {
    let app = TestApp::new();
    let reply = app
        .public_post("/api/auth/register", json!({"email": "nope", "password": "short"}))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.code(), "VALIDATION");
    let fields: Vec<&str> = reply.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email", "password"]);
}

#[tokio::test]
async fn failed_login_is_audited() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    app.register("ana@example.com", "DRIVER").await;

    let wrong = app
        .public_post(
            "/api/auth/login",
            json!({"email": "ana@example.com", "password": "not the password"}),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.code(), "INVALID_CREDENTIALS");

    let right = app
        .public_post(
            "/api/auth/login",
            json!({"email": "ana@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(right.status, StatusCode::OK);
    assert!(right.data()["token"].is_string());

    let admin = app.admin(acme.id);
    let audit = app.get("/api/auth/audit?search=failed", &admin.token).await;
    assert_eq!(audit.status, StatusCode::OK);
    assert_eq!(audit.body["total"], 1);
    assert_eq!(audit.body["page"], 1);
    assert_eq!(audit.body["limit"], 20);
    let entry = &audit.body["data"][0];
    assert_eq!(entry["action"], "LOGIN_FAILED");
    assert_eq!(entry["ip"], "203.0.113.7");
    assert_eq!(entry["userAgent"], "fleet-tests/1.0");
    assert_eq!(entry["user"]["email"], "ana@example.com");

    let all = app.get("/api/auth/audit?limit=500", &admin.token).await;
    assert_eq!(all.body["total"], 2);
    assert_eq!(all.body["limit"], 100);
}

#[tokio::test]
async fn unknown_email_fails_without_audit() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let reply = app
        .public_post(
            "/api/auth/login",
            json!({"email": "ghost@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let admin = app.admin(acme.id);
    let audit = app.get("/api/auth/audit", &admin.token).await;
    assert_eq!(audit.body["total"], 0);
}

#[tokio::test]
async fn audit_is_admin_only() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    for role in [UserRole::Driver, UserRole::Auditor] {
        let session = app.session(Some(acme.id), role);
        let reply = app.get("/api/auth/audit", &session.token).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.code(), "FORBIDDEN");
    }
}

#[tokio::test]
async fn password_reset_is_single_use() {
    let app = TestApp::new();
    app.register("ana@example.com", "DRIVER").await;

    let unknown = app
        .public_post("/api/auth/forgot-password", json!({"email": "ghost@example.com"}))
        .await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(unknown.data(), &json!({"ok": true}));

    let forgot = app
        .public_post("/api/auth/forgot-password", json!({"email": "ana@example.com"}))
        .await;
    let token = forgot.data()["resetToken"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let short = app
        .public_post(
            "/api/auth/reset-password",
            json!({"token": token, "newPassword": "short"}),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["errors"][0]["field"], "newPassword");

    let reset = json!({"token": token, "newPassword": "brand new secret"});
    let done = app.public_post("/api/auth/reset-password", reset.clone()).await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.data(), &json!({"ok": true}));

    let again = app.public_post("/api/auth/reset-password", reset).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.code(), "INVALID_TOKEN");

    let old = app
        .public_post(
            "/api/auth/login",
            json!({"email": "ana@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = app
        .public_post(
            "/api/auth/login",
            json!({"email": "ana@example.com", "password": "brand new secret"}),
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn production_hides_reset_token() {
    let app = TestApp::with_config("[app]\nenvironment = \"production\"\n");
    app.register("ana@example.com", "DRIVER").await;
    let forgot = app
        .public_post("/api/auth/forgot-password", json!({"email": "ana@example.com"}))
        .await;
    assert_eq!(forgot.data(), &json!({"ok": true}));
}

#[tokio::test]
async fn frozen_account_is_locked_out() {
    let app = TestApp::new();
    let token = app.register("ana@example.com", "DRIVER").await;
    let me = app.get("/api/auth/me", &token).await;
    let id = UserId::parse(&id_of(me.data())).unwrap();
    app.store().set_user_status(id, AccountStatus::Frozen).unwrap();

    let login = app
        .public_post(
            "/api/auth/login",
            json!({"email": "ana@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);
    assert_eq!(login.code(), "ACCOUNT_DISABLED");

    let me = app.get("/api/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_bearer_tokens_are_unauthorized() {
    let app = TestApp::new();
    for token in ["garbage", "a.b.c"] {
        let reply = app.get("/api/vehicles", token).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.code(), "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn google_login_creates_a_driver() {
    let google = MockServer::start().await;
    Mock::given(path("/tokeninfo"))
        .and(query_param("id_token", "good-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "g-123",
            "email": "Mila@Example.com",
            "name": "Mila",
        })))
        .mount(&google)
        .await;
    let app = TestApp::with_config(&format!(
        "[oauth]\ngoogle_tokeninfo_url = \"{}\"\n",
        google.uri()
    ));

    let reply = app
        .public_post("/api/auth/google", json!({"idToken": "good-token"}))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.data()["user"]["role"], "DRIVER");
    assert_eq!(reply.data()["user"]["email"], "mila@example.com");

    let again = app
        .public_post("/api/auth/google", json!({"idToken": "good-token"}))
        .await;
    assert_eq!(again.data()["user"]["id"], reply.data()["user"]["id"]);

    let rejected = app
        .public_post("/api/auth/google", json!({"idToken": "forged"}))
        .await;
    assert_eq!(rejected.status, StatusCode::UNAUTHORIZED);
    assert_eq!(rejected.code(), "INVALID_OAUTH_TOKEN");

    let missing = app.public_post("/api/auth/google", json!({})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["errors"][0]["message"], "idToken is required");
}

#[tokio::test]
async fn facebook_without_app_is_unavailable() {
    let app = TestApp::new();
    let reply = app
        .public_post("/api/auth/facebook", json!({"accessToken": "anything"}))
        .await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.code(), "OAUTH_NOT_CONFIGURED");
}

#[tokio::test]
async fn dev_login_needs_the_shared_secret() {
    let closed = TestApp::new();
    let reply = closed
        .public_post("/api/auth/dev", json!({"secret": "letmein-please"}))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let app = TestApp::with_config("dev_secret = \"letmein-please\"\n");
    let wrong = app
        .public_post("/api/auth/dev", json!({"secret": "nope"}))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let ok = app
        .public_post("/api/auth/dev", json!({"secret": "letmein-please"}))
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.data()["user"]["role"], "ADMIN");
}
