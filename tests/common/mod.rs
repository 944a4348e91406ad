//! Shared test utilities and fixtures
//!
//! [`TestApp`] wraps an in-process server over an in-memory store. Requests
//! go straight to `fleet_server::handle`, no socket involved.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap};
use hyper::{Method, Request, StatusCode};
use serde_json::Value;

use fleet_config::Settings;
use fleet_core::Fleet;
use fleet_core::auth::JwtKeys;
use fleet_server::App;
use fleet_store::{Store, Write, now};
use fleet_types::{AccountStatus, AuthProvider, OrgId, Organization, User, UserId, UserRole};

pub const JWT_SECRET: &str = "integration-secret-0123";
pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    app: App,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    /// The `data` member of a wrapped success payload.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

/// A user plus a bearer token for it.
pub struct Session {
    pub user: User,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// `extra` is appended to a config that only sets the JWT secret.
    pub fn with_config(extra: &str) -> Self {
        let toml = format!("[auth]\njwt_secret = \"{JWT_SECRET}\"\n{extra}");
        let settings = Settings::from_toml_str(&toml, |_| None).expect("settings");
        let store = Store::open_in_memory().expect("store");
        let fleet = Fleet::new(store, &settings).expect("fleet");
        Self {
            app: App::new(fleet, settings.server.max_body_bytes),
        }
    }

    pub fn fleet(&self) -> &Fleet {
        self.app.fleet()
    }

    pub fn store(&self) -> &Store {
        self.fleet().store()
    }

    pub fn org(&self, name: &str) -> Organization {
        self.store().create_org(name).expect("create org")
    }

    /// Insert a user directly and mint a token for it.
    pub fn session(&self, org: Option<OrgId>, role: UserRole) -> Session {
        let at = now();
        let id = UserId::new_v4();
        let email = format!("{}@example.com", id.value().simple());
        let user = User {
            id,
            org_id: org,
            email: email.clone(),
            name: format!("{role} {}", &email[..6]),
            picture: None,
            provider: AuthProvider::Email,
            provider_id: email,
            password_hash: None,
            role,
            status: AccountStatus::Active,
            created_at: at,
            updated_at: at,
        };
        assert_eq!(self.store().insert_user(&user).expect("insert user"), Write::Done);
        let keys = JwtKeys::new(JWT_SECRET, Duration::from_secs(3600)).expect("keys");
        let token = keys.issue(&user).expect("token");
        Session { user, token }
    }

    pub fn admin(&self, org: OrgId) -> Session {
        self.session(Some(org), UserRole::Admin)
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::USER_AGENT, "fleet-tests/1.0");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let bytes = body.map(|value| value.to_string()).unwrap_or_default();
        let request = builder
            .body(Full::new(Bytes::from(bytes)))
            .expect("request");

        let remote = SocketAddr::from(([203, 0, 113, 7], 51000));
        let response = fleet_server::handle(&self.app, remote, request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw).expect("json body")
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, token: &str) -> Reply {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Reply {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Reply {
        self.send(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Reply {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    /// Unauthenticated POST, as the login family takes.
    pub async fn public_post(&self, path: &str, body: Value) -> Reply {
        self.send(Method::POST, path, None, Some(body)).await
    }

    /// Register through the API and return the issued token.
    pub async fn register(&self, email: &str, role: &str) -> String {
        let reply = self
            .public_post(
                "/api/auth/register",
                serde_json::json!({
                    "name": "Test User",
                    "email": email,
                    "password": PASSWORD,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.data()["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    /// Create a vehicle over HTTP and return its id.
    pub async fn vehicle(&self, token: &str, make: &str) -> String {
        let reply = self
            .post(
                "/api/vehicles",
                token,
                serde_json::json!({"make": make, "model": "FH16"}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        id_of(reply.data())
    }

    pub async fn driver(&self, token: &str, name: &str) -> String {
        let reply = self
            .post("/api/drivers", token, serde_json::json!({"name": name}))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        id_of(reply.data())
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id").to_string()
}
