//! HTTP/JSON surface of the Fleet service.
//!
//! [`handle`] turns one request into one response: route resolution, body
//! collection under a size cap, bearer authentication, dispatch onto
//! [`Fleet`] and error rendering. [`serve`] runs the accept loop.

#![allow(clippy::missing_errors_doc)]

mod body;
mod forms;
mod reply;
mod routes;

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use fleet_core::{ApiError, Fleet, LoginMeta};

use crate::body::Query;
use crate::reply::HttpResponse;
use crate::routes::Route;

/// Shared state of the listener: the service layer plus request limits.
pub struct App {
    fleet: Fleet,
    max_body_bytes: usize,
    production: bool,
}

impl App {
    #[must_use]
    pub fn new(fleet: Fleet, max_body_bytes: usize) -> Self {
        let production = fleet.environment().is_production();
        Self {
            fleet,
            max_body_bytes,
            production,
        }
    }

    #[must_use]
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }
}

fn method_not_allowed(allowed: &[Method], production: bool) -> HttpResponse {
    let err = ApiError::Rejected {
        status: 405,
        code: "METHOD_NOT_ALLOWED",
        message: "Method not allowed".to_string(),
    };
    let mut response = reply::error(&err, production);
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

fn payload_too_large(limit: usize) -> ApiError {
    ApiError::Rejected {
        status: 413,
        code: "PAYLOAD_TOO_LARGE",
        message: format!("Request body exceeds {limit} bytes"),
    }
}

async fn read_body<B>(body: B, limit: usize) -> Result<Vec<u8>, ApiError>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes().to_vec()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(payload_too_large(limit))
        }
        Err(err) => {
            tracing::debug!("Failed to read request body: {err}");
            Err(ApiError::bad_request("INVALID_BODY", "Could not read request body"))
        }
    }
}

fn header_str<'a>(request: &'a Request<impl Body>, name: header::HeaderName) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

async fn dispatch<B>(app: &App, remote: SocketAddr, request: Request<B>) -> Result<HttpResponse, ApiError>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    if request.method() == Method::OPTIONS {
        return Ok(reply::no_content());
    }
    let path = request.uri().path().to_string();
    let route = Route::resolve(&path).ok_or_else(|| ApiError::not_found("Not found"))?;
    if !route.allows().contains(request.method()) {
        return Ok(method_not_allowed(route.allows(), app.production));
    }

    let meta = LoginMeta {
        ip: Some(remote.ip().to_string()),
        user_agent: header_str(&request, header::USER_AGENT).map(str::to_string),
    };
    let caller = if route.requires_auth() {
        Some(
            app.fleet
                .authenticate(header_str(&request, header::AUTHORIZATION))?,
        )
    } else {
        None
    };

    let (parts, body) = request.into_parts();
    let bytes = read_body(body, app.max_body_bytes).await?;
    let req = routes::Request {
        method: &parts.method,
        query: Query::parse(parts.uri.query()),
        body: &bytes,
        meta,
    };

    match (route, caller) {
        (Route::Health, _) => reply::json(StatusCode::OK, &serde_json::json!({"status": "ok"})),
        (route, Some(caller)) => routes::protected(&app.fleet, &caller, route, &req).await,
        (Route::Auth(action), None) => routes::public(&app.fleet, action, &req).await,
        (_, None) => Err(ApiError::unauthorized("UNAUTHORIZED", "Unauthorized")),
    }
}

/// Handle one request. Never fails: errors become JSON error responses.
pub async fn handle<B>(app: &App, remote: SocketAddr, request: Request<B>) -> HttpResponse
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let origin = request.headers().get(header::ORIGIN).cloned();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = match dispatch(app, remote, request).await {
        Ok(response) => response,
        Err(err) => reply::error(&err, app.production),
    };
    tracing::debug!(%method, %path, status = response.status().as_u16(), "Handled request");
    reply::decorate(&mut response, origin.as_ref());
    response
}

/// Accept connections until `shutdown` resolves. Each connection runs on its
/// own task; connections still open at shutdown are dropped.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => {
                tracing::info!("Shutting down listener");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::warn!("Failed to accept connection: {err}");
                        continue;
                    }
                };
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    let service = service_fn(move |request: Request<Incoming>| {
                        let app = Arc::clone(&app);
                        async move { Ok::<_, Infallible>(handle(&app, remote, request).await) }
                    });
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        tracing::debug!(%remote, "Connection closed with error: {err}");
                    }
                });
            }
        }
    }
}
