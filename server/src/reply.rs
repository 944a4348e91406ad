//! Response construction: JSON bodies, the error envelope and the headers
//! every response carries.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

use fleet_core::{ApiError, FieldError};

pub type HttpResponse = Response<Full<Bytes>>;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";

#[derive(Serialize)]
struct Envelope<'a, T> {
    data: &'a T,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

fn json_bytes(status: StatusCode, bytes: Vec<u8>) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// Serialize `value` as the whole response body.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<HttpResponse, ApiError> {
    let bytes = serde_json::to_vec(value).map_err(anyhow::Error::from)?;
    Ok(json_bytes(status, bytes))
}

/// Serialize `value` wrapped as `{"data": value}`.
pub fn data<T: Serialize>(status: StatusCode, value: &T) -> Result<HttpResponse, ApiError> {
    json(status, &Envelope { data: value })
}

pub fn ok<T: Serialize>(value: &T) -> Result<HttpResponse, ApiError> {
    data(StatusCode::OK, value)
}

pub fn created<T: Serialize>(value: &T) -> Result<HttpResponse, ApiError> {
    data(StatusCode::CREATED, value)
}

/// Render an error as `{message, code, errors?}`.
///
/// Internal errors are logged here; their text reaches the client only
/// outside production.
pub fn error(err: &ApiError, production: bool) -> HttpResponse {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match err {
        ApiError::Internal(inner) => {
            tracing::error!(error = %format!("{inner:#}"), "Request failed");
            if production {
                "Internal server error".to_string()
            } else {
                format!("{inner:#}")
            }
        }
        other => other.to_string(),
    };
    let body = ErrorBody {
        message: &message,
        code: err.code(),
        errors: Some(err.field_errors()).filter(|errors| !errors.is_empty()),
    };
    // An ErrorBody of strings always serializes.
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    json_bytes(status, bytes)
}

pub fn no_content() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Security and CORS headers. The request `Origin`, when present, is
/// reflected with credentials allowed.
pub fn decorate(response: &mut HttpResponse, origin: Option<&HeaderValue>) {
    let headers: &mut HeaderMap = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}
