//! Outbound HTTP for Fleet.
//!
//! - [`google`] - ID token verification against Google's `tokeninfo` endpoint
//! - [`facebook`] - access token verification against the Graph API `me` endpoint
//! - [`fetch`] - bounded document download used by integrity checks
//!
//! Every client starts from one base builder so timeouts, keepalive
//! and pooling are configured in one place. Base URLs are injectable so tests
//! can point the verifiers at a local mock server.

pub mod facebook;
pub mod fetch;
pub mod google;

use std::time::Duration;

use thiserror::Error;

pub use facebook::{FacebookApp, FacebookIdentity, FacebookVerifier};
pub use fetch::{DocumentFetcher, FetchError, MAX_DOCUMENT_BYTES};
pub use google::{GoogleIdentity, GoogleVerifier};

/// Timeout for OAuth token verification round-trips.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for document downloads.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Why an OAuth token could not be turned into an identity.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{provider} login is not configured")]
    NotConfigured { provider: &'static str },
    #[error("{provider} rejected the token (HTTP {status})")]
    Rejected { provider: &'static str, status: u16 },
    #[error("{provider} token is missing {claim}")]
    MissingClaim {
        provider: &'static str,
        claim: &'static str,
    },
    #[error("{provider} token was issued for another client")]
    AudienceMismatch { provider: &'static str },
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid {provider} endpoint: {source}")]
    Endpoint {
        provider: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl VerifyError {
    /// True when the failure is on our side (missing credentials), not the token's.
    #[must_use]
    pub fn is_not_configured(&self) -> bool {
        matches!(self, VerifyError::NotConfigured { .. })
    }
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(concat!("fleet/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder().timeout(timeout).build()
}

/// Join `path` onto `base` regardless of a trailing slash on `base`.
fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://graph.facebook.com/", "/me"),
            "https://graph.facebook.com/me"
        );
        assert_eq!(endpoint("http://127.0.0.1:9000", "tokeninfo"), "http://127.0.0.1:9000/tokeninfo");
    }

    #[test]
    fn clients_build() {
        assert!(http_client_with_timeout(VERIFY_TIMEOUT).is_ok());
        assert!(DocumentFetcher::new(FETCH_TIMEOUT, MAX_DOCUMENT_BYTES).is_ok());
    }

    #[test]
    fn not_configured_is_distinguished() {
        assert!(VerifyError::NotConfigured { provider: "facebook" }.is_not_configured());
        assert!(
            !VerifyError::MissingClaim {
                provider: "google",
                claim: "email"
            }
            .is_not_configured()
        );
    }
}
