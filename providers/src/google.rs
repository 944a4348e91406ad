//! Google ID token verification via the `tokeninfo` endpoint.

use serde::Deserialize;
use url::Url;

use crate::{VerifyError, endpoint};

const PROVIDER: &str = "google";

/// The identity a valid Google ID token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Stable Google account id (`sub`).
    pub subject: String,
    pub email: String,
    /// Falls back to the email when Google reports no name.
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    aud: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
}

impl GoogleVerifier {
    /// `client_id`, when set, must match the token's `aud` claim.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            client_id,
        }
    }

    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, VerifyError> {
        let url = Url::parse_with_params(
            &endpoint(&self.base_url, "tokeninfo"),
            &[("id_token", id_token)],
        )
        .map_err(|source| VerifyError::Endpoint {
            provider: PROVIDER,
            source,
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| VerifyError::Transport {
                provider: PROVIDER,
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "Google tokeninfo rejected token");
            return Err(VerifyError::Rejected {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }
        let info: TokenInfo = response.json().await.map_err(|source| VerifyError::Transport {
            provider: PROVIDER,
            source,
        })?;

        if let Some(expected) = self.client_id.as_deref()
            && info.aud.as_deref() != Some(expected)
        {
            tracing::warn!(aud = ?info.aud, "Google token audience mismatch");
            return Err(VerifyError::AudienceMismatch { provider: PROVIDER });
        }

        let email = info
            .email
            .filter(|email| !email.is_empty())
            .ok_or(VerifyError::MissingClaim {
                provider: PROVIDER,
                claim: "email",
            })?;
        let subject = info
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(VerifyError::MissingClaim {
                provider: PROVIDER,
                claim: "sub",
            })?;

        Ok(GoogleIdentity {
            subject,
            name: info.name.unwrap_or_else(|| email.clone()),
            email,
            picture: info.picture,
        })
    }
}
