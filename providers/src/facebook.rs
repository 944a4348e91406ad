//! Facebook access token verification via the Graph API.

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::{VerifyError, endpoint};

const PROVIDER: &str = "facebook";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacebookIdentity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Me {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<Picture>,
}

#[derive(Debug, Deserialize)]
struct Picture {
    data: Option<PictureData>,
}

#[derive(Debug, Deserialize)]
struct PictureData {
    url: Option<String>,
}

/// App credentials. Login is refused without both.
#[derive(Clone)]
pub struct FacebookApp {
    pub app_id: String,
    pub app_secret: String,
}

impl fmt::Debug for FacebookApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacebookApp")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FacebookVerifier {
    client: reqwest::Client,
    base_url: String,
    app: Option<FacebookApp>,
}

impl FacebookVerifier {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, app: Option<FacebookApp>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            app,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.app.is_some()
    }

    pub async fn verify(&self, access_token: &str) -> Result<FacebookIdentity, VerifyError> {
        if self.app.is_none() {
            return Err(VerifyError::NotConfigured { provider: PROVIDER });
        }

        let url = Url::parse_with_params(
            &endpoint(&self.base_url, "me"),
            &[
                ("access_token", access_token),
                ("fields", "id,name,email,picture"),
            ],
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
            tracing::debug!(%status, "Facebook Graph rejected token");
            return Err(VerifyError::Rejected {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }
        let me: Me = response.json().await.map_err(|source| VerifyError::Transport {
            provider: PROVIDER,
            source,
        })?;

        let id = me
            .id
            .filter(|id| !id.is_empty())
            .ok_or(VerifyError::MissingClaim {
                provider: PROVIDER,
                claim: "id",
            })?;

        Ok(FacebookIdentity {
            id,
            email: me.email.filter(|email| !email.is_empty()),
            name: me.name,
            picture: me.picture.and_then(|p| p.data).and_then(|d| d.url),
        })
    }
}
