//! Bounded document download.

use std::time::Duration;

use thiserror::Error;

/// Largest document the integrity check will hash.
pub const MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported URL scheme in {0}")]
    Scheme(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl DocumentFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = crate::base_client_builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client, max_bytes })
    }

    /// Download `url` fully into memory, failing once `max_bytes` is exceeded.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = url::Url::parse(url).map_err(|_| FetchError::Scheme(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::Scheme(url.to_string()));
        }

        let mut response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX);
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        tracing::debug!(bytes = body.len(), "Fetched document");
        Ok(body)
    }
}
