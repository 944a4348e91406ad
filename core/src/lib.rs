//! Fleet services.
//!
//! [`Fleet`] bundles the store, the token keys and the outbound HTTP clients.
//! Each resource module adds its operations as methods on it:
//!
//! - `auth`: registration, logins, password reset, bearer authentication
//! - `audit`: paginated login audit for administrators
//! - `vehicles`, `trailers`, `drivers`, `trips`, `fuel`, `locations`,
//!   `documents`: org-scoped records
//! - `reports`, `gps`: read-only views
//!
//! Every operation takes the [`Caller`] and returns `Result<T, ApiError>`.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)]

pub mod access;
mod audit;
pub mod auth;
mod documents;
mod drivers;
pub mod errors;
mod fuel;
mod gps;
pub mod input;
mod locations;
mod reports;
mod trailers;
mod trips;
mod vehicles;

use anyhow::{Context, Result, anyhow};
use chrono::TimeDelta;
use serde::Serialize;

use fleet_config::{Environment, Secret, Settings};
use fleet_providers::{
    DocumentFetcher, FETCH_TIMEOUT, FacebookApp, FacebookVerifier, GoogleVerifier,
    MAX_DOCUMENT_BYTES, VERIFY_TIMEOUT, http_client_with_timeout,
};
use fleet_store::Store;

pub use access::Caller;
pub use audit::AuditListing;
pub use auth::{AuthResponse, ForgotPasswordResponse};
pub use documents::DocumentFilter;
pub use errors::{ApiError, FieldError};
pub use input::{
    AuditParams, DriverPatch, LocationPatch, LoginMeta, NewDocument, NewDriver, NewFuelRecord,
    NewLocation, NewTrailer, NewTrip, NewVehicle, Patch, RegisterInput, TrailerPatch, TripPatch,
    VehiclePatch,
};
pub use reports::ReportRange;

/// `{ "ok": true }` acknowledgement for deletes and password flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

/// The service layer. One instance is shared by every request.
pub struct Fleet {
    store: Store,
    jwt: auth::JwtKeys,
    environment: Environment,
    reset_token_ttl: TimeDelta,
    dev_secret: Option<Secret>,
    google: GoogleVerifier,
    facebook: FacebookVerifier,
    fetcher: DocumentFetcher,
}

impl Fleet {
    pub fn new(store: Store, settings: &Settings) -> Result<Self> {
        let jwt = auth::JwtKeys::new(settings.auth.jwt_secret.expose(), settings.auth.token_ttl)
            .context("Failed to initialize token keys")?;
        let reset_token_ttl = TimeDelta::from_std(settings.auth.reset_token_ttl)
            .map_err(|_| anyhow!("Reset token lifetime is out of range"))?;

        let verify_client =
            http_client_with_timeout(VERIFY_TIMEOUT).context("Failed to build HTTP client")?;
        let google = GoogleVerifier::new(
            verify_client.clone(),
            settings.oauth.google_tokeninfo_url.clone(),
            settings.oauth.google_client_id.clone(),
        );
        let facebook_app = settings.oauth.facebook.as_ref().map(|app| FacebookApp {
            app_id: app.app_id.clone(),
            app_secret: app.app_secret.expose().to_string(),
        });
        let facebook = FacebookVerifier::new(
            verify_client,
            settings.oauth.facebook_graph_url.clone(),
            facebook_app,
        );
        let fetcher = DocumentFetcher::new(FETCH_TIMEOUT, MAX_DOCUMENT_BYTES)
            .context("Failed to build document fetcher")?;

        if !facebook.is_configured() {
            tracing::info!("Facebook login disabled: app id or secret missing");
        }

        Ok(Self {
            store,
            jwt,
            environment: settings.environment,
            reset_token_ttl,
            dev_secret: settings.auth.dev_secret.clone(),
            google,
            facebook,
            fetcher,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }
}
