//! Registration, logins, password reset and bearer authentication.

mod jwt;
mod password;

use fleet_providers::VerifyError;
use fleet_store::{Write, now};
use fleet_types::{AccountStatus, AuditAction, AuthProvider, User, UserId, UserProfile, UserRole};
use serde::Serialize;

pub use jwt::{Claims, JwtKeys, TokenError};
pub use password::MIN_PASSWORD_LEN;

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::{LoginMeta, RegisterInput};
use crate::{Ack, Fleet};

const DEV_PROVIDER_ID: &str = "dev-test-user";
const DEV_EMAIL: &str = "dev@fleet.local";
const DEV_NAME: &str = "Dev User";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub ok: bool,
    /// Echoed only outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

/// Emails are compared trimmed and lowercased.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("INVALID_CREDENTIALS", "Invalid email or password")
}

fn account_disabled() -> ApiError {
    ApiError::forbidden("ACCOUNT_DISABLED", "Account is paused or frozen")
}

fn email_taken() -> ApiError {
    ApiError::bad_request("EMAIL_EXISTS", "Email already registered")
}

fn invalid_reset_token() -> ApiError {
    ApiError::bad_request("INVALID_TOKEN", "Invalid or expired reset token")
}

fn random_hex_token() -> String {
    use std::fmt::Write as _;

    rand::random::<[u8; 32]>()
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

fn secrets_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Profile fields reported by an OAuth provider.
struct OAuthProfile<'a> {
    provider: AuthProvider,
    provider_id: &'a str,
    email: String,
    name: Option<&'a str>,
    picture: Option<&'a str>,
}

impl Fleet {
    pub async fn register(&self, input: RegisterInput) -> Result<AuthResponse, ApiError> {
        let email = normalize_email(&input.email);
        if self.store.user_by_email(&email)?.is_some() {
            return Err(email_taken());
        }

        let password_hash = password::hash_password(input.password).await?;
        let org = self.store.first_org()?;
        let at = now();
        let user = User {
            id: UserId::new_v4(),
            org_id: org.map(|org| org.id),
            email: email.clone(),
            name: input.name.trim().to_string(),
            picture: None,
            provider: AuthProvider::Email,
            provider_id: email,
            password_hash: Some(password_hash),
            role: input.role,
            status: AccountStatus::Active,
            created_at: at,
            updated_at: at,
        };
        self.insert_new_user(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "Registered user");
        self.session(&user)
    }

    pub async fn login_email(
        &self,
        email: &str,
        password: &str,
        meta: &LoginMeta,
    ) -> Result<AuthResponse, ApiError> {
        let email = normalize_email(email);
        let Some(user) = self.store.email_user(&email)? else {
            if let Some(other) = self.store.user_by_email(&email)? {
                self.record_failure(&other, meta)?;
            }
            return Err(invalid_credentials());
        };
        let Some(stored_hash) = user.password_hash.clone() else {
            self.record_failure(&user, meta)?;
            return Err(invalid_credentials());
        };
        if !password::verify_password(password.to_string(), stored_hash).await? {
            self.record_failure(&user, meta)?;
            return Err(invalid_credentials());
        }
        self.finish_login(&user, meta)
    }

    pub async fn login_google(
        &self,
        id_token: &str,
        meta: &LoginMeta,
    ) -> Result<AuthResponse, ApiError> {
        let identity = self.google.verify(id_token).await.map_err(|err| {
            tracing::warn!("Google login rejected: {err}");
            ApiError::unauthorized("INVALID_OAUTH_TOKEN", "Invalid Google token")
        })?;
        let user = self.upsert_oauth_user(&OAuthProfile {
            provider: AuthProvider::Google,
            provider_id: &identity.subject,
            email: normalize_email(&identity.email),
            name: Some(&identity.name),
            picture: identity.picture.as_deref(),
        })?;
        self.finish_login(&user, meta)
    }

    pub async fn login_facebook(
        &self,
        access_token: &str,
        meta: &LoginMeta,
    ) -> Result<AuthResponse, ApiError> {
        let identity = self
            .facebook
            .verify(access_token)
            .await
            .map_err(|err| match err {
                VerifyError::NotConfigured { .. } => {
                    ApiError::unavailable("OAUTH_NOT_CONFIGURED", "Facebook OAuth not configured")
                }
                err => {
                    tracing::warn!("Facebook login rejected: {err}");
                    ApiError::unauthorized("INVALID_OAUTH_TOKEN", "Invalid Facebook token")
                }
            })?;
        let email = identity
            .email
            .as_deref()
            .map_or_else(|| format!("{}@facebook.com", identity.id), normalize_email);
        let user = self.upsert_oauth_user(&OAuthProfile {
            provider: AuthProvider::Facebook,
            provider_id: &identity.id,
            email,
            name: identity.name.as_deref(),
            picture: identity.picture.as_deref(),
        })?;
        self.finish_login(&user, meta)
    }

    /// Always succeeds so the response does not reveal which emails exist.
    pub fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse, ApiError> {
        let at = now();
        let purged = self.store.purge_expired_reset_tokens(at)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired reset tokens");
        }

        let Some(user) = self.store.email_user(&normalize_email(email))? else {
            return Ok(ForgotPasswordResponse {
                ok: true,
                reset_token: None,
            });
        };
        let token = random_hex_token();
        self.store
            .insert_reset_token(user.id, &token, at + self.reset_token_ttl)?;
        tracing::info!(user_id = %user.id, "Issued password reset token");

        Ok(ForgotPasswordResponse {
            ok: true,
            reset_token: (!self.environment.is_production()).then_some(token),
        })
    }

    pub async fn reset_password(&self, token: &str, new_password: String) -> Result<Ack, ApiError> {
        let record = self
            .store
            .find_reset_token(token)?
            .filter(|record| !record.is_expired(now()))
            .ok_or_else(invalid_reset_token)?;

        let password_hash = password::hash_password(new_password).await?;
        if !self.store.consume_reset_token(&record, &password_hash)? {
            return Err(invalid_reset_token());
        }
        tracing::info!(user_id = %record.user_id, "Password reset");
        Ok(Ack::OK)
    }

    /// Development shortcut: a fixed admin account behind a shared secret.
    pub fn dev_login(&self, secret: &str, meta: &LoginMeta) -> Result<AuthResponse, ApiError> {
        let Some(expected) = self
            .dev_secret
            .as_ref()
            .filter(|_| !self.environment.is_production())
        else {
            return Err(ApiError::not_found("Not available"));
        };
        if !secrets_match(secret, expected.expose()) {
            tracing::warn!("Dev login with wrong secret");
            return Err(ApiError::unauthorized("UNAUTHORIZED", "Invalid secret"));
        }

        let user = match self
            .store
            .user_by_provider(AuthProvider::Google, DEV_PROVIDER_ID)?
        {
            Some(user) => user,
            None => {
                let at = now();
                let user = User {
                    id: UserId::new_v4(),
                    org_id: self.store.first_org()?.map(|org| org.id),
                    email: DEV_EMAIL.to_string(),
                    name: DEV_NAME.to_string(),
                    picture: None,
                    provider: AuthProvider::Google,
                    provider_id: DEV_PROVIDER_ID.to_string(),
                    password_hash: None,
                    role: UserRole::Admin,
                    status: AccountStatus::Active,
                    created_at: at,
                    updated_at: at,
                };
                self.insert_new_user(&user)?;
                tracing::info!(user_id = %user.id, "Created dev user");
                user
            }
        };
        self.finish_login(&user, meta)
    }

    pub fn me(&self, caller: &Caller) -> Result<UserProfile, ApiError> {
        self.store
            .user_by_id(caller.id)?
            .map(|user| user.profile())
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Resolve an `Authorization` header value to the calling user.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Caller, ApiError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthorized("UNAUTHORIZED", "Unauthorized"))?;

        let claims = self.jwt.verify(token).map_err(|err| {
            tracing::debug!("Bearer token rejected: {err}");
            ApiError::unauthorized("UNAUTHORIZED", "Invalid or expired token")
        })?;
        let user = self
            .store
            .user_by_id(claims.user_id)?
            .ok_or_else(|| ApiError::unauthorized("UNAUTHORIZED", "User not found"))?;
        if !user.is_active() {
            return Err(account_disabled());
        }
        Ok(Caller::from(&user))
    }

    fn upsert_oauth_user(&self, profile: &OAuthProfile<'_>) -> Result<User, ApiError> {
        if let Some(existing) = self
            .store
            .user_by_provider(profile.provider, profile.provider_id)?
        {
            let name = profile.name.unwrap_or(&existing.name).to_string();
            let picture = profile
                .picture
                .map(str::to_string)
                .or_else(|| existing.picture.clone());
            self.store
                .update_user_profile(existing.id, &name, picture.as_deref())?;
            return Ok(User {
                name,
                picture,
                ..existing
            });
        }

        if self.store.user_by_email(&profile.email)?.is_some() {
            return Err(email_taken());
        }
        let at = now();
        let user = User {
            id: UserId::new_v4(),
            org_id: self.store.first_org()?.map(|org| org.id),
            email: profile.email.clone(),
            name: profile.name.unwrap_or(&profile.email).to_string(),
            picture: profile.picture.map(str::to_string),
            provider: profile.provider,
            provider_id: profile.provider_id.to_string(),
            password_hash: None,
            role: UserRole::Driver,
            status: AccountStatus::Active,
            created_at: at,
            updated_at: at,
        };
        self.insert_new_user(&user)?;
        tracing::info!(
            user_id = %user.id,
            provider = profile.provider.as_str(),
            "Created OAuth user"
        );
        Ok(user)
    }

    /// The pre-insert email lookup can race a concurrent signup; the unique
    /// index settles it.
    fn insert_new_user(&self, user: &User) -> Result<(), ApiError> {
        match self.store.insert_user(user)? {
            Write::Done | Write::Missing => Ok(()),
            Write::Duplicate => {
                tracing::info!(email = %user.email, "Signup lost race on email");
                Err(email_taken())
            }
        }
    }

    fn finish_login(&self, user: &User, meta: &LoginMeta) -> Result<AuthResponse, ApiError> {
        if !user.is_active() {
            return Err(account_disabled());
        }
        self.store.record_login(
            user.id,
            AuditAction::LoginSuccess,
            meta.ip(),
            meta.user_agent(),
        )?;
        self.session(user)
    }

    fn record_failure(&self, user: &User, meta: &LoginMeta) -> Result<(), ApiError> {
        tracing::warn!(user_id = %user.id, "Failed login");
        self.store.record_login(
            user.id,
            AuditAction::LoginFailed,
            meta.ip(),
            meta.user_agent(),
        )?;
        Ok(())
    }

    fn session(&self, user: &User) -> Result<AuthResponse, ApiError> {
        let token = self
            .jwt
            .issue(user)
            .map_err(|err| ApiError::Internal(err.into()))?;
        Ok(AuthResponse {
            token,
            user: user.profile(),
        })
    }
}
