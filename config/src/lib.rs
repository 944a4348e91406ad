//! Configuration loading for the Fleet service.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `~/.fleet/config.toml` (or the file named by `FLEET_CONFIG`)
//! 3. Environment variables (`PORT`, `JWT_SECRET`, ...)
//!
//! ```toml
//! [app]
//! environment = "production"
//! log_file = "/var/log/fleet.log"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 4000
//!
//! [database]
//! path = "/var/lib/fleet/fleet.db"
//!
//! [auth]
//! jwt_secret = "${FLEET_JWT_SECRET}"
//! token_ttl_hours = 168
//!
//! [oauth]
//! google_client_id = "1234.apps.googleusercontent.com"
//!
//! [organization]
//! bootstrap_name = "Demo Transport"
//! ```
//!
//! Raw TOML structs (all `Option`) stay private; [`Settings`] is the resolved
//! form and its existence proves the required values are present.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_TOKEN_TTL_HOURS: u64 = 7 * 24;
const DEFAULT_RESET_TOKEN_TTL_MINUTES: u64 = 60;
const MIN_JWT_SECRET_LEN: usize = 16;

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com";
pub const FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("JWT secret is required (set JWT_SECRET or [auth] jwt_secret)")]
    MissingJwtSecret,
    #[error("JWT secret must be at least {MIN_JWT_SECRET_LEN} characters")]
    WeakJwtSecret,
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// ============================================================================
// Raw TOML layer
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    app: Option<RawApp>,
    server: Option<RawServer>,
    database: Option<RawDatabase>,
    auth: Option<RawAuth>,
    oauth: Option<RawOAuth>,
    organization: Option<RawOrganization>,
}

#[derive(Debug, Default, Deserialize)]
struct RawApp {
    environment: Option<String>,
    log_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    path: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawAuth {
    jwt_secret: Option<String>,
    token_ttl_hours: Option<u64>,
    reset_token_ttl_minutes: Option<u64>,
    dev_secret: Option<String>,
}

// Manual Debug impl to prevent leaking secrets in logs.
impl fmt::Debug for RawAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("RawAuth")
            .field("jwt_secret", &mask(self.jwt_secret.as_ref()))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("reset_token_ttl_minutes", &self.reset_token_ttl_minutes)
            .field("dev_secret", &mask(self.dev_secret.as_ref()))
            .finish()
    }
}

#[derive(Default, Deserialize)]
struct RawOAuth {
    google_client_id: Option<String>,
    google_tokeninfo_url: Option<String>,
    facebook_app_id: Option<String>,
    facebook_app_secret: Option<String>,
    facebook_graph_url: Option<String>,
}

impl fmt::Debug for RawOAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOAuth")
            .field("google_client_id", &self.google_client_id)
            .field("facebook_app_id", &self.facebook_app_id)
            .field(
                "facebook_app_secret",
                &self.facebook_app_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawOrganization {
    bootstrap_name: Option<String>,
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Deployment environment. Production hides internal error details and
/// disables the development login and reset-token echo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl ServerSettings {
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Secret,
    pub token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub dev_secret: Option<Secret>,
}

#[derive(Debug, Clone)]
pub struct FacebookApp {
    pub app_id: String,
    pub app_secret: Secret,
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// When set, Google ID tokens must carry this audience.
    pub google_client_id: Option<String>,
    pub google_tokeninfo_url: String,
    /// Facebook login is refused unless both app id and secret are set.
    pub facebook: Option<FacebookApp>,
    pub facebook_graph_url: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub server: ServerSettings,
    pub database_path: PathBuf,
    pub auth: AuthSettings,
    pub oauth: OAuthSettings,
    /// Created on startup when the store holds no organization yet.
    pub bootstrap_org: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Load from the config file (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = match config_path() {
            Some(path) if path.exists() => read_raw(&path)?,
            _ => RawConfig::default(),
        };
        Self::resolve(raw, |key| env::var(key).ok())
    }

    /// Load from an explicit file and the process environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = read_raw(path)?;
        Self::resolve(raw, |key| env::var(key).ok())
    }

    /// Parse TOML text with a caller-supplied environment. Used by tests and
    /// embedders that do not want the process environment consulted.
    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::resolve(raw, lookup)
    }

    fn resolve<F>(raw: RawConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let expand = |value: String| expand_env_vars(&value, &lookup);

        let app = raw.app.unwrap_or_default();
        let server = raw.server.unwrap_or_default();
        let database = raw.database.unwrap_or_default();
        let auth = raw.auth.unwrap_or_default();
        let oauth = raw.oauth.unwrap_or_default();
        let organization = raw.organization.unwrap_or_default();

        let environment_raw = env_value("FLEET_ENV").or(app.environment);
        let environment = match environment_raw {
            Some(value) => Environment::parse(&value).ok_or(ConfigError::Invalid {
                key: "environment",
                value,
            })?,
            None => Environment::default(),
        };

        let port = match env_value("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: value.clone(),
            })?,
            None => server.port.unwrap_or(DEFAULT_PORT),
        };
        let server = ServerSettings {
            host: env_value("FLEET_HOST")
                .or(server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            max_body_bytes: server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        };

        let database_path = env_value("FLEET_DB_PATH")
            .or(database.path.map(expand))
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let jwt_secret = env_value("JWT_SECRET")
            .or(auth.jwt_secret.map(expand))
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }
        let dev_secret = env_value("DEV_AUTH_SECRET")
            .or(auth.dev_secret.map(expand))
            .filter(|value| !value.trim().is_empty())
            .map(Secret::new);
        if dev_secret.is_some() && environment.is_production() {
            tracing::warn!("Dev auth secret is set but ignored in production");
        }
        let auth = AuthSettings {
            jwt_secret: Secret::new(jwt_secret),
            token_ttl: Duration::from_secs(
                auth.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS) * 3600,
            ),
            reset_token_ttl: Duration::from_secs(
                auth.reset_token_ttl_minutes
                    .unwrap_or(DEFAULT_RESET_TOKEN_TTL_MINUTES)
                    * 60,
            ),
            dev_secret,
        };

        let facebook_app_id = env_value("FACEBOOK_APP_ID").or(oauth.facebook_app_id.map(expand));
        let facebook_app_secret =
            env_value("FACEBOOK_APP_SECRET").or(oauth.facebook_app_secret.map(expand));
        let facebook = match (facebook_app_id, facebook_app_secret) {
            (Some(app_id), Some(secret)) if !app_id.is_empty() && !secret.is_empty() => {
                Some(FacebookApp {
                    app_id,
                    app_secret: Secret::new(secret),
                })
            }
            _ => None,
        };
        let oauth = OAuthSettings {
            google_client_id: env_value("GOOGLE_CLIENT_ID")
                .or(oauth.google_client_id.map(expand))
                .filter(|value| !value.is_empty()),
            google_tokeninfo_url: oauth
                .google_tokeninfo_url
                .unwrap_or_else(|| GOOGLE_TOKENINFO_URL.to_string()),
            facebook,
            facebook_graph_url: oauth
                .facebook_graph_url
                .unwrap_or_else(|| FACEBOOK_GRAPH_URL.to_string()),
        };

        Ok(Self {
            environment,
            server,
            database_path,
            auth,
            oauth,
            bootstrap_org: env_value("FLEET_BOOTSTRAP_ORG")
                .or(organization.bootstrap_name)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            log_file: env_value("FLEET_LOG_FILE")
                .or(app.log_file.map(expand))
                .map(PathBuf::from),
        })
    }
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("Failed to read config at {:?}: {}", path, err);
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            Err(ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            })
        }
    }
}

/// Replace `${VAR}` references using `lookup`. Missing variables become empty;
/// unterminated references are kept verbatim.
pub fn expand_env_vars<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if var.is_empty() {
                    out.push_str("${}");
                } else {
                    out.push_str(&lookup(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = env::var("FLEET_CONFIG")
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    fleet_home().map(|home| home.join("config.toml"))
}

/// `~/.fleet`, the default home for config, database and logs.
#[must_use]
pub fn fleet_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fleet"))
}

fn default_database_path() -> PathBuf {
    fleet_home()
        .unwrap_or_else(|| PathBuf::from(".fleet"))
        .join("fleet.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123";

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world", env_of(&[])), "hello world");
    }

    #[test]
    fn expand_env_vars_single_and_adjacent() {
        let lookup = env_of(&[("A", "1"), ("B", "2")]);
        assert_eq!(expand_env_vars("x${A}${B}y", lookup), "x12y");
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        assert_eq!(expand_env_vars("pre-${NOPE}-post", env_of(&[])), "pre--post");
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("${UNCLOSED", env_of(&[])), "${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_name_preserved() {
        assert_eq!(expand_env_vars("a${}b", env_of(&[])), "a${}b");
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let err = Settings::from_toml_str("", env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingJwtSecret));
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let err = Settings::from_toml_str("", env_of(&[("JWT_SECRET", "short")])).unwrap_err();
        assert!(matches!(err, ConfigError::WeakJwtSecret));
    }

    #[test]
    fn defaults_apply_with_only_secret() {
        let settings = Settings::from_toml_str("", env_of(&[("JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.server.max_body_bytes, 1024 * 1024);
        assert_eq!(settings.auth.token_ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(settings.auth.reset_token_ttl, Duration::from_secs(3600));
        assert!(settings.oauth.facebook.is_none());
        assert_eq!(settings.oauth.google_tokeninfo_url, GOOGLE_TOKENINFO_URL);
    }

    #[test]
    fn toml_values_parse() {
        let toml_str = r#"
[app]
environment = "production"

[server]
host = "0.0.0.0"
port = 8080

[database]
path = "/tmp/fleet.db"

[auth]
jwt_secret = "${FLEET_TEST_SECRET}"
token_ttl_hours = 1

[oauth]
google_client_id = "client-1"
facebook_app_id = "fb-app"
facebook_app_secret = "fb-secret"

[organization]
bootstrap_name = "  Demo Transport  "
"#;
        let settings =
            Settings::from_toml_str(toml_str, env_of(&[("FLEET_TEST_SECRET", SECRET)])).unwrap();
        assert!(settings.environment.is_production());
        assert_eq!(settings.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.database_path, PathBuf::from("/tmp/fleet.db"));
        assert_eq!(settings.auth.jwt_secret.expose(), SECRET);
        assert_eq!(settings.auth.token_ttl, Duration::from_secs(3600));
        assert_eq!(settings.oauth.google_client_id.as_deref(), Some("client-1"));
        assert_eq!(settings.oauth.facebook.unwrap().app_id, "fb-app");
        assert_eq!(settings.bootstrap_org.as_deref(), Some("Demo Transport"));
    }

    #[test]
    fn environment_overrides_file() {
        let toml_str = r#"
[server]
port = 8080
[auth]
jwt_secret = "file-secret-0123456789"
"#;
        let settings = Settings::from_toml_str(
            toml_str,
            env_of(&[("PORT", "9090"), ("JWT_SECRET", SECRET), ("FLEET_ENV", "test")]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.auth.jwt_secret.expose(), SECRET);
        assert_eq!(settings.environment, Environment::Test);
    }

    #[test]
    fn invalid_port_reports_key() {
        let err = Settings::from_toml_str("", env_of(&[("JWT_SECRET", SECRET), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn facebook_requires_both_id_and_secret() {
        let settings = Settings::from_toml_str(
            "",
            env_of(&[("JWT_SECRET", SECRET), ("FACEBOOK_APP_ID", "only-id")]),
        )
        .unwrap();
        assert!(settings.oauth.facebook.is_none());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = Settings::from_toml_str("[mystery]\nx = 1\n", env_of(&[("JWT_SECRET", SECRET)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let settings = Settings::from_toml_str(
            "",
            env_of(&[("JWT_SECRET", SECRET), ("DEV_AUTH_SECRET", "dev-secret-value")]),
        )
        .unwrap();
        let debug_output = format!("{settings:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(SECRET));
        assert!(!debug_output.contains("dev-secret-value"));
    }

    #[test]
    fn load_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!("[auth]\njwt_secret = \"{SECRET}\"\n[server]\nport = 5000\n"),
        )
        .unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 5000);
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
