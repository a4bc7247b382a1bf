use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. `":memory:"` is accepted for
    /// throwaway instances.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Lifetime of an issued bearer token. Tokens are self-contained and
    /// cannot be revoked before this elapses, so keep it modest.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: u64,

    /// HMAC key used to sign and verify bearer tokens.
    ///
    /// Prefer loading this via the `JWT_SECRET` environment variable.  This
    /// config field is the fallback for deployments that cannot inject env
    /// vars at runtime (e.g. certain container setups).
    ///
    /// **Minimum length:** 32 characters.  Startup fails hard when neither
    /// source supplies a usable key — the server never substitutes a default.
    pub jwt_secret: Option<String>,

    /// Shared secret gating the administrative user-listing endpoint,
    /// presented as the `admin_secret` query parameter.  Overridable via the
    /// `ADMIN_LIST_SECRET` environment variable.  When neither source is set
    /// the listing endpoint denies every request.
    pub admin_list_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"0.0.0.0:8080"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AuthConfig {
    /// Token lifetime in seconds — the unit the claim math works in.
    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_minutes * 60
    }

    /// Resolve the signing secret with the `JWT_SECRET` env-var taking
    /// priority over the config file field.
    ///
    /// Returns `None` when neither source is set (the server startup code
    /// treats this as a hard error).
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.jwt_secret.clone())
            .filter(|s| !s.is_empty())
    }

    /// Resolve the admin listing secret, `ADMIN_LIST_SECRET` env-var first.
    pub fn resolved_admin_list_secret(&self) -> Option<String> {
        std::env::var("ADMIN_LIST_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.admin_list_secret.clone())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_port() -> u16 {
    8080
}

pub fn default_max_connections() -> usize {
    1000
}

pub fn default_token_ttl() -> u64 {
    // 24 hours
    1440
}
