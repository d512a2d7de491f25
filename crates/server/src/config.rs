use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::oauth2::token::{DEFAULT_AUDIENCE, DEFAULT_ISSUER, MAX_TOKEN_LIFETIME, MIN_KEY_LEN};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Signing parameters for issued tokens.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret, at least 32 bytes.
    pub key: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthenticationConfig {
    pub jwt: JwtConfig,
    /// When true, a failed `last_used_at` write fails the token request.
    #[serde(default)]
    pub usage_write_failure_fatal: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Path prefix all routes are mounted under. Empty or "/" mounts at the root.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
    pub authentication: AuthenticationConfig,
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_string()
}

fn default_token_lifetime_secs() -> i64 {
    1800
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_path() -> String {
    "/auth".to_string()
}

fn default_run_migrations() -> bool {
    true
}

impl AppConfig {
    /// Checks the invariants deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let jwt = &self.authentication.jwt;
        if jwt.key.len() < MIN_KEY_LEN {
            return Err(ConfigError::Validation(format!(
                "authentication.jwt.key must be at least {MIN_KEY_LEN} bytes"
            )));
        }
        let max_lifetime = MAX_TOKEN_LIFETIME.whole_seconds();
        if jwt.token_lifetime_secs <= 0 || jwt.token_lifetime_secs > max_lifetime {
            return Err(ConfigError::Validation(format!(
                "authentication.jwt.token_lifetime_secs must be in 1..={max_lifetime}"
            )));
        }
        if jwt.issuer.trim().is_empty() || jwt.audience.trim().is_empty() {
            return Err(ConfigError::Validation(
                "authentication.jwt.issuer and audience must not be empty".into(),
            ));
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "base_path must be empty or start with '/'".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// The file path can be changed with `CONFIG_PATH`. Any variable matching the
/// key path separated by double underscores (e.g. `AUTHENTICATION__JWT__KEY`)
/// overrides the file value, so the file may be omitted entirely.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    load_config_from(&path)
}

fn layered(path: &str) -> Result<config::Config, ConfigError> {
    use config::{Config, Environment, File};
    Ok(Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::default().separator("__"))
        .build()?)
}

pub fn load_config_from(path: &str) -> Result<AppConfig, ConfigError> {
    let app: AppConfig = layered(path)?.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Read only `database_url`, for tools that never sign tokens.
///
/// Same sources as [`load_config`], without requiring or validating the
/// `authentication` section.
pub fn load_database_url() -> Result<String, ConfigError> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    load_database_url_from(&path)
}

pub fn load_database_url_from(path: &str) -> Result<String, ConfigError> {
    Ok(layered(path)?.get_string("database_url")?)
}
