use std::path::PathBuf;

use serde::Deserialize;

use crate::error::AtelierError;
use crate::workflow::Policy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://atelier.db?mode=rwc, postgres://...)
    pub database_url: String,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT token expiry in hours (default: 24)
    pub jwt_expiry_hours: u64,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 3000)
    pub server_port: u16,

    /// Environment: development, production, test
    pub environment: String,

    /// TOML file overriding the built-in role, scope and approval tables.
    pub policy_file: Option<PathBuf>,

    /// Log output: compact (default), pretty or json
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://atelier.db?mode=rwc".to_string(),
            jwt_secret: "atelier-dev-secret-change-me".to_string(),
            jwt_expiry_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            policy_file: None,
            log_format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, AtelierError> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiry_hours: parse_var("JWT_EXPIRY_HOURS", defaults.jwt_expiry_hours)?,
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            policy_file: std::env::var("POLICY_FILE")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            log_format: std::env::var("LOG_FORMAT").unwrap_or(defaults.log_format),
        })
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Built-in policy, overridden by `POLICY_FILE` when set.
    pub fn load_policy(&self) -> Result<Policy, AtelierError> {
        match &self.policy_file {
            Some(path) => Policy::load(path),
            None => Ok(Policy::default()),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AtelierError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AtelierError::Configuration(format!("{} has an invalid value '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}
