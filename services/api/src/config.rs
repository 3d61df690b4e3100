//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Base URL of the companion backend, without a trailing slash.
    pub backend_api_url: String,
    /// Sent to the backend as `X-Auth-Provider`.
    pub auth_provider: String,
    pub cors_origin: String,
    pub session_ttl: chrono::Duration,
    /// How often a live connection refreshes its session.
    pub session_refresh_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", var_or("BIND_ADDRESS", "0.0.0.0:8080"))?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Companion Backend ---
        let backend_api_url = var_or("BACKEND_API_URL", "http://back:3000")
            .trim_end_matches('/')
            .to_string();
        let auth_provider = var_or("AUTH_PROVIDER", "google");
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Sessions ---
        let ttl_days: i64 = parse_var("SESSION_TTL_DAYS", var_or("SESSION_TTL_DAYS", "30"))?;
        if ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let session_ttl = chrono::Duration::try_days(ttl_days)
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SESSION_TTL_DAYS".to_string(),
                    format!("{} days is out of range", ttl_days),
                )
            })?;
        let refresh_secs: u64 =
            parse_var("SESSION_REFRESH_SECS", var_or("SESSION_REFRESH_SECS", "300"))?;
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_REFRESH_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            backend_api_url,
            auth_provider,
            cors_origin,
            session_ttl,
            session_refresh_interval: Duration::from_secs(refresh_secs),
        })
    }
}

fn parse_var<T>(key: &str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/trips")]).expect("config");
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.backend_api_url, "http://back:3000");
        assert_eq!(config.auth_provider, "google");
        assert_eq!(config.session_ttl, chrono::Duration::days(30));
        assert_eq!(config.session_refresh_interval, Duration::from_secs(300));
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/trips"),
            ("BACKEND_API_URL", "http://localhost:3000/"),
        ])
        .expect("config");
        assert_eq!(config.backend_api_url, "http://localhost:3000");
    }

    #[test]
    fn invalid_values_are_reported() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/trips"),
            ("SESSION_REFRESH_SECS", "soon"),
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidValue(var, _)) if var == "SESSION_REFRESH_SECS"));
    }

    #[test]
    fn session_ttl_beyond_the_calendar_is_rejected() {
        // The first overflows a duration, the second a timestamp.
        for days in ["9999999999999", "100000000", "0"] {
            let result = load(&[
                ("DATABASE_URL", "postgres://localhost/trips"),
                ("SESSION_TTL_DAYS", days),
            ]);
            assert!(
                matches!(result, Err(ConfigError::InvalidValue(ref var, _)) if var == "SESSION_TTL_DAYS"),
                "{days} days"
            );
        }
    }
}
