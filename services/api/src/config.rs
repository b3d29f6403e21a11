//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Ten years. Longer lifetimes overflow session expiry timestamps.
const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection details for the external auth provider.
#[derive(Clone, Debug)]
pub struct AuthProviderConfig {
    pub url: String,
    pub api_key: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_path: PathBuf,
    pub database_url: Option<String>,
    pub auth_provider: Option<AuthProviderConfig>,
    pub log_level: Level,
    pub chat_reply_delay: Duration,
    pub leaderboard_seed: Option<u64>,
    pub session_ttl_days: i64,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_path: PathBuf::from("./data/learnhub.json"),
            database_url: None,
            auth_provider: None,
            log_level: Level::INFO,
            chat_reply_delay: Duration::from_millis(800),
            leaderboard_seed: None,
            session_ttl_days: 30,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server and Storage Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?,
            None => defaults.bind_address,
        };

        let data_path = lookup("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- External Provider (both optional) ---
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let auth_provider = match lookup("AUTH_PROVIDER_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => {
                let api_key = lookup("AUTH_PROVIDER_KEY")
                    .ok_or_else(|| ConfigError::MissingVar("AUTH_PROVIDER_KEY".to_string()))?;
                Some(AuthProviderConfig {
                    url: url.trim_end_matches('/').to_string(),
                    api_key,
                })
            }
            None => None,
        };

        // --- Feature Settings ---
        let chat_reply_delay = match lookup("CHAT_REPLY_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_number("CHAT_REPLY_DELAY_MS", &raw)?),
            None => defaults.chat_reply_delay,
        };

        let leaderboard_seed = lookup("LEADERBOARD_SEED")
            .map(|raw| parse_number("LEADERBOARD_SEED", &raw))
            .transpose()?;

        let session_ttl_days = match lookup("SESSION_TTL_DAYS") {
            Some(raw) => {
                let days: i64 = parse_number("SESSION_TTL_DAYS", &raw)?;
                if !(1..=MAX_SESSION_TTL_DAYS).contains(&days) {
                    return Err(ConfigError::InvalidValue(
                        "SESSION_TTL_DAYS".to_string(),
                        format!("must be between 1 and {MAX_SESSION_TTL_DAYS}"),
                    ));
                }
                days
            }
            None => defaults.session_ttl_days,
        };

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            data_path,
            database_url,
            auth_provider,
            log_level,
            chat_reply_delay,
            leaderboard_seed,
            session_ttl_days,
            cors_origin,
        })
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
