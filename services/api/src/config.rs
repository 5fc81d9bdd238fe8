//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
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
    pub log_level: Level,
    pub bible_api_base_url: String,
    pub bible_api_key: String,
    pub default_edition_id: String,
    pub retry_max_attempts: u32,
    pub retry_delay: Duration,
    pub allowed_origin: String,
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

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upstream Scripture API Settings ---
        let bible_api_base_url = std::env::var("BIBLE_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.scripture.api.bible/v1".to_string());

        let bible_api_key = std::env::var("BIBLE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("BIBLE_API_KEY".to_string()))?;

        // --- Load Feed Policy Settings ---
        // The Free Bible Version, the edition most users land on by default.
        let default_edition_id = std::env::var("DEFAULT_EDITION_ID")
            .unwrap_or_else(|_| "65eec8e0b60e656b-01".to_string());

        let retry_max_attempts = std::env::var("RETRY_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidValue("RETRY_MAX_ATTEMPTS".to_string(), e.to_string())
            })?;

        let retry_delay_ms = std::env::var("RETRY_DELAY_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue("RETRY_DELAY_MS".to_string(), e.to_string()))?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            log_level,
            bible_api_base_url,
            bible_api_key,
            default_edition_id,
            retry_max_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
            allowed_origin,
        })
    }
}
