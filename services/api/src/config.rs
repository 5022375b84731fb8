//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the external asset host. Absent in local-only mode.
#[derive(Clone, Debug)]
pub struct AssetHostConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub token_secret: String,
    pub cors_origin: String,
    pub upload_dir: PathBuf,
    pub asset_host: Option<AssetHostConfig>,
    pub openai_api_key: Option<String>,
    pub generation_model: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
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

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let token_secret = std::env::var("TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("TOKEN_SECRET".to_string()))?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        // --- Asset Host (all three variables or none) ---
        let asset_host = match (
            std::env::var("ASSET_HOST_URL").ok(),
            std::env::var("ASSET_HOST_KEY").ok(),
            std::env::var("ASSET_HOST_SECRET").ok(),
        ) {
            (Some(base_url), Some(api_key), Some(api_secret)) => Some(AssetHostConfig {
                base_url,
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "ASSET_HOST_URL".to_string(),
                    "ASSET_HOST_URL, ASSET_HOST_KEY, and ASSET_HOST_SECRET must be set together"
                        .to_string(),
                ))
            }
        };

        // --- Generation Provider ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let generation_model =
            std::env::var("GENERATION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        // --- Rate Limiting ---
        let rate_limit_max = parse_var("RATE_LIMIT_MAX", 100)?;
        let rate_limit_window_secs = parse_var("RATE_LIMIT_WINDOW_SECS", 900)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            token_secret,
            cors_origin,
            upload_dir,
            asset_host,
            openai_api_key,
            generation_model,
            rate_limit_max,
            rate_limit_window_secs,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a valid number", raw))
        }),
        Err(_) => Ok(default),
    }
}
