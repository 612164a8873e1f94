//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::time::Duration;

const DEFAULT_REACHABILITY_URL: &str = "https://clients3.google.com/generate_204";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase Web API key used for Identity Toolkit calls
    pub firebase_api_key: String,
    /// GCP project ID hosting Firestore
    pub gcp_project_id: String,
    /// Auth emulator `host:port`, when running against the local emulator
    pub auth_emulator_host: Option<String>,
    /// URL polled to decide whether the device is online
    pub reachability_url: String,
    /// Delay between reachability checks
    pub reachability_interval: Duration,
    /// Timeout for outgoing HTTP requests
    pub http_timeout: Duration,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            gcp_project_id: "test-project".to_string(),
            auth_emulator_host: None,
            reachability_url: DEFAULT_REACHABILITY_URL.to_string(),
            reachability_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            auth_emulator_host: env::var("FIREBASE_AUTH_EMULATOR_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            reachability_url: env::var("REACHABILITY_URL")
                .unwrap_or_else(|_| DEFAULT_REACHABILITY_URL.to_string()),
            reachability_interval: Duration::from_secs(parse_secs(
                "REACHABILITY_INTERVAL_SECS",
                30,
            )?),
            http_timeout: Duration::from_secs(parse_secs("HTTP_TIMEOUT_SECS", 10)?),
        })
    }
}

fn parse_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
