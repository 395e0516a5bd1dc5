//! Configuration module
//!
//! The configuration is read once at process start and passed explicitly into the
//! Directus client. Business code never reads the environment.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::SESSION_STORAGE_KEY;
use crate::error::{SiccError, SiccResult};

const DEFAULT_DIRECTUS_URL: &str = "http://localhost:8055";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Raw `SICC_*` environment variables, as deserialized by `envy`.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    directus_url: Option<String>,
    directus_public_url: Option<String>,
    directus_token: Option<String>,
    http_timeout_secs: Option<u64>,
    session_file: Option<PathBuf>,
    environment: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct SiccConfig {
    /// Base URL of the Directus API, without trailing slash
    pub directus_url: String,
    /// Public URL used to build asset links; defaults to `directus_url`
    pub directus_public_url: String,
    /// Static bearer token; when set, login sessions are not needed
    pub directus_token: Option<String>,
    pub http_timeout: Duration,
    /// Where the auth session is persisted between runs
    pub session_file: PathBuf,
    pub environment: String,
}

impl Default for SiccConfig {
    fn default() -> Self {
        Self {
            directus_url: DEFAULT_DIRECTUS_URL.to_string(),
            directus_public_url: DEFAULT_DIRECTUS_URL.to_string(),
            directus_token: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            session_file: PathBuf::from(format!("{}.json", SESSION_STORAGE_KEY)),
            environment: "development".to_string(),
        }
    }
}

impl SiccConfig {
    /// Load from `.env` (if present) and `SICC_*` environment variables.
    pub fn from_env() -> SiccResult<Self> {
        dotenvy::dotenv().ok();
        let raw: RawConfig = envy::prefixed("SICC_").from_env()?;
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    /// Build a config pointing at `directus_url` with every other setting defaulted.
    pub fn with_base_url(directus_url: impl Into<String>) -> Self {
        let directus_url = trim_url(&directus_url.into());
        Self {
            directus_public_url: directus_url.clone(),
            directus_url,
            ..Self::default()
        }
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let directus_url = raw
            .directus_url
            .filter(|s| !s.trim().is_empty())
            .map(|s| trim_url(&s))
            .unwrap_or(defaults.directus_url);
        let directus_public_url = raw
            .directus_public_url
            .filter(|s| !s.trim().is_empty())
            .map(|s| trim_url(&s))
            .unwrap_or_else(|| directus_url.clone());

        Self {
            directus_url,
            directus_public_url,
            directus_token: raw.directus_token.filter(|s| !s.trim().is_empty()),
            http_timeout: raw
                .http_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            session_file: raw.session_file.unwrap_or(defaults.session_file),
            environment: raw
                .environment
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.environment),
        }
    }

    pub fn validate(&self) -> SiccResult<()> {
        if !(self.directus_url.starts_with("http://") || self.directus_url.starts_with("https://"))
        {
            return Err(SiccError::Config(
                "SICC_DIRECTUS_URL must be an http(s) URL".to_string(),
            ));
        }

        if self.is_production() && !self.directus_url.starts_with("https://") {
            return Err(SiccError::Config(
                "SICC_DIRECTUS_URL must use https in production".to_string(),
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(SiccError::Config(
                "SICC_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
