//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `SOLE_API_URL` - Backend API base (default: `http://localhost:5000/api`)
//! - `SOLE_ASSET_ORIGIN` - Origin that serves uploaded images (default: `http://localhost:5000`)
//! - `SOLE_SESSION_FILE` - Where the signed-in user is persisted
//!   (default: `$HOME/.sole-society/session.json`)
//! - `SOLE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SOLE_CATALOG_CACHE_TTL_SECS` - Product catalog cache lifetime (default: 300)
//! - `SOLE_DELIVERY_RETRY_SECS` - Back-off before re-sending an unacknowledged
//!   delivery confirmation (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_ASSET_ORIGIN: &str = "http://localhost:5000";
const DEFAULT_SESSION_DIR: &str = ".sole-society";
const SESSION_FILE_NAME: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is appended to (no trailing slash).
    pub api_url: Url,
    /// Origin that server-relative image paths resolve against.
    pub asset_origin: Url,
    /// File holding the persisted session.
    pub session_file: PathBuf,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Lifetime of cached catalog responses.
    pub catalog_cache_ttl: Duration,
    /// Minimum gap between delivery confirmation attempts for one order.
    pub delivery_retry: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = parse_url(&lookup, "SOLE_API_URL", DEFAULT_API_URL)?;
        let asset_origin = parse_url(&lookup, "SOLE_ASSET_ORIGIN", DEFAULT_ASSET_ORIGIN)?;

        let session_file = lookup("SOLE_SESSION_FILE").map_or_else(
            || default_session_file(lookup("HOME")),
            PathBuf::from,
        );

        Ok(Self {
            api_url,
            asset_origin,
            session_file,
            request_timeout: parse_secs(&lookup, "SOLE_REQUEST_TIMEOUT_SECS", 30)?,
            catalog_cache_ttl: parse_secs(&lookup, "SOLE_CATALOG_CACHE_TTL_SECS", 300)?,
            delivery_retry: parse_secs(&lookup, "SOLE_DELIVERY_RETRY_SECS", 30)?,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        })
    }

    /// Configuration pointing at a given backend, with defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not a valid URL.
    pub fn for_backend(api_url: &str, session_file: PathBuf) -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| match key {
            "SOLE_API_URL" => Some(api_url.to_string()),
            _ => None,
        })?;
        config.session_file = session_file;
        Ok(config)
    }

    /// Full URL for an API path such as `/products/abc`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_session_file(home: Option<String>) -> PathBuf {
    home.map_or_else(PathBuf::new, PathBuf::from)
        .join(DEFAULT_SESSION_DIR)
        .join(SESSION_FILE_NAME)
}

fn parse_url<F>(lookup: &F, key: &str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(Duration::from_secs(default)), |raw| {
        raw.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[("HOME", "/home/asha")])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:5000/api");
        assert_eq!(config.asset_origin.as_str(), "http://localhost:5000/");
        assert_eq!(
            config.session_file,
            PathBuf::from("/home/asha/.sole-society/session.json")
        );
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SOLE_API_URL", "https://shop.example.com/api/"),
            ("SOLE_SESSION_FILE", "/tmp/session.json"),
            ("SOLE_REQUEST_TIMEOUT_SECS", "5"),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.session_file, PathBuf::from("/tmp/session.json"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[(
            "SOLE_REQUEST_TIMEOUT_SECS",
            "soon",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "SOLE_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[("SOLE_API_URL", "not a url")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig::from_lookup(lookup_from(&[(
            "SOLE_API_URL",
            "https://shop.example.com/api/",
        )]))
        .unwrap();
        assert_eq!(
            config.endpoint("/products/P1"),
            "https://shop.example.com/api/products/P1"
        );
        assert_eq!(config.endpoint("cart"), "https://shop.example.com/api/cart");
    }
}
