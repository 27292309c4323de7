//! Client configuration
//!
//! Loads endpoints and credentials from environment variables with
//! development defaults. Nothing in the scan or backend code carries a
//! hardcoded host.

use std::time::Duration;

use url::Url;

use crate::error::{Result, SigcheckError};

/// Default scan service base URL (local development scorer).
pub const DEFAULT_SCAN_API_URL: &str = "http://127.0.0.1:8000";

/// Default bound on a single scan request.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 30_000;

/// Client configuration loaded from environment variables.
#[derive(Clone)]
pub struct SigcheckConfig {
    /// Scan service base URL; requests go to `<scan_api_url>/scan`
    pub scan_api_url: String,
    /// Scan request timeout in milliseconds (default: 30000)
    pub scan_timeout_ms: u64,
    /// Backend-as-a-service base URL (auth + tables)
    pub backend_url: Option<String>,
    /// Public anon key sent as `apikey` to the backend
    pub backend_anon_key: Option<String>,
}

impl std::fmt::Debug for SigcheckConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigcheckConfig")
            .field("scan_api_url", &self.scan_api_url)
            .field("scan_timeout_ms", &self.scan_timeout_ms)
            .field("backend_url", &self.backend_url)
            .field(
                "backend_anon_key",
                &self.backend_anon_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for SigcheckConfig {
    fn default() -> Self {
        Self {
            scan_api_url: DEFAULT_SCAN_API_URL.to_string(),
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT_MS,
            backend_url: None,
            backend_anon_key: None,
        }
    }
}

impl SigcheckConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let scan_api_url =
            std::env::var("SCAN_API_URL").unwrap_or_else(|_| DEFAULT_SCAN_API_URL.to_string());

        let scan_timeout_ms = std::env::var("SCAN_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SCAN_TIMEOUT_MS);

        let backend_url = std::env::var("BACKEND_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let backend_anon_key = std::env::var("BACKEND_ANON_KEY")
            .ok()
            .filter(|v| !v.is_empty());

        Self {
            scan_api_url,
            scan_timeout_ms,
            backend_url,
            backend_anon_key,
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// Full URL of the scan endpoint.
    pub fn scan_endpoint(&self) -> Result<Url> {
        join_path(&self.scan_api_url, "scan")
    }

    /// Backend base URL and anon key, both required for networked use.
    pub fn backend(&self) -> Result<(Url, String)> {
        let url = self
            .backend_url
            .as_deref()
            .ok_or_else(|| SigcheckError::Config("BACKEND_URL is not set".into()))?;
        let key = self
            .backend_anon_key
            .clone()
            .ok_or_else(|| SigcheckError::Config("BACKEND_ANON_KEY is not set".into()))?;
        Ok((parse_base(url)?, key))
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| SigcheckError::Config(format!("Invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SigcheckError::Config(format!(
            "Unsupported URL scheme '{other}' in '{raw}'"
        ))),
    }
}

/// Append a path segment to a base URL, tolerating a missing trailing slash.
pub(crate) fn join_path(base: &str, path: &str) -> Result<Url> {
    let mut base = parse_base(base)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| SigcheckError::Config(format!("Invalid path '{path}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SigcheckConfig::default();
        assert_eq!(config.scan_timeout_ms, 30_000);
        assert_eq!(config.scan_timeout(), Duration::from_secs(30));
        assert!(config.backend_url.is_none());
    }

    #[test]
    fn test_scan_endpoint_joins_path() {
        let mut config = SigcheckConfig::default();
        assert_eq!(
            config.scan_endpoint().unwrap().as_str(),
            "http://127.0.0.1:8000/scan"
        );

        config.scan_api_url = "https://scorer.example.com/api".into();
        assert_eq!(
            config.scan_endpoint().unwrap().as_str(),
            "https://scorer.example.com/api/scan"
        );
    }

    #[test]
    fn test_invalid_scan_url_is_config_error() {
        let config = SigcheckConfig {
            scan_api_url: "ftp://nope".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.scan_endpoint(),
            Err(SigcheckError::Config(_))
        ));
    }

    #[test]
    fn test_backend_requires_url_and_key() {
        let mut config = SigcheckConfig::default();
        assert!(config.backend().is_err());

        config.backend_url = Some("https://project.example.co".into());
        assert!(config.backend().is_err());

        config.backend_anon_key = Some("anon".into());
        let (url, key) = config.backend().unwrap();
        assert_eq!(url.host_str(), Some("project.example.co"));
        assert_eq!(key, "anon");
    }

    #[test]
    fn test_debug_redacts_anon_key() {
        let config = SigcheckConfig {
            backend_anon_key: Some("super-secret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
