//! HTTP client for the remote scan service.
//!
//! ## Behaviour
//!
//! - One POST per scan, JSON body, bearer token
//! - The whole exchange (send and body read) is bounded by the configured
//!   timeout; on expiry the request future is dropped, which closes the
//!   connection, and the call fails with [`SigcheckError::Timeout`]
//! - No retries

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{parse_scan_response, ScanOutcome, ScanRequest, SignatureScanner};
use crate::config::SigcheckConfig;
use crate::error::{Result, SigcheckError};

/// Connection establishment bound, independent of the scan timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the scan client.
#[derive(Debug, Clone)]
pub struct ScanClientConfig {
    /// Full URL of the scan endpoint.
    pub endpoint: Url,
    /// Upper bound on one scan exchange.
    pub timeout: Duration,
}

impl ScanClientConfig {
    pub fn from_config(config: &SigcheckConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.scan_endpoint()?,
            timeout: config.scan_timeout(),
        })
    }
}

/// Scan service client.
pub struct HttpScanClient {
    client: Client,
    config: ScanClientConfig,
}

impl HttpScanClient {
    /// Create a client from the environment-derived configuration.
    pub fn from_config(config: &SigcheckConfig) -> Result<Self> {
        Self::with_config(ScanClientConfig::from_config(config)?)
    }

    #[instrument(level = "debug", skip_all, fields(
        endpoint = %config.endpoint,
        timeout_ms = config.timeout.as_millis() as u64
    ))]
    pub fn with_config(config: ScanClientConfig) -> Result<Self> {
        debug!("Creating scan client");

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                SigcheckError::Config(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScanClientConfig {
        &self.config
    }

    async fn exchange(&self, request: &ScanRequest<'_>, auth_token: &str) -> Result<ScanOutcome> {
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .header(header::AUTHORIZATION, format!("Bearer {auth_token}"))
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unexpected status");
            return Err(SigcheckError::network(Some(status.as_u16()), reason));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        parse_scan_response(&body)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> SigcheckError {
        if error.is_timeout() {
            SigcheckError::Timeout {
                after_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            SigcheckError::network(error.status().map(|s| s.as_u16()), error.to_string())
        }
    }
}

#[async_trait]
impl SignatureScanner for HttpScanClient {
    #[instrument(level = "info", skip_all, fields(
        endpoint = %self.config.endpoint,
        timeout_ms = self.config.timeout.as_millis() as u64
    ))]
    async fn submit_scan(
        &self,
        original_encoded: &str,
        scanned_encoded: &str,
        auth_token: &str,
    ) -> Result<ScanOutcome> {
        let request = ScanRequest::new(original_encoded, scanned_encoded)?;
        if auth_token.trim().is_empty() {
            return Err(SigcheckError::NotSignedIn);
        }

        let start = Instant::now();
        let result = match tokio::time::timeout(
            self.config.timeout,
            self.exchange(&request, auth_token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SigcheckError::Timeout {
                after_ms: self.config.timeout.as_millis() as u64,
            }),
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => info!(
                latency_ms,
                similarity_index = outcome.similarity_index,
                "Scan completed"
            ),
            Err(e) => warn!(error = %e, latency_ms, "Scan failed"),
        }
        result
    }
}
