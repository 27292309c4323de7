//! Remote signature scanning.
//!
//! The scan service compares two signature images and answers with a
//! similarity index in [0, 100]. This module defines the request and
//! response shapes, the validation applied at the network boundary, and
//! the [`SignatureScanner`] seam the orchestrator drives.
//!
//! - [`HttpScanClient`] talks to the real service (feature `network`)
//! - [`MockScanner`] returns scripted outcomes for tests and offline use

#[cfg(feature = "network")]
mod http;
mod mock;

#[cfg(feature = "network")]
pub use http::{HttpScanClient, ScanClientConfig};
pub use mock::MockScanner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SigcheckError};

/// JSON body sent to the scan endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRequest<'a> {
    pub original_signature: &'a str,
    pub scanned_signature: &'a str,
}

impl<'a> ScanRequest<'a> {
    /// Build a request, rejecting empty payloads before any I/O.
    pub fn new(original_signature: &'a str, scanned_signature: &'a str) -> Result<Self> {
        if original_signature.trim().is_empty() {
            return Err(SigcheckError::validation("Original signature image is required"));
        }
        if scanned_signature.trim().is_empty() {
            return Err(SigcheckError::validation("Scanned signature image is required"));
        }
        Ok(Self {
            original_signature,
            scanned_signature,
        })
    }
}

/// Typed result of a successful scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub similarity_index: f64,
    pub computed_at: String,
}

/// Raw response body. Older scorer builds named the score `threshold_val`.
#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(alias = "threshold_val")]
    similarity_idx: serde_json::Value,
    date: serde_json::Value,
}

/// Validate a response body into a [`ScanOutcome`], failing closed.
pub fn parse_scan_response(body: &[u8]) -> Result<ScanOutcome> {
    let raw: ScanResponse = serde_json::from_slice(body)
        .map_err(|e| SigcheckError::Parse(format!("Invalid scan response: {e}")))?;

    let similarity_index = raw
        .similarity_idx
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            SigcheckError::Parse(format!(
                "similarity_idx must be a finite number, got {}",
                raw.similarity_idx
            ))
        })?;

    let computed_at = match raw.date {
        serde_json::Value::String(s) if !s.trim().is_empty() => s,
        other => {
            return Err(SigcheckError::Parse(format!(
                "date must be a non-empty string, got {other}"
            )))
        }
    };

    Ok(ScanOutcome {
        similarity_index,
        computed_at,
    })
}

/// A service that scores the similarity of two encoded signature images.
///
/// One call is one attempt; implementations do not retry.
#[async_trait]
pub trait SignatureScanner: Send + Sync {
    async fn submit_scan(
        &self,
        original_encoded: &str,
        scanned_encoded: &str,
        auth_token: &str,
    ) -> Result<ScanOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let outcome = parse_scan_response(br#"{"similarity_idx": 82, "date": "2024-01-01"}"#)
            .unwrap();
        assert_eq!(outcome.similarity_index, 82.0);
        assert_eq!(outcome.computed_at, "2024-01-01");
    }

    #[test]
    fn test_parse_accepts_legacy_field_name() {
        let outcome =
            parse_scan_response(br#"{"threshold_val": 47.5, "date": "2024-02-02"}"#).unwrap();
        assert_eq!(outcome.similarity_index, 47.5);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(matches!(
            parse_scan_response(br#"{"date": "2024-01-01"}"#),
            Err(SigcheckError::Parse(_))
        ));
        assert!(matches!(
            parse_scan_response(br#"{"similarity_idx": 10}"#),
            Err(SigcheckError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(parse_scan_response(br#"{"similarity_idx": "82", "date": "x"}"#).is_err());
        assert!(parse_scan_response(br#"{"similarity_idx": null, "date": "x"}"#).is_err());
        assert!(parse_scan_response(br#"{"similarity_idx": 82, "date": 20240101}"#).is_err());
        assert!(parse_scan_response(br#"{"similarity_idx": 82, "date": ""}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_scan_response(b"<html>502 Bad Gateway</html>"),
            Err(SigcheckError::Parse(_))
        ));
    }

    #[test]
    fn test_request_rejects_empty_images() {
        assert!(ScanRequest::new("", "abc").is_err());
        assert!(ScanRequest::new("abc", "  ").is_err());
        let req = ScanRequest::new("abc", "def").unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["original_signature"], "abc");
        assert_eq!(json["scanned_signature"], "def");
    }
}
