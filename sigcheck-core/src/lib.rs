//! Sigcheck Core - signature authenticity scanning client
//!
//! This crate drives a remote signature-comparison service: it encodes a pair
//! of signature images, submits them for scanning, classifies the returned
//! similarity index into an authenticity severity and persists the result.
//!
//! # Features
//!
//! - Base64 image encoding with format sniffing
//! - Time-bounded scan requests that are aborted on timeout
//! - Fixed-threshold severity classification
//! - Account and record management against a hosted auth/table backend
//! - A single-flight scan state machine per signature record
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sigcheck_core::{
//!     AppState, MemoryBackend, MockScanner, ScanOrchestrator, SignatureStore,
//! };
//!
//! # async fn example() -> sigcheck_core::Result<()> {
//! let backend = Arc::new(MemoryBackend::new());
//! let state = Arc::new(AppState::new());
//! // ... sign in through `AuthService` ...
//! let session = state.require_session().await?;
//! let record = backend
//!     .get_signature(&session.access_token, 1)
//!     .await?
//!     .expect("record exists");
//!
//! let orchestrator = ScanOrchestrator::new(
//!     record,
//!     Arc::new(MockScanner::new()),
//!     backend,
//!     state,
//! );
//! let report = orchestrator.start_scan().await?;
//! println!("{} ({:.2})", report.severity, report.similarity_index);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod encoder;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod scan;
pub mod severity;
pub mod signatures;
pub mod state;
pub mod validation;

// Re-export main types for convenience
pub use auth::{AuthService, ResendCooldown, OTP_RESEND_COOLDOWN};
pub use backend::{AuthProvider, MemoryBackend, ResultStore, SignUpRequest, SignatureStore};
pub use config::SigcheckConfig;
pub use encoder::{encode_file, EncodedImage};
pub use error::{ErrorKind, Result, SigcheckError};
pub use model::{NewSignatureRecord, ScanResult, Session, SignatureRecord};
pub use orchestrator::{SaveStatus, ScanOrchestrator, ScanReport, ScanState};
pub use scan::{parse_scan_response, MockScanner, ScanOutcome, SignatureScanner};
pub use severity::{classify, donut_fraction, AuthenticitySeverity};
pub use signatures::SignatureService;
pub use state::AppState;
pub use validation::{SignUpForm, SignatureForm};

// Network-dependent exports
#[cfg(feature = "network")]
pub use backend::RestBackend;
#[cfg(feature = "network")]
pub use scan::{HttpScanClient, ScanClientConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Integration test: sign up, create a record from files, scan it.
    #[tokio::test]
    async fn test_full_scan_workflow() {
        let backend = Arc::new(MemoryBackend::new());
        let state = Arc::new(AppState::new());
        let auth = AuthService::new(backend.clone(), state.clone());

        // Step 1: Create and confirm an account
        let form = SignUpForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "Secret1".into(),
            confirm_password: "Secret1".into(),
            accepted_terms: true,
        };
        auth.sign_up(&form).await.expect("sign-up");
        let code = backend.pending_otp("ada@example.com").expect("code issued");
        auth.verify_otp("ada@example.com", &code).await.expect("verify");
        auth.sign_in("ada@example.com", "Secret1").await.expect("sign-in");

        // Step 2: Create a record from two image files
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("original.png");
        let scanned = dir.path().join("scanned.png");
        std::fs::write(&original, b"\x89PNG\r\n\x1a\nsame-signature").unwrap();
        std::fs::write(&scanned, b"\x89PNG\r\n\x1a\nsame-signature").unwrap();

        let signatures = SignatureService::new(backend.clone(), state.clone());
        let record = signatures
            .submit(&SignatureForm {
                title: "President Signature".into(),
                author: "Office".into(),
                original_image: Some(original),
                scanned_image: Some(scanned),
            })
            .await
            .expect("record created");

        // Step 3: Scan; identical images score 100 with the mock scanner
        let orchestrator =
            ScanOrchestrator::new(record, Arc::new(MockScanner::new()), backend.clone(), state);
        let report = orchestrator.start_scan().await.expect("scan");

        assert_eq!(report.similarity_index, 100.0);
        assert_eq!(report.severity, AuthenticitySeverity::HighlyAuthentic);
        assert_eq!(report.save_status, SaveStatus::Saved);
        assert_eq!(backend.results_for(report.signature_record_id).len(), 1);
    }

    /// Scores either side of a threshold land in different bands.
    #[test]
    fn test_classification_bands_are_exposed() {
        assert_eq!(classify(Some(45.0)), AuthenticitySeverity::HighlyForged);
        assert_eq!(classify(Some(45.01)), AuthenticitySeverity::LikelyForged);
        assert_eq!(classify(None), AuthenticitySeverity::Unknown);
    }
}
