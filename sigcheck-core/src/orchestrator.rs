//! Scan orchestration for a single signature record.
//!
//! State machine:
//!
//! ```text
//! Idle ──start_scan──▶ Analyzing ──ok──▶ Completed
//!   ▲                      │
//!   │                      └──err──▶ Failed
//!   └──────── (Completed / Failed can start another scan) ◀┘
//! ```
//!
//! At most one scan is in flight per orchestrator. A second trigger while
//! `Analyzing` is refused with [`SigcheckError::ScanInFlight`] and never
//! reaches the scanner. Successful outcomes are classified, persisted and
//! then shown; a failed write is logged and reported in
//! [`ScanReport::save_status`] but does not hide the result. A scan whose
//! future is dropped mid-flight leaves the orchestrator `Failed`, so it can
//! be triggered again.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::ResultStore;
use crate::error::{ErrorKind, Result, SigcheckError};
use crate::model::{ScanResult, SignatureRecord};
use crate::scan::{ScanOutcome, SignatureScanner};
use crate::severity::{classify, donut_fraction, AuthenticitySeverity};
use crate::state::AppState;

/// What happened to the result after it was shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SaveStatus {
    Saved,
    Failed(String),
    /// Loaded from a previous run; nothing was written.
    Stored,
}

/// Classified result of a scan, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub signature_record_id: i64,
    pub similarity_index: f64,
    pub severity: AuthenticitySeverity,
    /// Filled portion of the donut chart, 0.0–1.0.
    pub donut_fraction: f64,
    pub computed_at: String,
    pub save_status: SaveStatus,
}

impl ScanReport {
    fn new(
        signature_record_id: i64,
        similarity_index: f64,
        computed_at: String,
        save_status: SaveStatus,
    ) -> Self {
        Self {
            signature_record_id,
            similarity_index,
            severity: classify(Some(similarity_index)),
            donut_fraction: donut_fraction(similarity_index),
            computed_at,
            save_status,
        }
    }

    fn from_stored(result: ScanResult) -> Self {
        Self::new(
            result.signature_record_id,
            result.similarity_index,
            result.computed_at,
            SaveStatus::Stored,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    Analyzing,
    Completed(ScanReport),
    Failed { kind: ErrorKind, message: String },
}

impl ScanState {
    pub fn is_analyzing(&self) -> bool {
        matches!(self, ScanState::Analyzing)
    }

    pub fn report(&self) -> Option<&ScanReport> {
        match self {
            ScanState::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Marks the orchestrator `Failed` if a scan is dropped before it settles.
struct InFlightGuard<'a> {
    state: &'a watch::Sender<ScanState>,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(state: &'a watch::Sender<ScanState>) -> Self {
        Self { state, armed: true }
    }

    fn finish(mut self, next: ScanState) {
        self.armed = false;
        self.state.send_replace(next);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Scan cancelled before completion");
            self.state.send_replace(ScanState::Failed {
                kind: ErrorKind::State,
                message: "Scan cancelled".into(),
            });
        }
    }
}

pub struct ScanOrchestrator {
    record: SignatureRecord,
    scanner: Arc<dyn SignatureScanner>,
    results: Arc<dyn ResultStore>,
    app_state: Arc<AppState>,
    state: watch::Sender<ScanState>,
}

impl ScanOrchestrator {
    pub fn new(
        record: SignatureRecord,
        scanner: Arc<dyn SignatureScanner>,
        results: Arc<dyn ResultStore>,
        app_state: Arc<AppState>,
    ) -> Self {
        let (state, _) = watch::channel(ScanState::Idle);
        Self {
            record,
            scanner,
            results,
            app_state,
            state,
        }
    }

    pub fn record(&self) -> &SignatureRecord {
        &self.record
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    /// Whether the scan control should be enabled.
    pub fn can_trigger(&self) -> bool {
        !self.state.borrow().is_analyzing()
    }

    /// Show the most recent stored result, if any.
    ///
    /// Only applies while `Idle`. Read failures are logged and leave the
    /// state untouched.
    #[instrument(level = "debug", skip_all, fields(signature_id = self.record.id))]
    pub async fn load_existing(&self) -> Result<Option<ScanReport>> {
        let session = self.app_state.require_session().await?;
        let stored = match self
            .results
            .latest_result(&session.access_token, self.record.id)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to load previous scan result");
                return Ok(None);
            }
        };

        let Some(stored) = stored else {
            debug!("No previous scan result");
            return Ok(None);
        };
        let report = ScanReport::from_stored(stored);
        let applied = self.state.send_if_modified(|state| {
            if matches!(state, ScanState::Idle) {
                *state = ScanState::Completed(report.clone());
                true
            } else {
                false
            }
        });
        Ok(applied.then_some(report))
    }

    /// Run one scan of the record's image pair.
    ///
    /// Returns `ScanInFlight` without side effects if a scan is already
    /// running. On failure the state becomes `Failed` and nothing is
    /// persisted.
    #[instrument(level = "info", skip_all, fields(signature_id = self.record.id))]
    pub async fn start_scan(&self) -> Result<ScanReport> {
        let session = self.app_state.require_session().await?;

        let mut started = false;
        self.state.send_if_modified(|state| {
            if state.is_analyzing() {
                return false;
            }
            *state = ScanState::Analyzing;
            started = true;
            true
        });
        if !started {
            debug!("Scan already in flight");
            return Err(SigcheckError::ScanInFlight);
        }
        let guard = InFlightGuard::new(&self.state);

        let start = Instant::now();
        let outcome = self
            .scanner
            .submit_scan(
                &self.record.original_image_encoded,
                &self.record.scanned_image_encoded,
                &session.access_token,
            )
            .await;

        let ScanOutcome {
            similarity_index,
            computed_at,
        } = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    error = %e,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Scan failed"
                );
                guard.finish(ScanState::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let result = ScanResult {
            signature_record_id: self.record.id,
            similarity_index,
            computed_at: computed_at.clone(),
        };
        let save_status = match self.results.save_result(&session.access_token, &result).await {
            Ok(()) => SaveStatus::Saved,
            Err(e) => {
                error!(error = %e, "Failed to save scan result");
                SaveStatus::Failed(e.to_string())
            }
        };

        let report = ScanReport::new(self.record.id, similarity_index, computed_at, save_status);
        info!(
            similarity_index,
            severity = %report.severity,
            latency_ms = start.elapsed().as_millis() as u64,
            "Scan completed"
        );
        guard.finish(ScanState::Completed(report.clone()));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AuthProvider, MemoryBackend, SignUpRequest, SignatureStore};
    use crate::model::NewSignatureRecord;
    use crate::scan::MockScanner;

    async fn fixture(scanner: MockScanner) -> (ScanOrchestrator, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .sign_up(SignUpRequest {
                name: "Ada",
                email: "ada@example.com",
                password: "Secret1",
            })
            .await
            .unwrap();
        let code = backend.pending_otp("ada@example.com").unwrap();
        backend.verify_otp("ada@example.com", &code).await.unwrap();
        let session = backend
            .sign_in_with_password("ada@example.com", "Secret1")
            .await
            .unwrap();
        let record = backend
            .insert_signature(
                &session.access_token,
                &NewSignatureRecord {
                    title: "President Signature".into(),
                    author: "Office".into(),
                    original_image_encoded: "b3JpZ2luYWw=".into(),
                    scanned_image_encoded: "c2Nhbm5lZA==".into(),
                    user_id: session.user_id.clone(),
                },
            )
            .await
            .unwrap();
        let orchestrator = ScanOrchestrator::new(
            record,
            Arc::new(scanner),
            backend.clone(),
            Arc::new(AppState::with_session(session)),
        );
        (orchestrator, backend)
    }

    #[tokio::test]
    async fn test_successful_scan_is_saved() {
        let (orch, backend) = fixture(MockScanner::new().with_outcome(82.4, "2024-05-01")).await;
        assert_eq!(orch.state(), ScanState::Idle);

        let report = orch.start_scan().await.unwrap();
        assert_eq!(report.severity, AuthenticitySeverity::HighlyAuthentic);
        assert_eq!(report.save_status, SaveStatus::Saved);
        assert_eq!(orch.state().report(), Some(&report));
        assert_eq!(backend.results_for(orch.record().id).len(), 1);
        assert!(orch.can_trigger());
    }

    #[tokio::test]
    async fn test_failed_scan_persists_nothing() {
        let scanner = MockScanner::new().with_error(SigcheckError::network(Some(500), "boom"));
        let (orch, backend) = fixture(scanner).await;

        assert!(orch.start_scan().await.is_err());
        match orch.state() {
            ScanState::Failed { kind, .. } => assert_eq!(kind, ErrorKind::Network),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(backend.result_writes(), 0);
        assert!(orch.can_trigger());
    }

    #[tokio::test]
    async fn test_dropped_scan_can_be_retried() {
        let (scanner, gate) = MockScanner::new().with_outcome(60.0, "2024-01-01").gated();
        let (orch, backend) = fixture(scanner).await;

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(50), orch.start_scan()).await;
        assert!(abandoned.is_err());
        assert!(orch.can_trigger());
        match orch.state() {
            ScanState::Failed { kind, message } => {
                assert_eq!(kind, ErrorKind::State);
                assert_eq!(message, "Scan cancelled");
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(backend.result_writes(), 0);

        gate.notify_one();
        let report = orch.start_scan().await.unwrap();
        assert_eq!(report.similarity_index, 60.0);
        assert_eq!(report.save_status, SaveStatus::Saved);
    }

    #[tokio::test]
    async fn test_load_existing_shows_latest() {
        let scanner = MockScanner::new()
            .with_outcome(40.0, "2024-01-01")
            .with_outcome(70.0, "2024-02-01");
        let (orch, backend) = fixture(scanner).await;
        orch.start_scan().await.unwrap();
        orch.start_scan().await.unwrap();

        let reloaded = ScanOrchestrator::new(
            orch.record().clone(),
            Arc::new(MockScanner::new()),
            backend.clone(),
            orch.app_state.clone(),
        );
        let report = reloaded.load_existing().await.unwrap().unwrap();
        assert_eq!(report.similarity_index, 70.0);
        assert_eq!(report.severity, AuthenticitySeverity::PossiblyAuthentic);
        assert_eq!(report.save_status, SaveStatus::Stored);
    }

    #[tokio::test]
    async fn test_load_existing_without_results() {
        let (orch, _) = fixture(MockScanner::new()).await;
        assert!(orch.load_existing().await.unwrap().is_none());
        assert_eq!(orch.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_scan_requires_session() {
        let (orch, _) = fixture(MockScanner::new()).await;
        orch.app_state.clear().await;
        assert!(matches!(
            orch.start_scan().await,
            Err(SigcheckError::NotSignedIn)
        ));
        assert_eq!(orch.state(), ScanState::Idle);
    }
}
