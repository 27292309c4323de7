//! End-to-end scan scenarios against the mock scanner and in-memory backend.

mod common;

use std::sync::Arc;

use sigcheck_core::{
    AuthenticitySeverity, ErrorKind, MockScanner, SaveStatus, ScanOrchestrator, ScanState,
    SigcheckError,
};

use common::signed_in_with_record;

/// Authentic signature: result shown and stored.
#[tokio::test]
async fn scenario_authentic_signature_is_saved() {
    let (backend, state, record) = signed_in_with_record().await;
    let orchestrator = ScanOrchestrator::new(
        record.clone(),
        Arc::new(MockScanner::new().with_outcome(82.0, "2024-05-01")),
        backend.clone(),
        state,
    );

    let report = orchestrator.start_scan().await.unwrap();

    assert_eq!(report.severity, AuthenticitySeverity::HighlyAuthentic);
    assert_eq!(report.donut_fraction, 0.82);
    assert_eq!(report.save_status, SaveStatus::Saved);
    assert_eq!(orchestrator.state(), ScanState::Completed(report));

    let stored = backend.results_for(record.id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].similarity_index, 82.0);
    assert_eq!(stored[0].computed_at, "2024-05-01");
}

/// Timeout: failure shown, nothing stored, control re-enabled for a retry.
#[tokio::test]
async fn scenario_timeout_then_retry() {
    let (backend, state, record) = signed_in_with_record().await;
    let scanner = MockScanner::new()
        .with_error(SigcheckError::Timeout { after_ms: 30_000 })
        .with_outcome(60.0, "2024-05-02");
    let orchestrator = ScanOrchestrator::new(record.clone(), Arc::new(scanner), backend.clone(), state);

    let err = orchestrator.start_scan().await.unwrap_err();
    assert_eq!(err.to_string(), "Scan request timed out after 30000ms");
    assert_eq!(
        orchestrator.state(),
        ScanState::Failed {
            kind: ErrorKind::Timeout,
            message: "Scan request timed out after 30000ms".into(),
        }
    );
    assert_eq!(backend.result_writes(), 0);
    assert!(orchestrator.can_trigger());

    let report = orchestrator.start_scan().await.unwrap();
    assert_eq!(report.severity, AuthenticitySeverity::LikelyForged);
    assert_eq!(backend.results_for(record.id).len(), 1);
}

/// Storage failure: result still shown, failure reported alongside it.
#[tokio::test]
async fn scenario_persistence_failure_still_shows_result() {
    let (backend, state, record) = signed_in_with_record().await;
    backend.fail_result_writes(true);
    let orchestrator = ScanOrchestrator::new(
        record.clone(),
        Arc::new(MockScanner::new().with_outcome(50.0, "2024-05-03")),
        backend.clone(),
        state,
    );

    let report = orchestrator.start_scan().await.unwrap();

    assert_eq!(report.severity, AuthenticitySeverity::LikelyForged);
    assert!(matches!(report.save_status, SaveStatus::Failed(_)));
    assert!(matches!(orchestrator.state(), ScanState::Completed(_)));
    assert_eq!(backend.result_writes(), 1);
    assert!(backend.results_for(record.id).is_empty());
}

/// Second trigger while analyzing is refused and never reaches the scanner.
#[tokio::test]
async fn scenario_double_trigger_is_ignored() {
    let (backend, state, record) = signed_in_with_record().await;
    let (scanner, gate) = MockScanner::new().with_outcome(77.0, "2024-05-04").gated();
    let scanner = Arc::new(scanner);
    let orchestrator = Arc::new(ScanOrchestrator::new(
        record.clone(),
        scanner.clone(),
        backend.clone(),
        state,
    ));

    let mut states = orchestrator.subscribe();
    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.start_scan().await }
    });
    states.wait_for(ScanState::is_analyzing).await.unwrap();
    assert!(!orchestrator.can_trigger());

    let second = orchestrator.start_scan().await;
    assert!(matches!(second, Err(SigcheckError::ScanInFlight)));
    assert_eq!(orchestrator.state(), ScanState::Analyzing);

    gate.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.severity, AuthenticitySeverity::HighlyAuthentic);
    assert_eq!(scanner.calls(), 1);
    assert_eq!(backend.results_for(record.id).len(), 1);
}

/// Reopening a record shows the most recent stored result.
#[tokio::test]
async fn scenario_reopen_shows_previous_result() {
    let (backend, state, record) = signed_in_with_record().await;
    let first = ScanOrchestrator::new(
        record.clone(),
        Arc::new(MockScanner::new().with_outcome(30.0, "2024-05-05")),
        backend.clone(),
        state.clone(),
    );
    first.start_scan().await.unwrap();

    let reopened = ScanOrchestrator::new(record, Arc::new(MockScanner::new()), backend, state);
    let report = reopened.load_existing().await.unwrap().unwrap();
    assert_eq!(report.severity, AuthenticitySeverity::HighlyForged);
    assert_eq!(report.save_status, SaveStatus::Stored);
    assert!(reopened.state().report().is_some());
}

/// Out-of-range scores classify as unknown but are still shown.
#[tokio::test]
async fn scenario_out_of_range_score_is_unknown() {
    let (backend, state, record) = signed_in_with_record().await;
    let orchestrator = ScanOrchestrator::new(
        record,
        Arc::new(MockScanner::new().with_outcome(140.0, "2024-05-06")),
        backend,
        state,
    );

    let report = orchestrator.start_scan().await.unwrap();
    assert_eq!(report.severity, AuthenticitySeverity::Unknown);
    assert_eq!(report.donut_fraction, 1.0);
}
