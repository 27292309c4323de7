//! Mock scanner for tests and offline use.
//! WARNING: scores are not a real similarity measure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{ScanOutcome, ScanRequest, SignatureScanner};
use crate::error::{Result, SigcheckError};

/// Date reported by unscripted mock scans.
const MOCK_DATE: &str = "1970-01-01";

/// Scripted scanner.
///
/// Queued responses are returned in order; once the queue is empty the
/// scanner falls back to a deterministic byte-overlap score.
#[derive(Default)]
pub struct MockScanner {
    scripted: Mutex<VecDeque<Result<ScanOutcome>>>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl MockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful outcome.
    pub fn with_outcome(self, similarity_index: f64, computed_at: &str) -> Self {
        self.push(Ok(ScanOutcome {
            similarity_index,
            computed_at: computed_at.to_string(),
        }))
    }

    /// Queue a failure.
    pub fn with_error(self, error: SigcheckError) -> Self {
        self.push(Err(error))
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold each call until the returned handle is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Number of calls that reached the scanner.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, result: Result<ScanOutcome>) -> Self {
        if let Ok(mut queue) = self.scripted.lock() {
            queue.push_back(result);
        }
        self
    }

    fn next_scripted(&self) -> Option<Result<ScanOutcome>> {
        self.scripted.lock().ok().and_then(|mut q| q.pop_front())
    }
}

/// Share of positions at which both payloads hold the same byte, as 0–100.
fn overlap_score(original: &str, scanned: &str) -> f64 {
    let (a, b) = (original.as_bytes(), scanned.as_bytes());
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    let score = same as f64 * 100.0 / longest as f64;
    (score * 100.0).round() / 100.0
}

#[async_trait]
impl SignatureScanner for MockScanner {
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
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.next_scripted().unwrap_or_else(|| {
            Ok(ScanOutcome {
                similarity_index: overlap_score(
                    request.original_signature,
                    request.scanned_signature,
                ),
                computed_at: MOCK_DATE.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_outcomes_in_order() {
        let scanner = MockScanner::new()
            .with_outcome(82.0, "2024-01-01")
            .with_error(SigcheckError::network(Some(500), "Internal Server Error"));

        let first = scanner.submit_scan("a", "b", "t").await.unwrap();
        assert_eq!(first.similarity_index, 82.0);

        let second = scanner.submit_scan("a", "b", "t").await.unwrap_err();
        assert_eq!(second.status(), Some(500));
        assert_eq!(scanner.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_score_is_deterministic() {
        let scanner = MockScanner::new();
        let same = scanner.submit_scan("abcd", "abcd", "t").await.unwrap();
        assert_eq!(same.similarity_index, 100.0);

        let half = scanner.submit_scan("abcd", "abzz", "t").await.unwrap();
        assert_eq!(half.similarity_index, 50.0);
    }

    #[tokio::test]
    async fn test_invalid_input_not_counted() {
        let scanner = MockScanner::new();
        assert!(scanner.submit_scan("", "abcd", "t").await.is_err());
        assert_eq!(scanner.calls(), 0);
    }
}
