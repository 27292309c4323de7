//! In-memory backend.
//!
//! Stands in for the hosted auth and table services in tests and in the
//! CLI's `--mock` mode. State can be snapshotted to a JSON file so that
//! separate CLI invocations share it.
//! WARNING: passwords are kept in plain text. Never point this at real data.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AuthProvider, ResultStore, SignUpRequest, SignatureStore};
use crate::error::{Result, SigcheckError};
use crate::model::{NewSignatureRecord, ScanResult, Session, SignatureRecord};

/// Lifetime of sessions issued by the mock provider.
const SESSION_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryUser {
    id: String,
    name: String,
    email: String,
    password: String,
    confirmed: bool,
    pending_otp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryState {
    users: Vec<MemoryUser>,
    /// access token -> user id
    sessions: HashMap<String, String>,
    signatures: Vec<SignatureRecord>,
    results: Vec<ScanResult>,
    next_signature_id: i64,
    counter: u64,
}

impl MemoryState {
    fn next_counter(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn next_otp(&mut self) -> String {
        let n = self.next_counter();
        format!("{:06}", (n * 7919 + 123_457) % 1_000_000)
    }

    fn user_for_token(&self, access_token: &str) -> Result<&MemoryUser> {
        let user_id = self
            .sessions
            .get(access_token)
            .ok_or_else(|| SigcheckError::Auth("Invalid or expired session".into()))?;
        self.users
            .iter()
            .find(|u| &u.id == user_id)
            .ok_or_else(|| SigcheckError::Auth("Unknown user".into()))
    }

    /// The record with `id`, if it belongs to the caller.
    fn owned_signature(&self, access_token: &str, id: i64) -> Result<Option<&SignatureRecord>> {
        let owner = self.user_for_token(access_token)?.id.as_str();
        Ok(self
            .signatures
            .iter()
            .find(|r| r.id == id && r.user_id.as_deref() == Some(owner)))
    }

    fn user_by_email(&mut self, email: &str) -> Option<&mut MemoryUser> {
        self.users
            .iter_mut()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }
}

/// In-process implementation of every backend trait.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    snapshot_path: Option<PathBuf>,
    fail_result_writes: AtomicBool,
    result_writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from a JSON snapshot (if present) and write it back after
    /// every change.
    pub fn with_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                SigcheckError::Parse(format!("Invalid mock state {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryState::default(),
            Err(source) => return Err(SigcheckError::Io { path, source }),
        };
        Ok(Self {
            state: Mutex::new(state),
            snapshot_path: Some(path),
            ..Default::default()
        })
    }

    /// Make every subsequent `save_result` fail with a persistence error.
    pub fn fail_result_writes(&self, fail: bool) {
        self.fail_result_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `save_result` calls, successful or not.
    pub fn result_writes(&self) -> usize {
        self.result_writes.load(Ordering::SeqCst)
    }

    /// The one-time code most recently issued to `email`.
    pub fn pending_otp(&self, email: &str) -> Option<String> {
        let mut state = self.state.lock().ok()?;
        state.user_by_email(email).and_then(|u| u.pending_otp.clone())
    }

    /// Every stored result for a record, oldest first.
    pub fn results_for(&self, signature_record_id: i64) -> Vec<ScanResult> {
        self.state
            .lock()
            .map(|s| {
                s.results
                    .iter()
                    .filter(|r| r.signature_record_id == signature_record_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply `f` and persist the result. With a snapshot file, changes only
    /// become visible once the file has been written.
    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SigcheckError::Persistence("Mock state lock poisoned".into()))?;
        let Some(path) = &self.snapshot_path else {
            return f(&mut state);
        };

        let mut next = state.clone();
        let out = f(&mut next)?;
        let bytes = serde_json::to_vec_pretty(&next)
            .map_err(|e| SigcheckError::Persistence(format!("Failed to encode mock state: {e}")))?;
        std::fs::write(path, bytes).map_err(|source| SigcheckError::Io {
            path: path.clone(),
            source,
        })?;
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_up(&self, request: SignUpRequest<'_>) -> Result<()> {
        self.with_state(|state| {
            if state.user_by_email(request.email).is_some() {
                return Err(SigcheckError::Auth("User already registered".into()));
            }
            let id = format!("user-{}", state.next_counter());
            let otp = state.next_otp();
            debug!(user_id = %id, "Registered mock user");
            state.users.push(MemoryUser {
                id,
                name: request.name.to_string(),
                email: request.email.to_string(),
                password: request.password.to_string(),
                confirmed: false,
                pending_otp: Some(otp),
            });
            Ok(())
        })
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<()> {
        self.with_state(|state| {
            let user = state
                .user_by_email(email)
                .ok_or_else(|| SigcheckError::Auth("Token has expired or is invalid".into()))?;
            if user.pending_otp.as_deref() != Some(token) {
                return Err(SigcheckError::Auth("Token has expired or is invalid".into()));
            }
            user.pending_otp = None;
            user.confirmed = true;
            Ok(())
        })
    }

    async fn resend_otp(&self, email: &str) -> Result<()> {
        self.with_state(|state| {
            let otp = state.next_otp();
            let user = state
                .user_by_email(email)
                .ok_or_else(|| SigcheckError::Auth("User not found".into()))?;
            user.pending_otp = Some(otp);
            Ok(())
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.with_state(|state| {
            let user = state
                .user_by_email(email)
                .filter(|u| u.password == password)
                .cloned()
                .ok_or_else(|| SigcheckError::Auth("Invalid login credentials".into()))?;
            if !user.confirmed {
                return Err(SigcheckError::Auth("Email not confirmed".into()));
            }
            let token = format!("mock-token-{}-{}", user.id, state.next_counter());
            state.sessions.insert(token.clone(), user.id.clone());
            Ok(Session {
                user_id: user.id,
                name: user.name,
                email: user.email,
                access_token: token,
                role: "authenticated".into(),
                expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
            })
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.with_state(|state| {
            state
                .sessions
                .remove(access_token)
                .map(|_| ())
                .ok_or_else(|| SigcheckError::Auth("Invalid or expired session".into()))
        })
    }
}

#[async_trait]
impl SignatureStore for MemoryBackend {
    async fn list_signatures(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<SignatureRecord>> {
        self.with_state(|state| {
            state.user_for_token(access_token)?;
            let mut records: Vec<_> = state
                .signatures
                .iter()
                .filter(|r| r.user_id.as_deref() == Some(user_id))
                .cloned()
                .collect();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(records)
        })
    }

    async fn get_signature(&self, access_token: &str, id: i64) -> Result<Option<SignatureRecord>> {
        self.with_state(|state| Ok(state.owned_signature(access_token, id)?.cloned()))
    }

    async fn insert_signature(
        &self,
        access_token: &str,
        record: &NewSignatureRecord,
    ) -> Result<SignatureRecord> {
        self.with_state(|state| {
            let owner = state.user_for_token(access_token)?;
            if owner.id != record.user_id {
                return Err(SigcheckError::Persistence(
                    "new row violates row-level security policy".into(),
                ));
            }
            state.next_signature_id += 1;
            let stored = SignatureRecord {
                id: state.next_signature_id,
                title: record.title.clone(),
                author: record.author.clone(),
                original_image_encoded: record.original_image_encoded.clone(),
                scanned_image_encoded: record.scanned_image_encoded.clone(),
                user_id: Some(record.user_id.clone()),
                created_at: Utc::now(),
            };
            state.signatures.push(stored.clone());
            Ok(stored)
        })
    }

    async fn delete_signature(&self, access_token: &str, id: i64) -> Result<()> {
        self.with_state(|state| {
            let owner = state.user_for_token(access_token)?.id.clone();
            let before = state.signatures.len();
            state
                .signatures
                .retain(|r| !(r.id == id && r.user_id.as_deref() == Some(owner.as_str())));
            if state.signatures.len() == before {
                return Err(SigcheckError::NotFound(format!("signature {id}")));
            }
            state.results.retain(|r| r.signature_record_id != id);
            Ok(())
        })
    }
}

#[async_trait]
impl ResultStore for MemoryBackend {
    async fn save_result(&self, access_token: &str, result: &ScanResult) -> Result<()> {
        self.result_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_result_writes.load(Ordering::SeqCst) {
            warn!("Mock result store configured to fail");
            return Err(SigcheckError::Persistence(
                "connection to result store lost".into(),
            ));
        }
        self.with_state(|state| {
            let id = result.signature_record_id;
            if state.owned_signature(access_token, id)?.is_none() {
                if state.signatures.iter().any(|r| r.id == id) {
                    return Err(SigcheckError::Persistence(
                        "new row violates row-level security policy".into(),
                    ));
                }
                return Err(SigcheckError::Persistence(format!(
                    "foreign key violation: signature {id} does not exist"
                )));
            }
            state.results.push(result.clone());
            Ok(())
        })
    }

    async fn latest_result(
        &self,
        access_token: &str,
        signature_record_id: i64,
    ) -> Result<Option<ScanResult>> {
        self.with_state(|state| {
            if state.owned_signature(access_token, signature_record_id)?.is_none() {
                return Ok(None);
            }
            // Newest by date; on a tie the later write wins
            Ok(state
                .results
                .iter()
                .filter(|r| r.signature_record_id == signature_record_id)
                .max_by(|a, b| a.computed_at.cmp(&b.computed_at))
                .cloned())
        })
    }
}
