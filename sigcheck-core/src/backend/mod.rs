//! Backend-as-a-service collaborators.
//!
//! Authentication and table storage live in an external service. This
//! module defines the operations the client needs from it:
//!
//! - [`AuthProvider`]: sign-up, OTP verification, password sign-in, sign-out
//! - [`SignatureStore`]: the user's signature records
//! - [`ResultStore`]: persisted scan results
//!
//! Two implementations are provided:
//! - [`RestBackend`]: GoTrue-style auth and PostgREST-style tables over HTTP
//!   (feature `network`)
//! - [`MemoryBackend`]: in-process state, optionally snapshotted to a JSON
//!   file, for tests and offline runs

mod memory;
#[cfg(feature = "network")]
mod rest;

pub use memory::MemoryBackend;
#[cfg(feature = "network")]
pub use rest::RestBackend;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NewSignatureRecord, ScanResult, Session, SignatureRecord};

/// Sign-up details forwarded to the auth provider.
#[derive(Debug, Clone)]
pub struct SignUpRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register an account. The provider emails a one-time code.
    async fn sign_up(&self, request: SignUpRequest<'_>) -> Result<()>;

    /// Confirm a sign-up with the emailed one-time code.
    async fn verify_otp(&self, email: &str, token: &str) -> Result<()>;

    /// Send a fresh one-time code.
    async fn resend_otp(&self, email: &str) -> Result<()>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Records owned by `user_id`, newest first.
    async fn list_signatures(&self, access_token: &str, user_id: &str)
        -> Result<Vec<SignatureRecord>>;

    async fn get_signature(&self, access_token: &str, id: i64) -> Result<Option<SignatureRecord>>;

    async fn insert_signature(
        &self,
        access_token: &str,
        record: &NewSignatureRecord,
    ) -> Result<SignatureRecord>;

    async fn delete_signature(&self, access_token: &str, id: i64) -> Result<()>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Append a scan result. Failures are `Persistence` errors.
    async fn save_result(&self, access_token: &str, result: &ScanResult) -> Result<()>;

    /// Most recent stored result for a signature record.
    async fn latest_result(
        &self,
        access_token: &str,
        signature_record_id: i64,
    ) -> Result<Option<ScanResult>>;
}
