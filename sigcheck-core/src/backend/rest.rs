//! HTTP backend for a hosted auth + table service.
//!
//! Auth endpoints live under `<base>/auth/v1`, tables under `<base>/rest/v1`.
//! Every request carries the project's anon key in the `apikey` header;
//! table requests also carry the user's bearer token so row-level security
//! applies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{AuthProvider, ResultStore, SignUpRequest, SignatureStore};
use crate::config::{join_path, SigcheckConfig};
use crate::error::{Result, SigcheckError};
use crate::model::{NewSignatureRecord, ScanResult, Session, SignatureRecord};

/// Timeout for auth and table calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const SIGNATURES_TABLE: &str = "signature_infos";
const RESULTS_TABLE: &str = "scan_results";

/// Password grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,
}

/// Error body; auth and table services use different field names.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        [self.msg, self.error_description, self.message, self.error]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}

/// Auth and table client for a hosted backend.
pub struct RestBackend {
    client: Client,
    base: Url,
    anon_key: String,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base", &self.base.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl RestBackend {
    pub fn from_config(config: &SigcheckConfig) -> Result<Self> {
        let (base, anon_key) = config.backend()?;
        Self::new(base, anon_key)
    }

    #[instrument(level = "debug", skip_all, fields(base = %base))]
    pub fn new(base: Url, anon_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                SigcheckError::Config(format!("Failed to create HTTP client: {e}"))
            })?;
        debug!("Backend client created");
        Ok(Self {
            client,
            base,
            anon_key,
        })
    }

    fn auth_url(&self, path: &str) -> Result<Url> {
        join_path(self.base.as_str(), &format!("auth/v1/{path}"))
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        join_path(self.base.as_str(), &format!("rest/v1/{table}"))
    }

    fn auth_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.auth_url(path)?)
            .header("apikey", &self.anon_key))
    }

    fn table_request(&self, method: Method, table: &str, access_token: &str) -> Result<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.table_url(table)?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token))
    }

    /// Send an auth request; non-2xx answers become `Auth` errors.
    async fn send_auth(&self, request: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(status = %status, latency_ms = start.elapsed().as_millis() as u64, "Auth response");
        if status.is_success() {
            return Ok(response);
        }
        let message = error_message(response).await;
        warn!(status = %status, error = %message, "Auth request rejected");
        Err(SigcheckError::Auth(message))
    }

    /// Send a table read; non-2xx answers become `Auth` (401/403) or `Network`.
    async fn send_read(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = error_message(response).await;
        warn!(status = %status, error = %message, "Table read failed");
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            Err(SigcheckError::Auth(message))
        } else {
            Err(SigcheckError::network(Some(status.as_u16()), message))
        }
    }

    /// Send a table write; any failure becomes `Persistence`.
    async fn send_write(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| SigcheckError::Persistence(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = error_message(response).await;
        warn!(status = %status, error = %message, "Table write failed");
        Err(SigcheckError::Persistence(format!("{status}: {message}")))
    }
}

fn transport_error(error: reqwest::Error) -> SigcheckError {
    SigcheckError::network(error.status().map(|s| s.as_u16()), error.to_string())
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| SigcheckError::Parse(format!("Invalid {what}: {e}")))
}

#[async_trait]
impl AuthProvider for RestBackend {
    #[instrument(level = "info", skip_all)]
    async fn sign_up(&self, request: SignUpRequest<'_>) -> Result<()> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": { "name": request.name },
        });
        self.send_auth(self.auth_request(Method::POST, "signup")?.json(&body))
            .await?;
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn verify_otp(&self, email: &str, token: &str) -> Result<()> {
        let body = json!({ "type": "signup", "email": email, "token": token });
        self.send_auth(self.auth_request(Method::POST, "verify")?.json(&body))
            .await?;
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn resend_otp(&self, email: &str) -> Result<()> {
        let body = json!({ "email": email });
        self.send_auth(self.auth_request(Method::POST, "otp")?.json(&body))
            .await?;
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        let request = self
            .auth_request(Method::POST, "token")?
            .query(&[("grant_type", "password")])
            .json(&body);
        let response = self.send_auth(request).await?;
        let token: TokenResponse = parse_json(response, "token response").await?;

        let expires_at = chrono::TimeDelta::try_seconds(token.expires_in)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| SigcheckError::Parse(format!("Invalid expires_in: {}", token.expires_in)))?;

        let email = token.user.email.unwrap_or_else(|| email.to_string());
        Ok(Session {
            user_id: token.user.id,
            name: token.user.user_metadata.name.unwrap_or_else(|| email.clone()),
            email,
            access_token: token.access_token,
            role: token.user.role.unwrap_or_else(|| "authenticated".into()),
            expires_at,
        })
    }

    #[instrument(level = "info", skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let request = self
            .auth_request(Method::POST, "logout")?
            .bearer_auth(access_token);
        self.send_auth(request).await?;
        Ok(())
    }
}

#[async_trait]
impl SignatureStore for RestBackend {
    #[instrument(level = "debug", skip(self, access_token))]
    async fn list_signatures(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<SignatureRecord>> {
        let request = self
            .table_request(Method::GET, SIGNATURES_TABLE, access_token)?
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
            ]);
        let response = self.send_read(request).await?;
        parse_json(response, "signature list").await
    }

    #[instrument(level = "debug", skip(self, access_token))]
    async fn get_signature(&self, access_token: &str, id: i64) -> Result<Option<SignatureRecord>> {
        let request = self
            .table_request(Method::GET, SIGNATURES_TABLE, access_token)?
            .query(&[("select", "*".to_string()), ("signature_id", format!("eq.{id}"))]);
        let response = self.send_read(request).await?;
        let rows: Vec<SignatureRecord> = parse_json(response, "signature record").await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(level = "debug", skip_all, fields(title = %record.title))]
    async fn insert_signature(
        &self,
        access_token: &str,
        record: &NewSignatureRecord,
    ) -> Result<SignatureRecord> {
        let request = self
            .table_request(Method::POST, SIGNATURES_TABLE, access_token)?
            .header("Prefer", "return=representation")
            .json(record);
        let response = self.send_write(request).await?;
        let rows: Vec<SignatureRecord> = parse_json(response, "inserted signature").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SigcheckError::Parse("Insert returned no rows".into()))
    }

    #[instrument(level = "debug", skip(self, access_token))]
    async fn delete_signature(&self, access_token: &str, id: i64) -> Result<()> {
        let request = self
            .table_request(Method::DELETE, SIGNATURES_TABLE, access_token)?
            .query(&[("signature_id", format!("eq.{id}"))]);
        self.send_write(request).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for RestBackend {
    #[instrument(level = "debug", skip_all, fields(signature_id = result.signature_record_id))]
    async fn save_result(&self, access_token: &str, result: &ScanResult) -> Result<()> {
        let request = self
            .table_request(Method::POST, RESULTS_TABLE, access_token)?
            .header("Prefer", "return=minimal")
            .json(result);
        self.send_write(request).await?;
        debug!("Scan result stored");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, access_token))]
    async fn latest_result(
        &self,
        access_token: &str,
        signature_record_id: i64,
    ) -> Result<Option<ScanResult>> {
        let request = self
            .table_request(Method::GET, RESULTS_TABLE, access_token)?
            .query(&[
                ("select", "*".to_string()),
                ("signature_id", format!("eq.{signature_record_id}")),
                ("order", "date.desc".to_string()),
                ("limit", "1".to_string()),
            ]);
        let response = self.send_read(request).await?;
        let rows: Vec<ScanResult> = parse_json(response, "scan result").await?;
        Ok(rows.into_iter().next())
    }
}
