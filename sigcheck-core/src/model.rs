//! Records exchanged with the backend table service.
//!
//! Field names on the wire follow the backend tables
//! (`signature_infos`, `scan_results`); Rust names describe the content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submitted pair of signature images plus metadata.
///
/// Immutable once created; owned by the submitting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    #[serde(rename = "signature_id")]
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Base64 payload of the reference signature image
    #[serde(rename = "original_signature_url")]
    pub original_image_encoded: String,
    /// Base64 payload of the questioned signature image
    #[serde(rename = "scanned_signature_url")]
    pub scanned_image_encoded: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new signature record.
#[derive(Debug, Clone, Serialize)]
pub struct NewSignatureRecord {
    pub title: String,
    pub author: String,
    #[serde(rename = "original_signature_url")]
    pub original_image_encoded: String,
    #[serde(rename = "scanned_signature_url")]
    pub scanned_image_encoded: String,
    pub user_id: String,
}

/// One persisted scan outcome. Append-only: a record may have several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(rename = "signature_id")]
    pub signature_record_id: i64,
    #[serde(rename = "similarity_idx")]
    pub similarity_index: f64,
    #[serde(rename = "date")]
    pub computed_at: String,
}

/// Authenticated user session issued by the auth provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub access_token: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("role", &self.role)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_signature_record_wire_names() {
        let json = serde_json::json!({
            "signature_id": 7,
            "title": "President Signature",
            "author": "Office",
            "original_signature_url": "aGVsbG8=",
            "scanned_signature_url": "d29ybGQ=",
            "user_id": "u-1",
            "created_at": "2024-01-01T10:00:00Z"
        });
        let record: SignatureRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.original_image_encoded, "aGVsbG8=");
        assert_eq!(record.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_scan_result_serializes_backend_columns() {
        let result = ScanResult {
            signature_record_id: 3,
            similarity_index: 82.0,
            computed_at: "2024-01-01".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["signature_id"], 3);
        assert_eq!(value["similarity_idx"], 82.0);
        assert_eq!(value["date"], "2024-01-01");
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session {
            user_id: "u-1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            access_token: "eyJ-secret".into(),
            role: "authenticated".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!format!("{session:?}").contains("eyJ-secret"));
        assert!(!session.is_expired(Utc::now()));
    }
}
