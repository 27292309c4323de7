//! Application state shared across screens.
//!
//! Created once at startup and handed to each service explicitly. Cleared
//! on sign-out.

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SigcheckError};
use crate::model::{Session, SignatureRecord};

/// Current session plus the cached list of the user's signature records.
#[derive(Debug, Default)]
pub struct AppState {
    session: RwLock<Option<Session>>,
    signatures: RwLock<Vec<SignatureRecord>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously saved session (e.g. restored by the CLI).
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            ..Default::default()
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// The active session, or `NotSignedIn` if absent or expired.
    pub async fn require_session(&self) -> Result<Session> {
        match self.session.read().await.as_ref() {
            Some(session) if !session.is_expired(Utc::now()) => Ok(session.clone()),
            Some(_) => {
                debug!("Session expired");
                Err(SigcheckError::NotSignedIn)
            }
            None => Err(SigcheckError::NotSignedIn),
        }
    }

    pub async fn set_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    pub async fn signatures(&self) -> Vec<SignatureRecord> {
        self.signatures.read().await.clone()
    }

    pub async fn set_signatures(&self, records: Vec<SignatureRecord>) {
        *self.signatures.write().await = records;
    }

    /// Add a freshly created record at the head of the cache.
    pub async fn push_signature(&self, record: SignatureRecord) {
        self.signatures.write().await.insert(0, record);
    }

    pub async fn remove_signature(&self, id: i64) {
        self.signatures.write().await.retain(|r| r.id != id);
    }

    /// Drop the session and every cached record.
    pub async fn clear(&self) {
        *self.session.write().await = None;
        self.signatures.write().await.clear();
        debug!("Application state cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        Session {
            user_id: "u-1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            access_token: "token".into(),
            role: "authenticated".into(),
            expires_at: Utc::now() + expires_in,
        }
    }

    fn record(id: i64) -> SignatureRecord {
        SignatureRecord {
            id,
            title: format!("Record {id}"),
            author: "Office".into(),
            original_image_encoded: "YQ==".into(),
            scanned_image_encoded: "Yg==".into(),
            user_id: Some("u-1".into()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_require_session() {
        let state = AppState::new();
        assert!(matches!(
            state.require_session().await,
            Err(SigcheckError::NotSignedIn)
        ));

        state.set_session(session(Duration::hours(1))).await;
        assert_eq!(state.require_session().await.unwrap().user_id, "u-1");
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let state = AppState::with_session(session(Duration::seconds(-5)));
        assert!(state.session().await.is_some());
        assert!(state.require_session().await.is_err());
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let state = AppState::with_session(session(Duration::hours(1)));
        state.set_signatures(vec![record(1), record(2)]).await;
        state.push_signature(record(3)).await;
        assert_eq!(state.signatures().await[0].id, 3);

        state.remove_signature(1).await;
        assert_eq!(state.signatures().await.len(), 2);

        state.clear().await;
        assert!(state.session().await.is_none());
        assert!(state.signatures().await.is_empty());
    }
}
