//! Signature record management: create, list, look up, delete.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::backend::SignatureStore;
use crate::encoder::encode_file;
use crate::error::{Result, SigcheckError};
use crate::model::{NewSignatureRecord, SignatureRecord};
use crate::state::AppState;
use crate::validation::{validate_signature_form, SignatureForm};

pub struct SignatureService {
    store: Arc<dyn SignatureStore>,
    state: Arc<AppState>,
}

impl SignatureService {
    pub fn new(store: Arc<dyn SignatureStore>, state: Arc<AppState>) -> Self {
        Self { store, state }
    }

    /// Validate the form, encode both images and insert the record.
    ///
    /// Nothing is written if either image cannot be read.
    #[instrument(level = "info", skip_all, fields(title = %form.title))]
    pub async fn submit(&self, form: &SignatureForm) -> Result<SignatureRecord> {
        let session = self.state.require_session().await?;
        let (original_path, scanned_path) = validate_signature_form(form)?;

        let original = encode_file(original_path).await?;
        let scanned = encode_file(scanned_path).await?;

        let new_record = NewSignatureRecord {
            title: form.title.trim().to_string(),
            author: form.author.trim().to_string(),
            original_image_encoded: original.into_string(),
            scanned_image_encoded: scanned.into_string(),
            user_id: session.user_id.clone(),
        };
        let record = self
            .store
            .insert_signature(&session.access_token, &new_record)
            .await?;

        info!(signature_id = record.id, "Signature record created");
        self.state.push_signature(record.clone()).await;
        Ok(record)
    }

    /// Reload the user's records, newest first.
    ///
    /// A failed fetch is logged and yields an empty list.
    #[instrument(level = "debug", skip_all)]
    pub async fn refresh(&self) -> Result<Vec<SignatureRecord>> {
        let session = self.state.require_session().await?;
        let records = match self
            .store
            .list_signatures(&session.access_token, &session.user_id)
            .await
        {
            Ok(mut records) => {
                records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                records
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch signature records");
                Vec::new()
            }
        };
        self.state.set_signatures(records.clone()).await;
        Ok(records)
    }

    pub async fn get(&self, id: i64) -> Result<SignatureRecord> {
        let session = self.state.require_session().await?;
        self.store
            .get_signature(&session.access_token, id)
            .await?
            .ok_or_else(|| SigcheckError::NotFound(format!("signature {id}")))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let session = self.state.require_session().await?;
        self.store.delete_signature(&session.access_token, id).await?;
        self.state.remove_signature(id).await;
        info!(signature_id = id, "Signature record deleted");
        Ok(())
    }
}
