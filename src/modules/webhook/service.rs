use log::{debug, info, warn};
use std::sync::Arc;

use crate::api::error;
use crate::constants::WebhookSecret;
use crate::modules::{
    upload::{model::SettleOutcome, repository::UploadRepository},
    webhook::{
        model::{ReconcileOutcome, WebhookNotification},
        signature,
    },
};

#[derive(Clone)]
pub struct WebhookService {
    repo: Arc<dyn UploadRepository + Send + Sync>,
    secret: WebhookSecret,
    timestamp_tolerance_secs: Option<u64>,
}

impl WebhookService {
    pub fn with_dependencies(
        repo: Arc<dyn UploadRepository + Send + Sync>,
        secret: WebhookSecret,
        timestamp_tolerance_secs: Option<u64>,
    ) -> Self {
        info!("WebhookService initialized with dependencies");
        WebhookService { repo, secret, timestamp_tolerance_secs }
    }

    fn authenticate(
        &self,
        body: &[u8],
        signature: Option<&str>,
        timestamp: Option<&str>,
    ) -> Result<(), error::SystemError> {
        signature::verify(&self.secret, timestamp, body, signature)?;
        match (timestamp, self.timestamp_tolerance_secs) {
            (Some(ts), Some(tolerance)) => {
                signature::check_freshness(ts, chrono::Utc::now().timestamp(), tolerance)
            }
            _ => Ok(()),
        }
    }

    /// Authenticate, parse and reconcile one delivery.
    ///
    /// The body is not looked at before its signature verifies, and nothing is
    /// written for unknown handles or records that are already settled.
    pub async fn receive(
        &self,
        body: &[u8],
        signature: Option<&str>,
        timestamp: Option<&str>,
    ) -> Result<ReconcileOutcome, error::SystemError> {
        if let Err(err) = self.authenticate(body, signature, timestamp) {
            warn!("Rejected webhook delivery ({} bytes): {}", body.len(), err);
            return Err(err);
        }

        let notification: WebhookNotification = serde_json::from_slice(body)
            .map_err(|e| error::SystemError::malformed(format!("Invalid notification: {e}")))?;

        let handle = notification.handle.trim().to_string();
        if handle.is_empty() {
            return Err(error::SystemError::malformed("handle is required"));
        }
        let outcome = notification.outcome;

        let result = self.repo.settle(&handle, &notification.into_settlement()).await?;

        Ok(match result {
            SettleOutcome::Transitioned(upload) => {
                info!("Upload {} settled as {:?} ({:?})", handle, upload.status, outcome);
                ReconcileOutcome::Settled(upload)
            }
            SettleOutcome::AlreadySettled(upload) => {
                debug!("Duplicate webhook for upload {}, status stays {:?}", handle, upload.status);
                ReconcileOutcome::Duplicate(upload)
            }
            SettleOutcome::Missing => {
                info!("Webhook for unknown upload {} acknowledged", handle);
                ReconcileOutcome::UnknownRecord
            }
        })
    }
}
